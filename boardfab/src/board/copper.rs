use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Layer;
use crate::geometry::{Path, Point, PositiveLength, UnsignedLength};

/// What a trace end is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Anchor {
    Pad { device: Uuid, pad: Uuid },
    Via { via: Uuid },
}

/// PCB trace (straight track segment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub uuid: Uuid,
    #[serde(default)]
    pub net: Option<Uuid>,
    pub layer: Layer,
    pub start: Point,
    pub end: Point,
    pub width: PositiveLength,
    #[serde(default)]
    pub start_anchor: Option<Anchor>,
    #[serde(default)]
    pub end_anchor: Option<Anchor>,
}

fn top() -> Layer {
    Layer::TopCopper
}

fn bottom() -> Layer {
    Layer::BottomCopper
}

/// Via (vertical interconnect)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    pub uuid: Uuid,
    #[serde(default)]
    pub net: Option<Uuid>,
    pub position: Point,
    /// Outer copper diameter.
    pub size: PositiveLength,
    pub drill: PositiveLength,
    #[serde(default = "top")]
    pub start_layer: Layer,
    #[serde(default = "bottom")]
    pub end_layer: Layer,
    /// Solder mask opening over the via.
    #[serde(default)]
    pub exposed: bool,
}

/// A copper plane. `fragments` holds the fill computed by the editor's
/// plane builder; the DRC may replace it by a fresh rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plane {
    pub uuid: Uuid,
    pub net: Uuid,
    pub layer: Layer,
    pub outline: Path,
    #[serde(default)]
    pub min_width: UnsignedLength,
    #[serde(default)]
    pub min_clearance: UnsignedLength,
    #[serde(default)]
    pub fragments: Vec<Path>,
}

/// A free copper polygon drawn on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPolygon {
    pub uuid: Uuid,
    #[serde(default)]
    pub net: Option<Uuid>,
    pub layer: Layer,
    pub path: Path,
    #[serde(default)]
    pub line_width: UnsignedLength,
    #[serde(default)]
    pub filled: bool,
}

impl BoardPolygon {
    /// Filled only makes sense for closed outlines.
    pub fn is_area(&self) -> bool {
        self.filled && self.path.is_closed()
    }
}
