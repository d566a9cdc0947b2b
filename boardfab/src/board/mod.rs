//! Board snapshot
//!
//! The immutable geometric model handed to the fabrication writers and the
//! design rule check. Everything is already resolved by the editor: device
//! placements, plane fill fragments, net assignments. Coordinates are in
//! nanometers (see [`crate::geometry`]).

pub mod copper;
pub mod device;

pub use copper::{Anchor, BoardPolygon, Plane, Trace, Via};
pub use device::{AssemblyType, Device, Hole, Pad, PadFunction, PadHole, PadKind, PadShape};

use std::fmt;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Path;

/// A copper layer of the stackup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    TopCopper,
    /// Inner layer, numbered from 1.
    InnerCopper(u8),
    BottomCopper,
}

impl Layer {
    /// Position in the stackup: top is 0, bottom is `inner_count + 1`.
    pub fn index(self, inner_count: u8) -> u8 {
        match self {
            Layer::TopCopper => 0,
            Layer::InnerCopper(n) => n,
            Layer::BottomCopper => inner_count + 1,
        }
    }

    pub fn name(self) -> String {
        match self {
            Layer::TopCopper => "top_copper".to_string(),
            Layer::InnerCopper(n) => format!("inner_copper_{}", n),
            Layer::BottomCopper => "bottom_copper".to_string(),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::TopCopper => write!(f, "Top Copper"),
            Layer::InnerCopper(n) => write!(f, "Inner Copper {}", n),
            Layer::BottomCopper => write!(f, "Bottom Copper"),
        }
    }
}

/// Top or bottom of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardSide {
    Top,
    Bottom,
}

impl BoardSide {
    pub fn copper_layer(self) -> Layer {
        match self {
            BoardSide::Top => Layer::TopCopper,
            BoardSide::Bottom => Layer::BottomCopper,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub uuid: Uuid,
    pub name: String,
}

/// Represents a complete board snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub inner_copper_layers: u8,
    #[serde(default)]
    pub nets: Vec<Net>,
    /// Board outline and cutouts, each a closed path.
    #[serde(default)]
    pub outlines: Vec<Path>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub vias: Vec<Via>,
    #[serde(default)]
    pub planes: Vec<Plane>,
    #[serde(default)]
    pub polygons: Vec<BoardPolygon>,
    /// Non-plated holes placed directly on the board.
    #[serde(default)]
    pub holes: Vec<Hole>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            inner_copper_layers: 0,
            nets: Vec::new(),
            outlines: Vec::new(),
            devices: Vec::new(),
            traces: Vec::new(),
            vias: Vec::new(),
            planes: Vec::new(),
            polygons: Vec::new(),
            holes: Vec::new(),
        }
    }

    /// Load a board snapshot from a JSON file.
    pub fn load_json(path: &FsPath) -> Result<Self, crate::BoardFabError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, crate::BoardFabError> {
        serde_json::from_str(json).map_err(|e| crate::BoardFabError::Parse(e.to_string()))
    }

    /// Copper layers from top to bottom.
    pub fn copper_layers(&self) -> Vec<Layer> {
        let mut layers = vec![Layer::TopCopper];
        layers.extend((1..=self.inner_copper_layers).map(Layer::InnerCopper));
        layers.push(Layer::BottomCopper);
        layers
    }

    pub fn copper_layer_count(&self) -> u8 {
        self.inner_copper_layers + 2
    }

    /// Layers between `a` and `b` (inclusive), in stackup order.
    pub fn copper_layers_between(&self, a: Layer, b: Layer) -> Vec<Layer> {
        let inner = self.inner_copper_layers;
        let (lo, hi) = {
            let (ia, ib) = (a.index(inner), b.index(inner));
            (ia.min(ib), ia.max(ib))
        };
        self.copper_layers()
            .into_iter()
            .filter(|l| (lo..=hi).contains(&l.index(inner)))
            .collect()
    }

    pub fn net(&self, uuid: &Uuid) -> Option<&Net> {
        self.nets.iter().find(|n| &n.uuid == uuid)
    }

    /// Display name of a net, `"(no net)"` for unconnected copper.
    pub fn net_name(&self, uuid: Option<&Uuid>) -> String {
        match uuid.and_then(|u| self.net(u)) {
            Some(net) => net.name.clone(),
            None if uuid.is_some() => "(unknown net)".to_string(),
            None => "(no net)".to_string(),
        }
    }

    pub fn device(&self, uuid: &Uuid) -> Option<&Device> {
        self.devices.iter().find(|d| &d.uuid == uuid)
    }

    pub fn via(&self, uuid: &Uuid) -> Option<&Via> {
        self.vias.iter().find(|v| &v.uuid == uuid)
    }
}
