use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BoardSide, Layer};
use crate::geometry::{Angle, Length, Path, Point, PositiveLength, Transform, UnsignedLength};

/// How a package is mounted during assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyType {
    /// Nothing to mount (logos, test points, mounting holes).
    None,
    Tht,
    Smt,
    /// Both THT and SMT pads.
    Mixed,
    Other,
    /// Derive from the package's pads.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadShape {
    /// Circle or obround.
    #[default]
    Round,
    Rect,
    Octagon,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadFunction {
    #[default]
    Standard,
    Fiducial,
    TestPad,
}

/// A drilled hole of a THT pad, relative to the pad origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadHole {
    pub uuid: Uuid,
    pub diameter: PositiveLength,
    /// One vertex for a round drill, more for a slot.
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PadKind {
    /// Surface mount pad on the device's side.
    Smt,
    /// Plated through hole pad on all copper layers.
    Tht { holes: Vec<PadHole> },
}

/// Pad on a footprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    pub uuid: Uuid,
    /// Pin number or name printed in assembly data.
    pub name: String,
    /// Position relative to the device origin.
    pub position: Point,
    #[serde(default)]
    pub rotation: Angle,
    #[serde(default)]
    pub shape: PadShape,
    pub width: PositiveLength,
    pub height: PositiveLength,
    #[serde(default)]
    pub corner_radius: UnsignedLength,
    pub kind: PadKind,
    #[serde(default)]
    pub function: PadFunction,
    #[serde(default)]
    pub net: Option<Uuid>,
}

impl Pad {
    pub fn is_tht(&self) -> bool {
        matches!(self.kind, PadKind::Tht { .. })
    }

    pub fn holes(&self) -> &[PadHole] {
        match &self.kind {
            PadKind::Tht { holes } => holes,
            PadKind::Smt => &[],
        }
    }

    /// Copper layers this pad occupies for a device on `side`.
    pub fn copper_layers(&self, side: BoardSide, all_layers: &[Layer]) -> Vec<Layer> {
        match self.kind {
            PadKind::Tht { .. } => all_layers.to_vec(),
            PadKind::Smt => vec![side.copper_layer()],
        }
    }

    /// Pad outline centered at the pad origin, before any transform.
    pub fn outline(&self) -> Path {
        match self.shape {
            PadShape::Round => Path::obround(self.width, self.height),
            PadShape::Rect => Path::centered_rect(self.width, self.height, self.corner_radius),
            PadShape::Octagon => Path::octagon(self.width, self.height, self.corner_radius),
        }
    }
}

/// A non-plated hole. Board holes use board coordinates, device holes
/// footprint coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    pub uuid: Uuid,
    pub diameter: PositiveLength,
    pub path: Path,
}

impl Hole {
    pub fn is_slot(&self) -> bool {
        self.path.len() > 1
    }
}

/// A placed device (component instance with its footprint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub uuid: Uuid,
    /// Designator, e.g. `R1`.
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub package_name: String,
    pub position: Point,
    #[serde(default)]
    pub rotation: Angle,
    /// Placed on the bottom side.
    #[serde(default)]
    pub mirrored: bool,
    #[serde(default)]
    pub assembly_type: AssemblyType,
    #[serde(default)]
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub holes: Vec<Hole>,
    /// Courtyard outlines in footprint coordinates.
    #[serde(default)]
    pub courtyard: Vec<Path>,
}

impl Device {
    pub fn side(&self) -> BoardSide {
        if self.mirrored {
            BoardSide::Bottom
        } else {
            BoardSide::Top
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, self.mirrored)
    }

    pub fn pad_transform(&self, pad: &Pad) -> Transform {
        self.transform().child(pad.position, pad.rotation)
    }

    pub fn pad(&self, uuid: &Uuid) -> Option<&Pad> {
        self.pads.iter().find(|p| &p.uuid == uuid)
    }

    /// Assembly type guessed from the footprint content. Fiducial pads count
    /// as SMT pads, they are placed like any other SMT part.
    pub fn guessed_assembly_type(&self) -> AssemblyType {
        let tht = self.pads.iter().any(|p| p.is_tht());
        let smt = self.pads.iter().any(|p| !p.is_tht());
        match (tht, smt) {
            (true, true) => AssemblyType::Mixed,
            (true, false) => AssemblyType::Tht,
            (false, true) => AssemblyType::Smt,
            (false, false) => AssemblyType::None,
        }
    }

    /// Assembly type with `Auto` resolved.
    pub fn resolved_assembly_type(&self) -> AssemblyType {
        match self.assembly_type {
            AssemblyType::Auto => self.guessed_assembly_type(),
            other => other,
        }
    }

    /// True if every pad is a fiducial.
    pub fn is_fiducial(&self) -> bool {
        !self.pads.is_empty() && self.pads.iter().all(|p| p.function == PadFunction::Fiducial)
    }
}

/// Builder-style helpers for tests and examples.
impl Pad {
    pub fn smt(name: &str, position: Point, width: Length, height: Length) -> Option<Self> {
        Some(Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            position,
            rotation: Angle::deg0(),
            shape: PadShape::Rect,
            width: PositiveLength::new(width).ok()?,
            height: PositiveLength::new(height).ok()?,
            corner_radius: UnsignedLength::zero(),
            kind: PadKind::Smt,
            function: PadFunction::Standard,
            net: None,
        })
    }

    pub fn tht(name: &str, position: Point, size: Length, drill: Length) -> Option<Self> {
        Some(Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            position,
            rotation: Angle::deg0(),
            shape: PadShape::Round,
            width: PositiveLength::new(size).ok()?,
            height: PositiveLength::new(size).ok()?,
            corner_radius: UnsignedLength::zero(),
            kind: PadKind::Tht {
                holes: vec![PadHole {
                    uuid: Uuid::new_v4(),
                    diameter: PositiveLength::new(drill).ok()?,
                    path: Path::point(Point::origin()),
                }],
            },
            function: PadFunction::Standard,
            net: None,
        })
    }
}
