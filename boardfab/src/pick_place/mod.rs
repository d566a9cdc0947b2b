//! Pick-and-place data
//!
//! Maps the placed devices of a board to assembly placement records.
//! [`PickPlaceCsvWriter`] renders them for the assembly house.

pub mod csv_writer;

pub use csv_writer::PickPlaceCsvWriter;

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{AssemblyType, Board, BoardSide, Device};
use crate::geometry::{Angle, Point};
use crate::gerber::MountType;

#[derive(Debug, Error)]
pub enum PickPlaceError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// How a placed device is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickPlaceMountType {
    Tht,
    Smt,
    Mixed,
    Fiducial,
    Other,
}

impl PickPlaceMountType {
    /// Mount type of a resolved assembly type, `None` for devices that are
    /// not mounted at all.
    pub fn from_assembly_type(assembly: AssemblyType) -> Option<Self> {
        match assembly {
            AssemblyType::None | AssemblyType::Auto => None,
            AssemblyType::Tht => Some(PickPlaceMountType::Tht),
            AssemblyType::Smt => Some(PickPlaceMountType::Smt),
            AssemblyType::Mixed => Some(PickPlaceMountType::Mixed),
            AssemblyType::Other => Some(PickPlaceMountType::Other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PickPlaceMountType::Tht => "THT",
            PickPlaceMountType::Smt => "SMT",
            PickPlaceMountType::Mixed => "Mixed",
            PickPlaceMountType::Fiducial => "Fiducial",
            PickPlaceMountType::Other => "Other",
        }
    }

    /// Mount type attribute of the Gerber component layers.
    pub fn to_gerber(self) -> MountType {
        match self {
            PickPlaceMountType::Tht | PickPlaceMountType::Mixed => MountType::Tht,
            PickPlaceMountType::Smt => MountType::Smd,
            PickPlaceMountType::Fiducial => MountType::Fiducial,
            PickPlaceMountType::Other => MountType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickPlaceItem {
    pub designator: String,
    pub value: String,
    pub device_name: String,
    pub package_name: String,
    pub position: Point,
    /// Counter-clockwise, as seen from the side the device is mounted on.
    pub rotation: Angle,
    pub board_side: BoardSide,
    pub mount_type: PickPlaceMountType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickPlaceData {
    pub project_name: String,
    pub board_name: String,
    pub creation_date: DateTime<FixedOffset>,
    pub items: Vec<PickPlaceItem>,
}

impl PickPlaceData {
    pub fn items_on(&self, side: BoardSide) -> impl Iterator<Item = &PickPlaceItem> {
        self.items.iter().filter(move |i| i.board_side == side)
    }
}

pub struct BoardPickPlaceGenerator<'a> {
    board: &'a Board,
    project_name: String,
    creation_date: DateTime<FixedOffset>,
}

impl<'a> BoardPickPlaceGenerator<'a> {
    pub fn new(board: &'a Board) -> Self {
        Self {
            board,
            project_name: board.name.clone(),
            creation_date: Local::now().fixed_offset(),
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.creation_date = date;
        self
    }

    pub fn generate(&self) -> PickPlaceData {
        let items: Vec<PickPlaceItem> = self.board.devices.iter().filter_map(item_for).collect();
        tracing::debug!(
            "Generated {} pick-and-place items of {} devices",
            items.len(),
            self.board.devices.len()
        );
        PickPlaceData {
            project_name: self.project_name.clone(),
            board_name: self.board.name.clone(),
            creation_date: self.creation_date,
            items,
        }
    }
}

fn item_for(device: &Device) -> Option<PickPlaceItem> {
    let mut mount_type = PickPlaceMountType::from_assembly_type(device.resolved_assembly_type())?;
    if device.is_fiducial() {
        mount_type = PickPlaceMountType::Fiducial;
    }

    let board_side = device.side();
    let rotation = match board_side {
        BoardSide::Top => device.rotation,
        BoardSide::Bottom => Angle::deg180() - device.rotation,
    }
    .mapped_to_0_360();

    Some(PickPlaceItem {
        designator: device.name.clone(),
        value: device.value.clone(),
        device_name: device.device_name.clone(),
        package_name: device.package_name.clone(),
        position: device.position,
        rotation,
        board_side,
        mount_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pad, PadFunction};
    use crate::geometry::Length;
    use uuid::Uuid;

    fn device(name: &str, assembly_type: AssemblyType, pads: Vec<Pad>) -> Device {
        Device {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            value: "10k".to_string(),
            device_name: "Resistor".to_string(),
            package_name: "R0603".to_string(),
            position: Point::from_mm(10.0, 5.0),
            rotation: Angle::deg90(),
            mirrored: false,
            assembly_type,
            pads,
            holes: vec![],
            courtyard: vec![],
        }
    }

    fn smt() -> Pad {
        Pad::smt("1", Point::origin(), Length::from_mm(0.8), Length::from_mm(0.8)).unwrap()
    }

    fn generate(devices: Vec<Device>) -> PickPlaceData {
        let mut board = Board::new("main");
        board.devices = devices;
        BoardPickPlaceGenerator::new(&board).generate()
    }

    #[test]
    fn test_not_mounted_devices_are_skipped() {
        let data = generate(vec![
            device("R1", AssemblyType::Smt, vec![]),
            device("LOGO1", AssemblyType::None, vec![smt()]),
            device("H1", AssemblyType::Auto, vec![]),
            device("R2", AssemblyType::Auto, vec![smt()]),
        ]);
        let names: Vec<&str> = data.items.iter().map(|i| i.designator.as_str()).collect();
        assert_eq!(names, vec!["R1", "R2"]);
        assert_eq!(data.items[1].mount_type, PickPlaceMountType::Smt);
    }

    #[test]
    fn test_auto_resolves_from_pads() {
        let tht = Pad::tht("2", Point::origin(), Length::from_mm(1.6), Length::from_mm(0.8)).unwrap();
        let data = generate(vec![device("J1", AssemblyType::Auto, vec![smt(), tht])]);
        assert_eq!(data.items[0].mount_type, PickPlaceMountType::Mixed);
    }

    #[test]
    fn test_fiducials() {
        let mut pad = smt();
        pad.function = PadFunction::Fiducial;
        let data = generate(vec![
            device("FID1", AssemblyType::Auto, vec![pad.clone()]),
            device("FID2", AssemblyType::None, vec![pad]),
        ]);
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].mount_type, PickPlaceMountType::Fiducial);
    }

    #[test]
    fn test_bottom_rotation_is_mirrored() {
        let mut bottom = device("U1", AssemblyType::Smt, vec![]);
        bottom.mirrored = true;
        bottom.rotation = Angle::from_deg(30.0);
        let mut top = device("U2", AssemblyType::Smt, vec![]);
        top.rotation = Angle::from_deg(-90.0);
        let data = generate(vec![bottom, top]);

        assert_eq!(data.items[0].board_side, BoardSide::Bottom);
        assert_eq!(data.items[0].rotation, Angle::from_deg(150.0));
        assert_eq!(data.items[1].rotation, Angle::deg270());
        assert_eq!(data.items_on(BoardSide::Top).count(), 1);
    }
}
