use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::geometry::UnsignedLength;
use crate::BoardFabError;

/// Which slots produce a manufacturability warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotWarningLevel {
    /// Only slots containing arcs.
    CurvedOnly,
    /// Slots with more than one segment or any arc.
    MultiSegmentOrCurved,
    /// Every slot.
    All,
}

impl SlotWarningLevel {
    pub fn applies_to(self, segments: usize, curved: bool) -> bool {
        match self {
            SlotWarningLevel::CurvedOnly => curved,
            SlotWarningLevel::MultiSegmentOrCurved => curved || segments > 1,
            SlotWarningLevel::All => true,
        }
    }
}

fn mm(value: f64) -> UnsignedLength {
    UnsignedLength::from_mm(value).unwrap_or_default()
}

/// Settings of a design rule check run. Missing fields in JSON files fall
/// back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrcOptions {
    pub rebuild_planes: bool,

    pub check_copper_width: bool,
    pub min_copper_width: UnsignedLength,

    pub check_copper_copper_clearance: bool,
    pub min_copper_copper_clearance: UnsignedLength,

    pub check_copper_board_clearance: bool,
    pub min_copper_board_clearance: UnsignedLength,

    pub check_copper_npth_clearance: bool,
    pub min_copper_npth_clearance: UnsignedLength,

    pub check_pth_restring: bool,
    pub min_pth_restring: UnsignedLength,

    pub check_pth_drill_diameter: bool,
    pub min_pth_drill_diameter: UnsignedLength,
    pub max_pth_drill_diameter: UnsignedLength,

    pub check_npth_drill_diameter: bool,
    pub min_npth_drill_diameter: UnsignedLength,
    pub max_npth_drill_diameter: UnsignedLength,

    pub check_pth_slot_width: bool,
    pub min_pth_slot_width: UnsignedLength,

    pub check_npth_slot_width: bool,
    pub min_npth_slot_width: UnsignedLength,

    pub check_pth_slot_warnings: bool,
    pub pth_slot_warning_level: SlotWarningLevel,

    pub check_npth_slot_warnings: bool,
    pub npth_slot_warning_level: SlotWarningLevel,

    pub check_courtyard_clearance: bool,
    /// Added around every courtyard before testing for overlaps.
    pub courtyard_offset: UnsignedLength,

    pub check_broken_pad_connections: bool,
    pub check_missing_connections: bool,
}

impl Default for DrcOptions {
    fn default() -> Self {
        Self {
            rebuild_planes: true,
            check_copper_width: true,
            min_copper_width: mm(0.2),
            check_copper_copper_clearance: true,
            min_copper_copper_clearance: mm(0.2),
            check_copper_board_clearance: true,
            min_copper_board_clearance: mm(0.3),
            check_copper_npth_clearance: true,
            min_copper_npth_clearance: mm(0.25),
            check_pth_restring: true,
            min_pth_restring: mm(0.2),
            check_pth_drill_diameter: true,
            min_pth_drill_diameter: mm(0.3),
            max_pth_drill_diameter: mm(6.3),
            check_npth_drill_diameter: true,
            min_npth_drill_diameter: mm(0.3),
            max_npth_drill_diameter: mm(6.3),
            check_pth_slot_width: true,
            min_pth_slot_width: mm(0.7),
            check_npth_slot_width: true,
            min_npth_slot_width: mm(1.0),
            check_pth_slot_warnings: true,
            pth_slot_warning_level: SlotWarningLevel::CurvedOnly,
            check_npth_slot_warnings: true,
            npth_slot_warning_level: SlotWarningLevel::MultiSegmentOrCurved,
            check_courtyard_clearance: true,
            courtyard_offset: UnsignedLength::zero(),
            check_broken_pad_connections: true,
            check_missing_connections: true,
        }
    }
}

impl DrcOptions {
    /// Load options from a JSON file.
    pub fn load_json(path: &FsPath) -> Result<Self, BoardFabError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, BoardFabError> {
        serde_json::from_str(json).map_err(|e| BoardFabError::Parse(e.to_string()))
    }
}
