use std::path::Path as FsPath;

use serde::Serialize;

use super::{PickPlaceData, PickPlaceError, PickPlaceItem};
use crate::board::BoardSide;

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    #[serde(rename = "Designator")]
    designator: &'a str,
    #[serde(rename = "Value")]
    value: &'a str,
    #[serde(rename = "Device")]
    device: &'a str,
    #[serde(rename = "Package")]
    package: &'a str,
    #[serde(rename = "Position X")]
    x: String,
    #[serde(rename = "Position Y")]
    y: String,
    #[serde(rename = "Rotation")]
    rotation: String,
    #[serde(rename = "Side")]
    side: &'static str,
    #[serde(rename = "Type")]
    mount_type: &'static str,
}

impl<'a> From<&'a PickPlaceItem> for CsvRecord<'a> {
    fn from(item: &'a PickPlaceItem) -> Self {
        CsvRecord {
            designator: &item.designator,
            value: &item.value,
            device: &item.device_name,
            package: &item.package_name,
            x: item.position.x.to_mm_string(),
            y: item.position.y.to_mm_string(),
            rotation: item.rotation.to_deg_string(),
            side: side_name(item.board_side),
            mount_type: item.mount_type.as_str(),
        }
    }
}

fn side_name(side: BoardSide) -> &'static str {
    match side {
        BoardSide::Top => "Top",
        BoardSide::Bottom => "Bottom",
    }
}

/// Renders pick-and-place data as CSV, optionally restricted to one side.
///
/// Positions are in millimeters, rotations in degrees counter-clockwise.
pub struct PickPlaceCsvWriter<'a> {
    data: &'a PickPlaceData,
    board_side: Option<BoardSide>,
    include_comment: bool,
}

impl<'a> PickPlaceCsvWriter<'a> {
    pub fn new(data: &'a PickPlaceData) -> Self {
        Self {
            data,
            board_side: None,
            include_comment: true,
        }
    }

    pub fn set_board_side(&mut self, side: Option<BoardSide>) {
        self.board_side = side;
    }

    /// Comment lines (`# ...`) with project name, date and units.
    pub fn set_include_comment(&mut self, include: bool) {
        self.include_comment = include;
    }

    fn comment(&self) -> String {
        let side = match self.board_side {
            Some(side) => side_name(side),
            None => "Top + Bottom",
        };
        [
            "# Pick&Place Position Data".to_string(),
            format!("# Project: {}", self.data.project_name),
            format!("# Board: {}", self.data.board_name),
            format!("# Date: {}", self.data.creation_date.to_rfc3339()),
            "# Unit: mm".to_string(),
            "# Rotation: Degrees CCW".to_string(),
            format!("# Board Side: {}", side),
            String::new(),
        ]
        .join("\n")
    }

    pub fn generate_csv(&self) -> Result<String, PickPlaceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let items = self
            .data
            .items
            .iter()
            .filter(|i| self.board_side.map_or(true, |side| i.board_side == side));
        let mut count = 0;
        for item in items {
            writer.serialize(CsvRecord::from(item))?;
            count += 1;
        }
        if count == 0 {
            writer.write_record([
                "Designator",
                "Value",
                "Device",
                "Package",
                "Position X",
                "Position Y",
                "Rotation",
                "Side",
                "Type",
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| PickPlaceError::Io(e.into_error()))?;

        let mut output = if self.include_comment {
            self.comment()
        } else {
            String::new()
        };
        output.push_str(&String::from_utf8(bytes)?);
        Ok(output)
    }

    pub fn save_to_file(&self, path: &FsPath) -> Result<(), PickPlaceError> {
        let csv = self.generate_csv()?;
        crate::core::write_file_atomic(path, csv.as_bytes())?;
        tracing::info!("Wrote pick-and-place data to {}", path.display());
        Ok(())
    }
}
