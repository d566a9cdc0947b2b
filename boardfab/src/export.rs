//! Fabrication export
//!
//! Runs the Gerber, Excellon and pick-and-place writers over a board and
//! collects the resulting files in memory.

use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, BoardSide, Device, Layer, Pad, PadFunction, PadShape};
use crate::excellon::{ExcellonError, ExcellonGenerator};
use crate::geometry::{Length, Point, PositiveLength, UnsignedLength};
use crate::gerber::{
    ApertureFunction, AttributeStyle, ComponentFlash, CopperSide, FileFunction, FileMetadata,
    GerberGenerator, ObjectAttributes, Plating,
};
use crate::pick_place::{BoardPickPlaceGenerator, PickPlaceCsvWriter, PickPlaceData, PickPlaceError};
use crate::BoardFabError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Drill file error: {0}")]
    Excellon(#[from] ExcellonError),
    #[error("Pick-and-place error: {0}")]
    PickPlace(#[from] PickPlaceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn mm(value: f64) -> UnsignedLength {
    UnsignedLength::from_mm(value).unwrap_or_default()
}

/// Output file naming and generator switches. Missing fields in JSON files
/// fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricationSettings {
    /// Prefix of every file name, the board name if empty.
    pub base_name: String,
    pub suffix_outlines: String,
    pub suffix_copper_top: String,
    /// `{{CU_LAYER}}` is replaced by the inner layer number.
    pub suffix_copper_inner: String,
    pub suffix_copper_bot: String,
    pub suffix_solder_mask_top: String,
    pub suffix_solder_mask_bot: String,
    pub suffix_component_top: String,
    pub suffix_component_bot: String,
    pub suffix_drills_pth: String,
    pub suffix_drills_npth: String,
    pub suffix_drills: String,
    pub suffix_pick_place_top: String,
    pub suffix_pick_place_bot: String,

    /// Plated and non-plated holes in a single Excellon file.
    pub merge_drill_files: bool,
    pub use_g85_slot_command: bool,
    pub enable_component_layers: bool,
    pub enable_pick_place: bool,
    pub attribute_style: AttributeStyle,
    /// Grows every solder mask opening on each side.
    pub solder_mask_expansion: UnsignedLength,
    pub outline_width: UnsignedLength,
}

impl Default for FabricationSettings {
    fn default() -> Self {
        Self {
            base_name: String::new(),
            suffix_outlines: "_OUTLINES.gbr".to_string(),
            suffix_copper_top: "_COPPER-TOP.gbr".to_string(),
            suffix_copper_inner: "_COPPER-IN{{CU_LAYER}}.gbr".to_string(),
            suffix_copper_bot: "_COPPER-BOTTOM.gbr".to_string(),
            suffix_solder_mask_top: "_SOLDERMASK-TOP.gbr".to_string(),
            suffix_solder_mask_bot: "_SOLDERMASK-BOTTOM.gbr".to_string(),
            suffix_component_top: "_COMPONENTS-TOP.gbr".to_string(),
            suffix_component_bot: "_COMPONENTS-BOTTOM.gbr".to_string(),
            suffix_drills_pth: "_DRILLS-PTH.drl".to_string(),
            suffix_drills_npth: "_DRILLS-NPTH.drl".to_string(),
            suffix_drills: "_DRILLS.drl".to_string(),
            suffix_pick_place_top: "_PNP-TOP.csv".to_string(),
            suffix_pick_place_bot: "_PNP-BOTTOM.csv".to_string(),
            merge_drill_files: false,
            use_g85_slot_command: false,
            enable_component_layers: true,
            enable_pick_place: true,
            attribute_style: AttributeStyle::Comment,
            solder_mask_expansion: mm(0.05),
            outline_width: UnsignedLength::zero(),
        }
    }
}

impl FabricationSettings {
    pub fn load_json(path: &FsPath) -> Result<Self, BoardFabError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, BoardFabError> {
        serde_json::from_str(json).map_err(|e| BoardFabError::Parse(e.to_string()))
    }
}

/// A generated fabrication file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

pub struct BoardFabricationExport<'a> {
    board: &'a Board,
    settings: FabricationSettings,
    metadata: FileMetadata,
}

impl<'a> BoardFabricationExport<'a> {
    pub fn new(board: &'a Board, settings: FabricationSettings) -> Self {
        let metadata = FileMetadata::new(board.name.clone(), board.uuid, "");
        Self {
            board,
            settings,
            metadata,
        }
    }

    /// Project name, revision and date stamped into every file.
    pub fn with_metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    fn file_name(&self, suffix: &str) -> String {
        let base = if self.settings.base_name.is_empty() {
            &self.board.name
        } else {
            &self.settings.base_name
        };
        format!("{}{}", base, suffix)
    }

    fn gerber(&self, function: FileFunction) -> GerberGenerator {
        GerberGenerator::with_attribute_style(
            self.metadata.clone(),
            Some(function),
            self.settings.attribute_style,
        )
    }

    fn net_name(&self, net: Option<&uuid::Uuid>) -> String {
        net.map(|n| self.board.net_name(Some(n))).unwrap_or_default()
    }

    /// Generate all files, in a fixed order.
    pub fn export(&self) -> Result<Vec<OutputFile>, ExportError> {
        tracing::info!("Exporting fabrication data of board '{}'", self.board.name);
        let mut files = vec![self.outlines()];
        for layer in self.board.copper_layers() {
            files.push(self.copper(layer));
        }
        files.push(self.solder_mask(BoardSide::Top));
        files.push(self.solder_mask(BoardSide::Bottom));

        let pick_place = BoardPickPlaceGenerator::new(self.board)
            .with_project_name(self.metadata.project_name.clone())
            .with_creation_date(self.metadata.creation_date)
            .generate();
        if self.settings.enable_component_layers {
            files.push(self.components(&pick_place, BoardSide::Top));
            files.push(self.components(&pick_place, BoardSide::Bottom));
        }
        files.extend(self.drills()?);
        if self.settings.enable_pick_place {
            for (side, suffix) in [
                (BoardSide::Top, &self.settings.suffix_pick_place_top),
                (BoardSide::Bottom, &self.settings.suffix_pick_place_bot),
            ] {
                let mut writer = PickPlaceCsvWriter::new(&pick_place);
                writer.set_board_side(Some(side));
                files.push(OutputFile {
                    name: self.file_name(suffix),
                    content: writer.generate_csv()?,
                });
            }
        }
        tracing::info!("Generated {} fabrication files", files.len());
        Ok(files)
    }

    /// Export and write every file into `dir`.
    pub fn write_to_dir(&self, dir: &FsPath) -> Result<Vec<PathBuf>, ExportError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for file in self.export()? {
            let path = dir.join(&file.name);
            crate::core::write_file_atomic(&path, file.content.as_bytes())?;
            tracing::debug!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    fn outlines(&self) -> OutputFile {
        let mut gen = self.gerber(FileFunction::Profile { plated: false });
        let attributes = ObjectAttributes::default();
        for outline in &self.board.outlines {
            gen.draw_path_outline(
                outline,
                self.settings.outline_width,
                Some(ApertureFunction::Profile),
                &attributes,
            );
        }
        gen.generate();
        OutputFile {
            name: self.file_name(&self.settings.suffix_outlines),
            content: gen.to_str().to_string(),
        }
    }

    fn copper(&self, layer: Layer) -> OutputFile {
        let inner = self.board.inner_copper_layers;
        let (side, suffix) = match layer {
            Layer::TopCopper => (CopperSide::Top, self.settings.suffix_copper_top.clone()),
            Layer::InnerCopper(n) => (
                CopperSide::Inner,
                self.settings
                    .suffix_copper_inner
                    .replace("{{CU_LAYER}}", &n.to_string()),
            ),
            Layer::BottomCopper => (CopperSide::Bottom, self.settings.suffix_copper_bot.clone()),
        };
        let mut gen = self.gerber(FileFunction::Copper {
            number: layer.index(inner) + 1,
            side,
        });
        let conductor = Some(ApertureFunction::Conductor);

        for plane in self.board.planes.iter().filter(|p| p.layer == layer) {
            let attributes = ObjectAttributes::net(self.net_name(Some(&plane.net)));
            for fragment in &plane.fragments {
                gen.draw_path_area(fragment, conductor, &attributes);
            }
        }

        for polygon in self.board.polygons.iter().filter(|p| p.layer == layer) {
            let attributes = ObjectAttributes::net(self.net_name(polygon.net.as_ref()));
            if polygon.is_area() {
                gen.draw_path_area(&polygon.path, conductor, &attributes);
            }
            if polygon.line_width.get() > Length::zero() {
                gen.draw_path_outline(&polygon.path, polygon.line_width, conductor, &attributes);
            }
        }

        for trace in self.board.traces.iter().filter(|t| t.layer == layer) {
            gen.draw_line(
                trace.start,
                trace.end,
                trace.width.to_unsigned(),
                conductor,
                &ObjectAttributes::net(self.net_name(trace.net.as_ref())),
            );
        }

        for via in &self.board.vias {
            if self
                .board
                .copper_layers_between(via.start_layer, via.end_layer)
                .contains(&layer)
            {
                gen.flash_circle(
                    via.position,
                    via.size,
                    Some(ApertureFunction::ViaPad),
                    &ObjectAttributes::net(self.net_name(via.net.as_ref())),
                );
            }
        }

        let all_layers = self.board.copper_layers();
        for device in &self.board.devices {
            for pad in &device.pads {
                if !pad.copper_layers(device.side(), &all_layers).contains(&layer) {
                    continue;
                }
                let attributes = ObjectAttributes::net(self.net_name(pad.net.as_ref()))
                    .with_pin(&device.name, &pad.name);
                flash_pad(&mut gen, device, pad, Length::zero(), Some(pad_function(pad)), &attributes);
            }
        }

        gen.generate();
        OutputFile {
            name: self.file_name(&suffix),
            content: gen.to_str().to_string(),
        }
    }

    fn solder_mask(&self, side: BoardSide) -> OutputFile {
        let top = side == BoardSide::Top;
        let mut gen = self.gerber(FileFunction::SolderMask { top });
        let expansion = self.settings.solder_mask_expansion.get();
        let layer = side.copper_layer();
        let all_layers = self.board.copper_layers();
        let attributes = ObjectAttributes::default();

        for via in self.board.vias.iter().filter(|v| v.exposed) {
            if !self
                .board
                .copper_layers_between(via.start_layer, via.end_layer)
                .contains(&layer)
            {
                continue;
            }
            match PositiveLength::new(via.size.get() + expansion * 2) {
                Ok(size) => gen.flash_circle(via.position, size, None, &attributes),
                Err(e) => tracing::warn!("Skipping via solder mask opening: {}", e),
            }
        }

        for device in &self.board.devices {
            for pad in &device.pads {
                if pad.copper_layers(device.side(), &all_layers).contains(&layer) {
                    flash_pad(&mut gen, device, pad, expansion, None, &attributes);
                }
            }
        }

        gen.generate();
        let suffix = if top {
            &self.settings.suffix_solder_mask_top
        } else {
            &self.settings.suffix_solder_mask_bot
        };
        OutputFile {
            name: self.file_name(suffix),
            content: gen.to_str().to_string(),
        }
    }

    fn components(&self, pick_place: &PickPlaceData, side: BoardSide) -> OutputFile {
        let top = side == BoardSide::Top;
        let number = if top {
            1
        } else {
            self.board.copper_layer_count()
        };
        let mut gen = self.gerber(FileFunction::Component { number, top });

        for item in pick_place.items_on(side) {
            let Some(device) = self.board.devices.iter().find(|d| d.name == item.designator)
            else {
                continue;
            };
            gen.flash_component(
                item.position,
                &ComponentFlash {
                    designator: item.designator.clone(),
                    value: item.value.clone(),
                    mount: item.mount_type.to_gerber(),
                    footprint: item.package_name.clone(),
                    rotation: item.rotation,
                },
            );
            let transform = device.transform();
            let attributes = ObjectAttributes::default().with_component(&device.name);
            for courtyard in &device.courtyard {
                gen.draw_path_outline(
                    &transform.map_path(courtyard),
                    UnsignedLength::zero(),
                    Some(ApertureFunction::ComponentOutlineCourtyard),
                    &attributes,
                );
            }
            for pad in &device.pads {
                let position = device.pad_transform(pad).map(Point::origin());
                gen.flash_component_pin(position, &device.name, &pad.name, pad.name == "1");
            }
        }

        gen.generate();
        let suffix = if top {
            &self.settings.suffix_component_top
        } else {
            &self.settings.suffix_component_bot
        };
        OutputFile {
            name: self.file_name(suffix),
            content: gen.to_str().to_string(),
        }
    }

    fn excellon(&self, plating: Plating) -> ExcellonGenerator {
        let mut gen = ExcellonGenerator::new(
            self.metadata.clone(),
            plating,
            1,
            self.board.copper_layer_count(),
        );
        gen.set_use_g85_slots(self.settings.use_g85_slot_command);
        gen
    }

    fn add_plated_holes(&self, gen: &mut ExcellonGenerator) {
        for via in &self.board.vias {
            gen.drill(via.position, via.drill, true, ApertureFunction::ViaDrill);
        }
        for device in &self.board.devices {
            for pad in &device.pads {
                let transform = device.pad_transform(pad);
                for hole in pad.holes() {
                    gen.drill_path(
                        &transform.map_path(&hole.path),
                        hole.diameter,
                        true,
                        ApertureFunction::ComponentDrill,
                    );
                }
            }
        }
    }

    fn add_non_plated_holes(&self, gen: &mut ExcellonGenerator) {
        for hole in &self.board.holes {
            gen.drill_path(&hole.path, hole.diameter, false, ApertureFunction::MechanicalDrill);
        }
        for device in &self.board.devices {
            let transform = device.transform();
            for hole in &device.holes {
                gen.drill_path(
                    &transform.map_path(&hole.path),
                    hole.diameter,
                    false,
                    ApertureFunction::MechanicalDrill,
                );
            }
        }
    }

    fn drills(&self) -> Result<Vec<OutputFile>, ExportError> {
        if self.settings.merge_drill_files {
            let mut gen = self.excellon(Plating::Mixed);
            self.add_plated_holes(&mut gen);
            self.add_non_plated_holes(&mut gen);
            gen.generate()?;
            return Ok(vec![OutputFile {
                name: self.file_name(&self.settings.suffix_drills),
                content: gen.to_str().to_string(),
            }]);
        }

        let mut pth = self.excellon(Plating::Yes);
        self.add_plated_holes(&mut pth);
        pth.generate()?;
        let mut npth = self.excellon(Plating::No);
        self.add_non_plated_holes(&mut npth);
        npth.generate()?;
        Ok(vec![
            OutputFile {
                name: self.file_name(&self.settings.suffix_drills_pth),
                content: pth.to_str().to_string(),
            },
            OutputFile {
                name: self.file_name(&self.settings.suffix_drills_npth),
                content: npth.to_str().to_string(),
            },
        ])
    }
}

fn pad_function(pad: &Pad) -> ApertureFunction {
    match pad.function {
        PadFunction::Fiducial => ApertureFunction::FiducialPadLocal,
        PadFunction::TestPad => ApertureFunction::TestPad,
        PadFunction::Standard if pad.is_tht() => ApertureFunction::ComponentPad,
        PadFunction::Standard => ApertureFunction::SmdPadCopperDefined,
    }
}

/// Flash a pad, grown by `expansion` on every side.
fn flash_pad(
    gen: &mut GerberGenerator,
    device: &Device,
    pad: &Pad,
    expansion: Length,
    function: Option<ApertureFunction>,
    attributes: &ObjectAttributes,
) {
    let transform = device.pad_transform(pad);
    let position = transform.map(Point::origin());
    let rotation = transform.rotation;
    let grow = |l: PositiveLength| PositiveLength::new(l.get() + expansion * 2);
    let (width, height) = match (grow(pad.width), grow(pad.height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            tracing::warn!("Skipping pad {}.{} with invalid size", device.name, pad.name);
            return;
        }
    };
    let radius = match UnsignedLength::new(pad.corner_radius.get() + expansion) {
        Ok(r) if pad.corner_radius.get() > Length::zero() => r,
        _ => UnsignedLength::zero(),
    };

    match pad.shape {
        PadShape::Round if width == height => {
            gen.flash_circle(position, width, function, attributes)
        }
        PadShape::Round => gen.flash_obround(position, width, height, rotation, function, attributes),
        PadShape::Rect => {
            gen.flash_rect(position, width, height, radius, rotation, function, attributes)
        }
        PadShape::Octagon => {
            gen.flash_octagon(position, width, height, radius, rotation, function, attributes)
        }
    }
}
