//! Gerber X2/X3 attributes.
//!
//! Attributes can be written as native extended commands (`%TA...*%`) or
//! hidden in comments (`G04 #@! TA...*`) for CAM tools that choke on
//! unknown extended commands. Excellon files always use the comment form
//! (`; #@! TA...`).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Angle;

/// How attributes are embedded into Gerber output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeStyle {
    /// `G04 #@! TA.AperFunction,Conductor*`
    #[default]
    Comment,
    /// `%TA.AperFunction,Conductor*%`
    Extended,
}

/// Value of the `.AperFunction` aperture attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApertureFunction {
    ViaDrill,
    ComponentDrill,
    MechanicalDrill,
    ComponentPad,
    SmdPadCopperDefined,
    SmdPadSolderMaskDefined,
    ViaPad,
    TestPad,
    FiducialPadGlobal,
    FiducialPadLocal,
    Conductor,
    NonConductor,
    Profile,
    ComponentMain,
    ComponentPin,
    ComponentOutlineBody,
    ComponentOutlineCourtyard,
    Other,
}

impl ApertureFunction {
    pub fn as_x2(self) -> &'static str {
        match self {
            ApertureFunction::ViaDrill => "ViaDrill",
            ApertureFunction::ComponentDrill => "ComponentDrill",
            ApertureFunction::MechanicalDrill => "MechanicalDrill",
            ApertureFunction::ComponentPad => "ComponentPad",
            ApertureFunction::SmdPadCopperDefined => "SMDPad,CuDef",
            ApertureFunction::SmdPadSolderMaskDefined => "SMDPad,SMDef",
            ApertureFunction::ViaPad => "ViaPad",
            ApertureFunction::TestPad => "TestPad",
            ApertureFunction::FiducialPadGlobal => "FiducialPad,Global",
            ApertureFunction::FiducialPadLocal => "FiducialPad,Local",
            ApertureFunction::Conductor => "Conductor",
            ApertureFunction::NonConductor => "NonConductor",
            ApertureFunction::Profile => "Profile",
            ApertureFunction::ComponentMain => "ComponentMain",
            ApertureFunction::ComponentPin => "ComponentPin",
            ApertureFunction::ComponentOutlineBody => "ComponentOutline,Body",
            ApertureFunction::ComponentOutlineCourtyard => "ComponentOutline,Courtyard",
            ApertureFunction::Other => "Other,Unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopperSide {
    Top,
    Inner,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    fn as_x2(self) -> &'static str {
        match self {
            Polarity::Positive => "Positive",
            Polarity::Negative => "Negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plating {
    Yes,
    No,
    Mixed,
}

/// Value of the `.FileFunction` file attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFunction {
    /// Copper layer number (1 = top) and side.
    Copper { number: u8, side: CopperSide },
    SolderMask { top: bool },
    Profile { plated: bool },
    Component { number: u8, top: bool },
    /// Drill file spanning copper layers `from..=to`.
    Drill { plating: Plating, from: u8, to: u8 },
}

impl FileFunction {
    fn as_x2(self) -> String {
        let side = |top: bool| if top { "Top" } else { "Bot" };
        match self {
            FileFunction::Copper { number, side } => {
                let side = match side {
                    CopperSide::Top => "Top",
                    CopperSide::Inner => "Inr",
                    CopperSide::Bottom => "Bot",
                };
                format!("Copper,L{},{}", number, side)
            }
            FileFunction::SolderMask { top } => format!("Soldermask,{}", side(top)),
            FileFunction::Profile { plated } => {
                format!("Profile,{}", if plated { "P" } else { "NP" })
            }
            FileFunction::Component { number, top } => {
                format!("Component,L{},{}", number, side(top))
            }
            FileFunction::Drill { plating, from, to } => match plating {
                Plating::Yes => format!("Plated,{},{},PTH", from, to),
                Plating::No => format!("NonPlated,{},{},NPTH", from, to),
                Plating::Mixed => format!("MixedPlating,{},{}", from, to),
            },
        }
    }
}

/// Mount type for the `.CMnt` component attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountType {
    Tht,
    Smd,
    Fiducial,
    Other,
}

impl MountType {
    fn as_x2(self) -> &'static str {
        match self {
            MountType::Tht => "TH",
            MountType::Smd => "SMD",
            MountType::Fiducial => "Fiducial",
            MountType::Other => "Other",
        }
    }
}

/// A single attribute command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    GenerationSoftware { vendor: String, application: String, version: String },
    CreationDate(DateTime<FixedOffset>),
    ProjectId { name: String, uuid: Uuid, revision: String },
    PartSingle,
    SameCoordinates,
    FileFunction(FileFunction),
    FilePolarity(Polarity),
    Md5(String),
    ApertureFunction(ApertureFunction),
    /// Aperture function of an Excellon tool, which also carries the plating.
    DrillFunction { plated: bool, function: ApertureFunction },
    ObjectNet(String),
    ObjectComponent(String),
    ObjectPin { component: String, pin: String, function: Option<String> },
    ComponentRotation(Angle),
    ComponentValue(String),
    ComponentMount(MountType),
    ComponentFootprint(String),
    /// Delete all aperture and object attributes.
    Delete,
    /// Delete only the `.AperFunction` attribute, keeping object attributes.
    DeleteApertureFunction,
}

impl Attribute {
    pub fn generation_software() -> Self {
        Attribute::GenerationSoftware {
            vendor: "boardfab".to_string(),
            application: "boardfab".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Attribute body without delimiters, e.g. `TA.AperFunction,Conductor`.
    pub fn body(&self) -> String {
        match self {
            Attribute::GenerationSoftware {
                vendor,
                application,
                version,
            } => format!(
                "TF.GenerationSoftware,{},{},{}",
                escape_value(vendor),
                escape_value(application),
                escape_value(version)
            ),
            Attribute::CreationDate(date) => {
                format!("TF.CreationDate,{}", date.format("%Y-%m-%dT%H:%M:%S%:z"))
            }
            Attribute::ProjectId {
                name,
                uuid,
                revision,
            } => format!(
                "TF.ProjectId,{},{},{}",
                escape_value(name),
                uuid,
                escape_value(revision)
            ),
            Attribute::PartSingle => "TF.Part,Single".to_string(),
            Attribute::SameCoordinates => "TF.SameCoordinates".to_string(),
            Attribute::FileFunction(function) => format!("TF.FileFunction,{}", function.as_x2()),
            Attribute::FilePolarity(polarity) => format!("TF.FilePolarity,{}", polarity.as_x2()),
            Attribute::Md5(hash) => format!("TF.MD5,{}", hash),
            Attribute::ApertureFunction(function) => {
                format!("TA.AperFunction,{}", function.as_x2())
            }
            Attribute::DrillFunction { plated, function } => {
                let plating = if *plated { "Plated,PTH" } else { "NonPlated,NPTH" };
                format!("TA.AperFunction,{},{}", plating, function.as_x2())
            }
            Attribute::ObjectNet(net) => format!("TO.N,{}", escape_value(net)),
            Attribute::ObjectComponent(component) => format!("TO.C,{}", escape_value(component)),
            Attribute::ObjectPin {
                component,
                pin,
                function,
            } => {
                let mut s = format!("TO.P,{},{}", escape_value(component), escape_value(pin));
                if let Some(function) = function {
                    s.push(',');
                    s.push_str(&escape_value(function));
                }
                s
            }
            Attribute::ComponentRotation(rotation) => {
                format!("TO.CRot,{}", rotation.mapped_to_0_360().to_deg_string())
            }
            Attribute::ComponentValue(value) => format!("TO.CVal,{}", escape_value(value)),
            Attribute::ComponentMount(mount) => format!("TO.CMnt,{}", mount.as_x2()),
            Attribute::ComponentFootprint(name) => format!("TO.CFtp,{}", escape_value(name)),
            Attribute::Delete => "TD".to_string(),
            Attribute::DeleteApertureFunction => "TD.AperFunction".to_string(),
        }
    }

    pub fn to_gerber_string(&self, style: AttributeStyle) -> String {
        match style {
            AttributeStyle::Comment => format!("G04 #@! {}*\n", self.body()),
            AttributeStyle::Extended => format!("%{}*%\n", self.body()),
        }
    }

    pub fn to_excellon_string(&self) -> String {
        format!("; #@! {}\n", self.body())
    }
}

/// Project information written into every generated file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub project_name: String,
    pub project_uuid: Uuid,
    pub revision: String,
    pub creation_date: DateTime<FixedOffset>,
}

impl FileMetadata {
    /// Metadata stamped with the current local time.
    pub fn new(project_name: impl Into<String>, project_uuid: Uuid, revision: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            project_uuid,
            revision: revision.into(),
            creation_date: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn with_creation_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.creation_date = date;
        self
    }

    /// `TF` attributes opening a fabrication file.
    pub fn header_attributes(&self, function: Option<FileFunction>) -> Vec<Attribute> {
        let mut attributes = vec![
            Attribute::generation_software(),
            Attribute::CreationDate(self.creation_date),
            Attribute::ProjectId {
                name: self.project_name.clone(),
                uuid: self.project_uuid,
                revision: self.revision.clone(),
            },
            Attribute::PartSingle,
            Attribute::SameCoordinates,
        ];
        if let Some(function) = function {
            attributes.push(Attribute::FileFunction(function));
        }
        // solder mask images show the openings, not the mask
        let polarity = match function {
            Some(FileFunction::SolderMask { .. }) => Polarity::Negative,
            _ => Polarity::Positive,
        };
        attributes.push(Attribute::FilePolarity(polarity));
        attributes
    }
}

/// Escape characters that are reserved in Gerber attribute values.
///
/// `%`, `*`, `,` and `\` as well as non-printable or non-ASCII characters
/// are written as `\uXXXX`; line breaks are dropped.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' | '\r' => {}
            '%' | '*' | ',' | '\\' => out.push_str(&format!("\\u{:04X}", c as u32)),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }
    out
}
