//! boardfab - PCB fabrication output and design rule checking
//!
//! This library turns a resolved board snapshot into the files a PCB
//! manufacturer and an assembly house need, and checks the board against
//! manufacturability rules before it is sent out.
//!
//! # Quick Start
//!
//! ```no_run
//! use boardfab::{ApprovalSet, BoardFabCore, DrcOptions, FabricationSettings};
//! use std::path::Path;
//!
//! let board = BoardFabCore::load_board(Path::new("board.json")).unwrap();
//! let report = BoardFabCore::run_drc(&board, DrcOptions::default(), &ApprovalSet::new()).unwrap();
//! for message in &report.messages {
//!     println!("{}: {}", message.severity, message.message);
//! }
//!
//! let files = boardfab::export::BoardFabricationExport::new(&board, FabricationSettings::default())
//!     .export()
//!     .unwrap();
//! for file in &files {
//!     println!("{} ({} bytes)", file.name, file.content.len());
//! }
//! ```
//!
//! # Features
//!
//! - **Gerber X2/X3**: copper, solder mask, outline and component layers
//! - **Excellon**: plated and non-plated drills, routed or `G85` slots
//! - **Design rule check**: clearances, restrings, drills, slots, courtyards
//!   and connectivity, with progress events and cancellation
//! - **Pick-and-place**: placement data and CSV output

pub mod board;
pub mod core;
pub mod drc;
pub mod excellon;
pub mod export;
pub mod geometry;
pub mod gerber;
pub mod pick_place;

// Re-export main types
pub use crate::core::{BoardFabCore, BoardFabError, DrcReport, DrcStats};
pub use board::Board;
pub use drc::{
    ApprovalSet, BoardDesignRuleCheck, DrcError, DrcEvent, DrcOptions, RuleCheckMessage,
    RulesEngine, Severity,
};
pub use excellon::ExcellonGenerator;
pub use export::{BoardFabricationExport, FabricationSettings, OutputFile};
pub use gerber::{ApertureList, GerberGenerator};
pub use pick_place::{BoardPickPlaceGenerator, PickPlaceCsvWriter};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::board::{Board, BoardSide, Layer};
    pub use crate::geometry::{Angle, Length, Path, Point, PositiveLength, UnsignedLength};
    pub use crate::{
        ApprovalSet, BoardDesignRuleCheck, BoardFabCore, BoardFabError, BoardFabricationExport,
        DrcEvent, DrcOptions, DrcReport, FabricationSettings, RuleCheckMessage, Severity,
    };
}
