//! Gerber output
//!
//! [`ApertureList`] canonicalizes aperture requests, [`GerberGenerator`]
//! writes complete layer files on top of it and [`attribute`] renders the
//! X2/X3 attributes shared with the Excellon writer.

pub mod aperture_list;
pub mod attribute;
pub mod generator;

pub use aperture_list::ApertureList;
pub use attribute::{
    ApertureFunction, Attribute, AttributeStyle, CopperSide, FileFunction, FileMetadata,
    MountType, Plating,
};
pub use generator::{ComponentFlash, GerberGenerator, LayerPolarity, ObjectAttributes};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GerberError {
    #[error("Failed to write gerber file: {0}")]
    Io(#[from] std::io::Error),
}
