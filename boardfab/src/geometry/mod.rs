//! Geometry primitives
//!
//! Integer-nanometer lengths and points, micro-degree angles, arc-aware
//! paths and the floating point toolbox used for measurements.

pub mod angle;
pub mod length;
pub mod path;
pub mod point;
pub mod shape;
pub mod toolbox;

pub use angle::Angle;
pub use length::{Length, PositiveLength, UnsignedLength};
pub use path::{Path, Vertex};
pub use point::Point;
pub use shape::Shape;
pub use toolbox::FPoint;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("length must be positive, got {0}nm")]
    NonPositiveLength(i64),
    #[error("length must not be negative, got {0}nm")]
    NegativeLength(i64),
}

/// Placement of a child coordinate system (footprint, pad) in its parent.
///
/// Mapping mirrors first (x is negated), then rotates, then translates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Point,
    pub rotation: Angle,
    pub mirrored: bool,
}

impl Transform {
    pub const fn new(position: Point, rotation: Angle, mirrored: bool) -> Self {
        Self {
            position,
            rotation,
            mirrored,
        }
    }

    pub fn map(&self, p: Point) -> Point {
        let p = if self.mirrored {
            p.mirrored_horizontally(Length::zero())
        } else {
            p
        };
        p.rotated(self.rotation, Point::origin()) + self.position
    }

    pub fn map_angle(&self, angle: Angle) -> Angle {
        let angle = if self.mirrored { -angle } else { angle };
        angle + self.rotation
    }

    pub fn map_path(&self, path: &Path) -> Path {
        let path = if self.mirrored {
            path.mirrored_horizontally(Length::zero())
        } else {
            path.clone()
        };
        path.rotated(self.rotation, Point::origin())
            .translated(self.position)
    }

    /// Transform of a child placed at `child` inside this one.
    pub fn child(&self, position: Point, rotation: Angle) -> Transform {
        Transform::new(self.map(position), self.map_angle(rotation), self.mirrored)
    }
}
