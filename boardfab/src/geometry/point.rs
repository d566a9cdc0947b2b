use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::{Angle, Length};

/// A 2D position in nanometers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Length,
    pub y: Length,
}

impl Point {
    pub const fn new(x: Length, y: Length) -> Self {
        Self { x, y }
    }

    pub const fn from_nm(x: i64, y: i64) -> Self {
        Self {
            x: Length::new(x),
            y: Length::new(y),
        }
    }

    pub fn from_mm(x: f64, y: f64) -> Self {
        Self {
            x: Length::from_mm(x),
            y: Length::from_mm(y),
        }
    }

    pub const fn origin() -> Self {
        Self::from_nm(0, 0)
    }

    /// Rotate around `center`.
    ///
    /// Quarter turns are computed exactly; other angles go through floating
    /// point and are rounded to the nearest nanometer.
    pub fn rotated(self, angle: Angle, center: Point) -> Self {
        let dx = self.x.to_nm() - center.x.to_nm();
        let dy = self.y.to_nm() - center.y.to_nm();
        let a = angle.mapped_to_0_360();
        let (rx, ry) = if a == Angle::deg0() {
            (dx, dy)
        } else if a == Angle::deg90() {
            (-dy, dx)
        } else if a == Angle::deg180() {
            (-dx, -dy)
        } else if a == Angle::deg270() {
            (dy, -dx)
        } else {
            let (sin, cos) = a.to_rad().sin_cos();
            let (dx, dy) = (dx as f64, dy as f64);
            (
                (dx * cos - dy * sin).round() as i64,
                (dx * sin + dy * cos).round() as i64,
            )
        };
        Self::from_nm(center.x.to_nm() + rx, center.y.to_nm() + ry)
    }

    /// Mirror at the vertical axis through `center` (x is negated).
    pub fn mirrored_horizontally(self, center: Length) -> Self {
        Self::new(center * 2 - self.x, self.y)
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = (self.x.to_nm() - other.x.to_nm()) as f64;
        let dy = (self.y.to_nm() - other.y.to_nm()) as f64;
        dx.hypot(dy)
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_turns_are_exact() {
        let p = Point::from_nm(1_000_001, 3);
        assert_eq!(p.rotated(Angle::deg90(), Point::origin()), Point::from_nm(-3, 1_000_001));
        assert_eq!(p.rotated(Angle::deg180(), Point::origin()), Point::from_nm(-1_000_001, -3));
        assert_eq!(p.rotated(-Angle::deg90(), Point::origin()), Point::from_nm(3, -1_000_001));
    }

    #[test]
    fn test_rotation_around_center() {
        let p = Point::from_nm(2_000_000, 1_000_000);
        let c = Point::from_nm(1_000_000, 1_000_000);
        let r = p.rotated(Angle::from_deg(45.0), c);
        assert_eq!(r, Point::from_nm(1_707_107, 1_707_107));
    }

    #[test]
    fn test_mirror() {
        let p = Point::from_nm(5, 7);
        assert_eq!(p.mirrored_horizontally(Length::zero()), Point::from_nm(-5, 7));
        assert_eq!(p.mirrored_horizontally(Length::new(10)), Point::from_nm(15, 7));
    }
}
