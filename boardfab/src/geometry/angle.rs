use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

const MICRODEG_PER_DEG: i64 = 1_000_000;
const FULL_TURN: i64 = 360 * MICRODEG_PER_DEG;

/// An angle in micro-degrees. Positive values are counter-clockwise.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Angle(i64);

impl Angle {
    pub const fn new(microdeg: i64) -> Self {
        Self(microdeg)
    }

    pub const fn deg0() -> Self {
        Self(0)
    }

    pub const fn deg45() -> Self {
        Self(45 * MICRODEG_PER_DEG)
    }

    pub const fn deg90() -> Self {
        Self(90 * MICRODEG_PER_DEG)
    }

    pub const fn deg180() -> Self {
        Self(180 * MICRODEG_PER_DEG)
    }

    pub const fn deg270() -> Self {
        Self(270 * MICRODEG_PER_DEG)
    }

    pub fn from_deg(deg: f64) -> Self {
        Self((deg * MICRODEG_PER_DEG as f64).round() as i64)
    }

    pub fn from_rad(rad: f64) -> Self {
        Self::from_deg(rad.to_degrees())
    }

    pub const fn to_microdeg(self) -> i64 {
        self.0
    }

    pub fn to_deg(self) -> f64 {
        self.0 as f64 / MICRODEG_PER_DEG as f64
    }

    pub fn to_rad(self) -> f64 {
        self.to_deg().to_radians()
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Map into `[0°, 360°)`.
    pub const fn mapped_to_0_360(self) -> Self {
        Self(self.0.rem_euclid(FULL_TURN))
    }

    /// Map into `[0°, period)`. Used to fold symmetric shapes onto one
    /// canonical orientation.
    pub const fn mapped_to_period(self, period: Angle) -> Self {
        Self(self.0.rem_euclid(period.0))
    }

    pub const fn is_multiple_of(self, other: Angle) -> bool {
        other.0 != 0 && self.0 % other.0 == 0
    }

    /// Render in degrees with up to six fractional digits (`90.0`, `12.5`).
    pub fn to_deg_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_deg = MICRODEG_PER_DEG as u64;
        let mut s = format!("{}{}.{:06}", sign, abs / per_deg, abs % per_deg);
        for _ in 0..5 {
            if s.ends_with('0') {
                s.pop();
            }
        }
        s
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.to_deg_string())
    }
}

impl Add for Angle {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping() {
        assert_eq!(Angle::from_deg(-90.0).mapped_to_0_360(), Angle::deg270());
        assert_eq!(Angle::from_deg(450.0).mapped_to_0_360(), Angle::deg90());
        assert_eq!(
            Angle::from_deg(210.0).mapped_to_period(Angle::deg180()),
            Angle::from_deg(30.0)
        );
        assert_eq!(
            Angle::from_deg(-30.0).mapped_to_period(Angle::deg180()),
            Angle::from_deg(150.0)
        );
    }

    #[test]
    fn test_multiples() {
        assert!(Angle::deg270().is_multiple_of(Angle::deg90()));
        assert!(Angle::from_deg(-180.0).is_multiple_of(Angle::deg90()));
        assert!(!Angle::from_deg(45.5).is_multiple_of(Angle::deg90()));
    }

    #[test]
    fn test_deg_string() {
        assert_eq!(Angle::deg90().to_deg_string(), "90.0");
        assert_eq!(Angle::from_deg(-12.5).to_deg_string(), "-12.5");
    }
}
