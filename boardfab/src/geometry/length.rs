//! Integer nanometer lengths.
//!
//! All board coordinates are stored as whole nanometers so that the
//! fabrication writers can render them without rounding drift.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::GeometryError;

const NM_PER_MM: i64 = 1_000_000;

/// A signed length in nanometers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Length(i64);

impl Length {
    pub const fn new(nm: i64) -> Self {
        Self(nm)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Convert millimeters to the nearest nanometer.
    pub fn from_mm(mm: f64) -> Self {
        Self((mm * NM_PER_MM as f64).round() as i64)
    }

    pub const fn to_nm(self) -> i64 {
        self.0
    }

    pub fn to_mm(self) -> f64 {
        self.0 as f64 / NM_PER_MM as f64
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    /// Render as millimeters with six fractional digits, stripping up to
    /// five trailing zeros (`0.5`, `1.0`, `0.000111`).
    ///
    /// The conversion is done on the integer value, so every nanometer
    /// survives the round trip and the output never depends on the locale.
    pub fn to_mm_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let nm_per_mm = NM_PER_MM as u64;
        let mut s = format!("{}{}.{:06}", sign, abs / nm_per_mm, abs % nm_per_mm);
        for _ in 0..5 {
            if s.ends_with('0') {
                s.pop();
            }
        }
        s
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.to_mm_string())
    }
}

impl Add for Length {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Length {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Length {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Length {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<i64> for Length {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for Length {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

/// A length that is `>= 0`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Length", into = "Length")]
pub struct UnsignedLength(Length);

impl UnsignedLength {
    pub fn new(length: Length) -> Result<Self, GeometryError> {
        if length.to_nm() < 0 {
            return Err(GeometryError::NegativeLength(length.to_nm()));
        }
        Ok(Self(length))
    }

    pub const fn zero() -> Self {
        Self(Length::zero())
    }

    pub fn from_mm(mm: f64) -> Result<Self, GeometryError> {
        Self::new(Length::from_mm(mm))
    }

    pub const fn get(self) -> Length {
        self.0
    }
}

impl TryFrom<Length> for UnsignedLength {
    type Error = GeometryError;
    fn try_from(length: Length) -> Result<Self, Self::Error> {
        Self::new(length)
    }
}

impl From<UnsignedLength> for Length {
    fn from(length: UnsignedLength) -> Self {
        length.0
    }
}

impl fmt::Display for UnsignedLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A length that is `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Length", into = "Length")]
pub struct PositiveLength(Length);

impl PositiveLength {
    pub fn new(length: Length) -> Result<Self, GeometryError> {
        if length.to_nm() <= 0 {
            return Err(GeometryError::NonPositiveLength(length.to_nm()));
        }
        Ok(Self(length))
    }

    /// Constructor for constants; fails const evaluation if `nm <= 0`.
    pub const fn new_const(nm: i64) -> Self {
        assert!(nm > 0, "length must be positive");
        Self(Length::new(nm))
    }

    pub fn from_mm(mm: f64) -> Result<Self, GeometryError> {
        Self::new(Length::from_mm(mm))
    }

    pub const fn get(self) -> Length {
        self.0
    }

    pub fn to_unsigned(self) -> UnsignedLength {
        UnsignedLength(self.0)
    }
}

impl TryFrom<Length> for PositiveLength {
    type Error = GeometryError;
    fn try_from(length: Length) -> Result<Self, Self::Error> {
        Self::new(length)
    }
}

impl From<PositiveLength> for Length {
    fn from(length: PositiveLength) -> Self {
        length.0
    }
}

impl From<PositiveLength> for UnsignedLength {
    fn from(length: PositiveLength) -> Self {
        length.to_unsigned()
    }
}

impl fmt::Display for PositiveLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_string_strips_trailing_zeros() {
        assert_eq!(Length::new(500_000).to_mm_string(), "0.5");
        assert_eq!(Length::new(1_000_000).to_mm_string(), "1.0");
        assert_eq!(Length::new(0).to_mm_string(), "0.0");
        assert_eq!(Length::new(111).to_mm_string(), "0.000111");
        assert_eq!(Length::new(-1_234_500).to_mm_string(), "-1.2345");
        assert_eq!(Length::new(-1).to_mm_string(), "-0.000001");
    }

    #[test]
    fn test_mm_string_is_exact_for_large_values() {
        let length = Length::new(987_654_321_123);
        assert_eq!(length.to_mm_string(), "987654.321123");
    }

    #[test]
    fn test_from_mm_rounds_to_nearest_nm() {
        assert_eq!(Length::from_mm(0.1), Length::new(100_000));
        assert_eq!(Length::from_mm(-2.54), Length::new(-2_540_000));
        assert_eq!(Length::from_mm(0.0000004), Length::zero());
    }

    #[test]
    fn test_constrained_lengths() {
        assert!(PositiveLength::new(Length::zero()).is_err());
        assert!(PositiveLength::new(Length::new(1)).is_ok());
        assert!(UnsignedLength::new(Length::zero()).is_ok());
        assert!(UnsignedLength::new(Length::new(-1)).is_err());
    }

    #[test]
    fn test_constrained_length_deserialization() {
        let ok: PositiveLength = serde_json::from_str("250000").unwrap();
        assert_eq!(ok.get(), Length::new(250_000));
        assert!(serde_json::from_str::<PositiveLength>("0").is_err());
        assert!(serde_json::from_str::<UnsignedLength>("-5").is_err());
    }
}
