//! Bounded confidence values.
//!
//! Every confidence in Lotsawa (entity, date, similarity) lives in [0.0, 1.0].
//! [`Confidence`] enforces that at construction and on deserialization, so a
//! record that crossed a storage boundary cannot smuggle in 1.3.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A confidence value in [0.0, 1.0].
///
/// # Examples
///
/// ```
/// use lotsawa::Confidence;
///
/// let conf = Confidence::new(0.9).unwrap();
/// assert_eq!(conf.value(), 0.9);
/// assert!(Confidence::new(1.2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Minimum valid confidence value.
    pub const MIN_VALUE: f64 = 0.0;

    /// Maximum valid confidence value.
    pub const MAX_VALUE: f64 = 1.0;

    /// Creates a new confidence with validation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfidenceOutOfRange` if the value is NaN or not in [0.0, 1.0].
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Creates a confidence, clamping out-of-range input into [0.0, 1.0].
    ///
    /// NaN becomes 0.0.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(Self::MIN_VALUE, Self::MAX_VALUE))
    }

    /// Complete uncertainty.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Complete certainty.
    #[must_use]
    pub const fn one() -> Self {
        Self(1.0)
    }

    /// The neutral midpoint.
    #[must_use]
    pub const fn neutral() -> Self {
        Self(0.5)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Blends two confidences, weighting the higher one.
    ///
    /// The result always lies within `[min(a, b), max(a, b)]`.
    #[must_use]
    pub fn blend_favoring_higher(a: Self, b: Self, higher_weight: f64) -> Self {
        let w = higher_weight.clamp(0.5, 1.0);
        let (hi, lo) = if a.0 >= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let blended = hi * w + lo * (1.0 - w);
        Self(blended.clamp(lo, hi))
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::neutral()
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_validation() {
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(1.0).is_ok());
        assert!(Confidence::new(-0.01).is_err());
        assert!(Confidence::new(1.01).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Confidence::clamped(1.7).value(), 1.0);
        assert_eq!(Confidence::clamped(-3.0).value(), 0.0);
        assert_eq!(Confidence::clamped(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_blend_stays_within_span() {
        let a = Confidence::new(0.9).unwrap();
        let b = Confidence::new(0.6).unwrap();
        let blended = Confidence::blend_favoring_higher(a, b, 0.7);
        assert!((blended.value() - 0.81).abs() < 1e-9);
        assert_eq!(
            Confidence::blend_favoring_higher(a, b, 0.7),
            Confidence::blend_favoring_higher(b, a, 0.7)
        );
        assert!(blended.value() >= 0.6 && blended.value() <= 0.9);
    }

    #[test]
    fn test_confidence_serde_rejects_out_of_range() {
        let ok: Confidence = serde_json::from_str("0.75").unwrap();
        assert_eq!(ok.value(), 0.75);
        let bad: Result<Confidence, _> = serde_json::from_str("1.5");
        assert!(bad.is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "0.75");
    }
}
