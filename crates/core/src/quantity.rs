//! Quantity value object.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A stock quantity expressed in the product's counting unit.
///
/// Always finite. Whether zero or negative values are allowed depends on the
/// constructor: requested move quantities are strictly positive, adjustment
/// deltas are non-zero and sign-significant.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(f64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0.0);

    /// Quantity as reported by the backend (may be zero or negative).
    pub fn from_remote(raw: f64) -> DomainResult<Self> {
        if !raw.is_finite() {
            return Err(DomainError::malformed(format!("non-finite quantity {raw}")));
        }
        Ok(Self(raw))
    }

    /// Quantity requested for a move; must be > 0.
    pub fn positive(raw: f64) -> DomainResult<Self> {
        if !raw.is_finite() || raw <= 0.0 {
            return Err(DomainError::validation(format!(
                "quantity must be a positive number, got {raw}"
            )));
        }
        Ok(Self(raw))
    }

    /// Signed adjustment delta; zero is rejected since it would change nothing.
    pub fn delta(raw: f64) -> DomainResult<Self> {
        if !raw.is_finite() {
            return Err(DomainError::validation(format!(
                "quantity must be a finite number, got {raw}"
            )));
        }
        if raw == 0.0 {
            return Err(DomainError::validation("quantity cannot be zero"));
        }
        Ok(Self(raw))
    }

    pub const fn get(self) -> f64 {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    pub fn plus(self, other: Quantity) -> Self {
        Self(self.0 + other.0)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Quantity> for serde_json::Value {
    fn from(value: Quantity) -> Self {
        serde_json::Value::from(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_negative_and_nan() {
        assert!(Quantity::positive(0.0).is_err());
        assert!(Quantity::positive(-1.5).is_err());
        assert!(Quantity::positive(f64::NAN).is_err());
        assert!(Quantity::positive(f64::INFINITY).is_err());
        assert_eq!(Quantity::positive(3.0).unwrap().get(), 3.0);
    }

    #[test]
    fn delta_keeps_sign_and_rejects_zero() {
        assert!(Quantity::delta(-4.0).unwrap().is_negative());
        assert!(!Quantity::delta(15.0).unwrap().is_negative());
        assert!(matches!(Quantity::delta(0.0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Quantity::delta(-4.0).unwrap().abs().to_string(), "4");
        assert_eq!(Quantity::delta(2.5).unwrap().to_string(), "2.5");
    }
}
