//! Fixed-point money type.
//!
//! All monetary amounts in this system use a 1e-6 (micros) fixed-point
//! representation stored as `i64`. Binary floating point drifts across long
//! sequences of trade applications, and a drifted equity value directly risks
//! a wrong pass/fail verdict, so the engine never does float arithmetic.
//!
//! `Money` wraps the raw `i64` so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Money` with unrelated integers (sizes, day counters) in
//!   arithmetic.
//!
//! 1 currency unit = 1_000_000 micros.
//!
//! Floats only exist at the wire boundary: [`Money::try_from_f64`] is the
//! single float entry point and rejects non-finite values, and the serde
//! impls serialize as a JSON decimal number (the persisted representation
//! requires decimal numbers, not strings).

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::types::EngineError;

/// Micros per whole currency unit.
pub const MONEY_SCALE: i64 = 1_000_000;

/// A fixed-point monetary amount at 1e-6 scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero monetary amount.
    pub const ZERO: Money = Money(0);

    /// Construct from raw micros.
    #[inline]
    pub const fn from_micros(raw: i64) -> Self {
        Money(raw)
    }

    /// Construct from whole currency units (e.g. `from_units(10_000)` = $10k).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * MONEY_SCALE)
    }

    /// Extract the underlying raw micros.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert a float amount (wire input) into fixed-point micros.
    ///
    /// Rejects NaN and infinities with [`EngineError::InvalidPnl`] and
    /// values whose micros representation does not fit in `i64`. Rounds to
    /// the nearest micro.
    pub fn try_from_f64(value: f64) -> Result<Money, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidPnl { value });
        }
        let micros = value * MONEY_SCALE as f64;
        if micros.round().abs() >= i64::MAX as f64 {
            return Err(EngineError::InvalidPnl { value });
        }
        Ok(Money(micros.round() as i64))
    }

    /// Lossy conversion back to a float, for the wire only.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MONEY_SCALE as f64
    }

    /// Checked addition — `None` on `i64` overflow.
    #[inline]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction — `None` on `i64` overflow.
    #[inline]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `true` if this amount is strictly positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `true` if this amount is strictly negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

// ---------------------------------------------------------------------------
// Arithmetic operators (closed over Money)
// ---------------------------------------------------------------------------

impl Add for Money {
    type Output = Money;
    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;
    #[inline]
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / MONEY_SCALE;
        let frac = (self.0 % MONEY_SCALE).abs();
        // When |value| < 1 unit and negative, `units` truncates to 0 and the
        // sign is lost; emit it explicitly.
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{frac:06}")
        } else {
            write!(f, "{units}.{frac:06}")
        }
    }
}

// ---------------------------------------------------------------------------
// Serde — JSON decimal number on the wire
// ---------------------------------------------------------------------------

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::try_from_f64(value).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let a = Money::from_units(42);
        assert_eq!(a + Money::ZERO, a);
        assert_eq!(Money::ZERO + a, a);
    }

    #[test]
    fn add_and_sub_roundtrip() {
        let a = Money::from_units(100);
        let b = Money::from_units(25);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn from_units_scales_to_micros() {
        assert_eq!(Money::from_units(1).raw(), 1_000_000);
        assert_eq!(Money::from_units(-3).raw(), -3_000_000);
    }

    #[test]
    fn try_from_f64_rounds_to_nearest_micro() {
        let m = Money::try_from_f64(1.2345678).unwrap();
        assert_eq!(m.raw(), 1_234_568);
    }

    #[test]
    fn try_from_f64_rejects_nan_and_infinities() {
        assert!(Money::try_from_f64(f64::NAN).is_err());
        assert!(Money::try_from_f64(f64::INFINITY).is_err());
        assert!(Money::try_from_f64(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn try_from_f64_rejects_out_of_range() {
        assert!(Money::try_from_f64(1e300).is_err());
    }

    #[test]
    fn checked_add_detects_overflow() {
        let near_max = Money::from_micros(i64::MAX);
        assert_eq!(near_max.checked_add(Money::from_micros(1)), None);
        assert_eq!(
            Money::from_units(1).checked_add(Money::from_units(2)),
            Some(Money::from_units(3))
        );
    }

    #[test]
    fn ord_compares_by_amount() {
        assert!(Money::from_units(1) < Money::from_units(2));
        assert!(Money::from_units(-1) < Money::ZERO);
    }

    #[test]
    fn display_formats_with_six_decimal_places() {
        assert_eq!(format!("{}", Money::from_micros(1_500_000)), "1.500000");
        assert_eq!(format!("{}", Money::from_micros(-2_750_000)), "-2.750000");
        assert_eq!(format!("{}", Money::from_micros(-250_000)), "-0.250000");
    }

    #[test]
    fn serde_uses_decimal_numbers() {
        let m = Money::from_micros(10_000_500_000); // 10000.50
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "10000.5");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
