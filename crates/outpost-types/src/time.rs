//! Simulated-time scalar for the colony world clock.
//!
//! [`SimTime`] measures millisols: one sol (a local day) is 1000 millisols
//! and maps to 88 775.244 earth-seconds. The scalar is backed by
//! [`Decimal`] so that splitting a pulse across task phases and summing the
//! parts reconstructs the original value exactly -- time accounting never
//! accumulates rounding drift.
//!
//! # Design Principles
//!
//! - Values are never negative; constructors and subtraction enforce this.
//! - All arithmetic is checked. Overflow or underflow yields `None`, never
//!   a wrapped or silently clamped value.
//! - Wall-clock quantities (earth seconds, [`chrono::Duration`]) are
//!   derived on demand -- the millisol count is the source of truth.

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Earth seconds in one millisol (one sol is 88 775.244 s).
fn seconds_per_millisol() -> Decimal {
    Decimal::new(88_775_244, 6)
}

/// Millisols in one sol.
fn millisols_per_sol() -> Decimal {
    Decimal::new(1000, 0)
}

/// An exact, non-negative quantity of simulated time in millisols.
///
/// `SimTime` is used both for instants (time since simulation start) and
/// for spans (the Δt of a pulse, the leftover a task phase returns). It is
/// an immutable value type: every operation returns a new value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SimTime(Decimal);

impl SimTime {
    /// The zero instant / empty span.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a `SimTime` from a millisol count.
    ///
    /// Returns `None` if `millisols` is negative.
    pub fn from_millisols(millisols: Decimal) -> Option<Self> {
        if millisols.is_sign_negative() {
            return None;
        }
        Some(Self(millisols))
    }

    /// Create a `SimTime` from a whole number of millisols.
    pub fn from_whole(millisols: u64) -> Self {
        Self(Decimal::from(millisols))
    }

    /// Return the millisol count.
    pub const fn millisols(self) -> Decimal {
        self.0
    }

    /// Return the sol count (millisols / 1000).
    ///
    /// Returns `None` only if the division overflows, which cannot happen
    /// for valid values; the checked form is kept for lint uniformity.
    pub fn sols(self) -> Option<Decimal> {
        self.0.checked_div(millisols_per_sol())
    }

    /// Whether this value is exactly zero.
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition. Returns `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction. Returns `None` if the result would be negative.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let diff = self.0.checked_sub(rhs.0)?;
        if diff.is_sign_negative() {
            return None;
        }
        Some(Self(diff))
    }

    /// Saturating subtraction: floors at [`SimTime::ZERO`].
    pub fn saturating_sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }

    /// Checked multiplication by a non-negative scalar.
    ///
    /// Returns `None` if `factor` is negative or the product overflows.
    pub fn checked_scale(self, factor: Decimal) -> Option<Self> {
        if factor.is_sign_negative() {
            return None;
        }
        self.0.checked_mul(factor).map(Self)
    }

    /// The smaller of two values.
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    /// Derived wall-clock mapping: earth seconds represented by this span.
    pub fn earth_seconds(self) -> Option<Decimal> {
        self.0.checked_mul(seconds_per_millisol())
    }

    /// Derived wall-clock mapping as a [`chrono::Duration`], rounded to
    /// whole milliseconds. Returns `None` if the value does not fit.
    pub fn earth_duration(self) -> Option<Duration> {
        let millis = self
            .earth_seconds()?
            .checked_mul(Decimal::new(1000, 0))?
            .round();
        Some(Duration::milliseconds(millis.to_i64()?))
    }
}

impl core::fmt::Display for SimTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} millisols", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(SimTime::ZERO.is_zero());
        assert_eq!(SimTime::ZERO.millisols(), Decimal::ZERO);
    }

    #[test]
    fn negative_millisols_rejected() {
        assert!(SimTime::from_millisols(Decimal::new(-1, 0)).is_none());
        assert!(SimTime::from_millisols(Decimal::ZERO).is_some());
    }

    #[test]
    fn addition_is_exact() {
        // 0.1 + 0.2 == 0.3 exactly, unlike binary floats.
        let a = SimTime::from_millisols(Decimal::new(1, 1)).unwrap();
        let b = SimTime::from_millisols(Decimal::new(2, 1)).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.millisols(), Decimal::new(3, 1));
    }

    #[test]
    fn subtraction_never_goes_negative() {
        let small = SimTime::from_whole(5);
        let large = SimTime::from_whole(10);
        assert!(small.checked_sub(large).is_none());
        assert_eq!(small.saturating_sub(large), SimTime::ZERO);
        assert_eq!(large.checked_sub(small).unwrap(), SimTime::from_whole(5));
    }

    #[test]
    fn scaling_rejects_negative_factors() {
        let t = SimTime::from_whole(10);
        assert!(t.checked_scale(Decimal::new(-2, 0)).is_none());
        let doubled = t.checked_scale(Decimal::new(2, 0)).unwrap();
        assert_eq!(doubled, SimTime::from_whole(20));
    }

    #[test]
    fn sol_conversion() {
        let t = SimTime::from_whole(1500);
        assert_eq!(t.sols().unwrap(), Decimal::new(15, 1));
    }

    #[test]
    fn earth_mapping_for_one_sol() {
        let sol = SimTime::from_whole(1000);
        assert_eq!(sol.earth_seconds().unwrap(), Decimal::new(88_775_244, 3));
        let duration = sol.earth_duration().unwrap();
        assert_eq!(duration.num_milliseconds(), 88_775_244);
    }

    #[test]
    fn ordering_follows_millisols() {
        let a = SimTime::from_whole(3);
        let b = SimTime::from_whole(7);
        assert!(a < b);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime::from_millisols(Decimal::new(12_345, 2)).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
