// crates/lattice-core/src/trust.rs
//
// Fixed-point trust arithmetic for the Lattice reputation subsystem.
//
// Every node runs the same EigenTrust arithmetic on its own hardware, so
// trust values are integers on a fixed decimal scale rather than floats.
// Two nodes multiplying the same inputs always round to the same result.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::LatticeError;
use crate::peer::PeerId;

/// Number of fixed-point units in `TRUST_ONE` (nine decimal places).
pub const TRUST_SCALE: u64 = 1_000_000_000;

const HALF_SCALE: u128 = (TRUST_SCALE / 2) as u128;

/// A trust value in the closed interval [0, 1].
///
/// Arithmetic saturates at the interval bounds. Division by zero yields
/// `TRUST_ZERO`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct TrustValue(u64);

/// No trust.
pub const TRUST_ZERO: TrustValue = TrustValue(0);

/// Full trust.
pub const TRUST_ONE: TrustValue = TrustValue(TRUST_SCALE);

impl TrustValue {
    /// Build a value from raw fixed-point units. Returns `None` above `TRUST_SCALE`.
    pub const fn from_units(units: u64) -> Option<Self> {
        if units > TRUST_SCALE {
            None
        } else {
            Some(TrustValue(units))
        }
    }

    /// Raw fixed-point units.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Convert from a float, rounding to the nearest unit and clamping into [0, 1].
    ///
    /// NaN maps to `TRUST_ZERO`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return TRUST_ZERO;
        }
        if value >= 1.0 {
            return TRUST_ONE;
        }
        TrustValue((value * TRUST_SCALE as f64).round() as u64)
    }

    /// Float representation of this value.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / TRUST_SCALE as f64
    }

    /// Divide by an integer count, e.g. the number of nodes in the network map.
    ///
    /// A zero count yields `TRUST_ZERO`.
    pub fn div_count(self, count: u64) -> Self {
        if count == 0 {
            return TRUST_ZERO;
        }
        TrustValue((self.0 + count / 2) / count)
    }

    /// Absolute difference between two values.
    pub fn abs_diff(self, other: Self) -> Self {
        TrustValue(self.0.abs_diff(other.0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for TrustValue {
    type Output = TrustValue;

    fn add(self, rhs: TrustValue) -> TrustValue {
        TrustValue(self.0.saturating_add(rhs.0).min(TRUST_SCALE))
    }
}

impl Sub for TrustValue {
    type Output = TrustValue;

    fn sub(self, rhs: TrustValue) -> TrustValue {
        TrustValue(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for TrustValue {
    type Output = TrustValue;

    fn mul(self, rhs: TrustValue) -> TrustValue {
        // Both operands are <= TRUST_SCALE, so the product never exceeds it.
        let product = (self.0 as u128 * rhs.0 as u128 + HALF_SCALE) / TRUST_SCALE as u128;
        TrustValue(product as u64)
    }
}

impl Div for TrustValue {
    type Output = TrustValue;

    fn div(self, rhs: TrustValue) -> TrustValue {
        if rhs.0 == 0 {
            return TRUST_ZERO;
        }
        let divisor = rhs.0 as u128;
        let quotient = (self.0 as u128 * TRUST_SCALE as u128 + divisor / 2) / divisor;
        TrustValue(quotient.min(TRUST_SCALE as u128) as u64)
    }
}

impl Sum for TrustValue {
    fn sum<I: Iterator<Item = TrustValue>>(iter: I) -> TrustValue {
        iter.fold(TRUST_ZERO, |acc, v| acc + v)
    }
}

impl TryFrom<u64> for TrustValue {
    type Error = LatticeError;

    fn try_from(units: u64) -> Result<Self, Self::Error> {
        TrustValue::from_units(units).ok_or_else(|| {
            LatticeError::Computation(format!(
                "trust value {} exceeds scale {}",
                units, TRUST_SCALE
            ))
        })
    }
}

impl From<TrustValue> for u64 {
    fn from(value: TrustValue) -> u64 {
        value.0
    }
}

impl fmt::Display for TrustValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / TRUST_SCALE, self.0 % TRUST_SCALE)
    }
}

/// One node's normalized opinion about another.
///
/// For a fixed truster, the values over all its trustees sum to `TRUST_ONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTrust {
    truster: PeerId,
    trustee: PeerId,
    value: TrustValue,
}

impl LocalTrust {
    pub fn new(truster: PeerId, trustee: PeerId, value: TrustValue) -> Self {
        Self {
            truster,
            trustee,
            value,
        }
    }

    /// The reporting node.
    pub fn truster(&self) -> &PeerId {
        &self.truster
    }

    /// The node being reported on.
    pub fn trustee(&self) -> &PeerId {
        &self.trustee
    }

    pub fn value(&self) -> TrustValue {
        self.value
    }
}
