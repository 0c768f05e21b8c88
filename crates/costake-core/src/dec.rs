//! Unsigned fixed-point decimal with 18 fractional digits
//!
//! Used for fee portions, delegation shares and vote-power fractions. The raw
//! value is the decimal multiplied by `10^18`.

use crate::error::{CoreError, Result};
use crate::uint::{mul_div_floor, parse_uint, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits
pub const DEC_PRECISION: u32 = 18;

/// Raw representation of `1.0`
pub const DEC_ONE_RAW: U256 = U256::new(1_000_000_000_000_000_000);

/// Fixed-point decimal
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

impl Dec {
    pub const fn zero() -> Self {
        Self(U256::ZERO)
    }

    pub const fn one() -> Self {
        Self(DEC_ONE_RAW)
    }

    /// Wrap a raw `10^18`-scaled value
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// Decimal equal to the integer `value`
    pub fn from_int(value: u128) -> Self {
        // u128::MAX * 10^18 stays below 2^256
        Self(U256::new(value) * DEC_ONE_RAW)
    }

    /// Decimal equal to a 256-bit integer, failing past `U256::MAX / 10^18`
    pub fn from_uint(value: U256) -> Result<Self> {
        value
            .checked_mul(DEC_ONE_RAW)
            .map(Self)
            .ok_or(CoreError::Overflow("Dec::from_uint"))
    }

    /// `numerator / denominator`, truncated to 18 digits
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(CoreError::DivisionByZero);
        }
        mul_div_floor(U256::new(numerator), DEC_ONE_RAW, U256::new(denominator))
            .map(Self)
            .ok_or(CoreError::Overflow("Dec::from_ratio"))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Product of two decimals, truncated
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        mul_div_floor(self.0, other.0, DEC_ONE_RAW).map(Self)
    }

    /// `floor(amount * self)` for an integer amount
    pub fn mul_int_floor(self, amount: U256) -> Result<U256> {
        mul_div_floor(amount, self.0, DEC_ONE_RAW).ok_or(CoreError::Overflow("Dec::mul_int_floor"))
    }

    /// Integer part
    pub fn truncate(&self) -> U256 {
        self.0 / DEC_ONE_RAW
    }
}

impl Default for Dec {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = (self.0 % DEC_ONE_RAW).to_string();
        write!(
            f,
            "{}.{:0>width$}",
            self.0 / DEC_ONE_RAW,
            frac,
            width = DEC_PRECISION as usize
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidDecimal(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if frac_part.len() > DEC_PRECISION as usize || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let int_value = parse_uint(int_part).map_err(|_| invalid())?;
        let frac_value = if frac_part.is_empty() {
            U256::ZERO
        } else {
            let padded = format!("{:0<width$}", frac_part, width = DEC_PRECISION as usize);
            parse_uint(&padded).map_err(|_| invalid())?
        };

        int_value
            .checked_mul(DEC_ONE_RAW)
            .and_then(|v| v.checked_add(frac_value))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.collect_str(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let human_readable = deserializer.is_human_readable();
        let s = String::deserialize(deserializer)?;
        if human_readable {
            s.parse().map_err(de::Error::custom)
        } else {
            parse_uint(&s).map(Self).map_err(de::Error::custom)
        }
    }
}
