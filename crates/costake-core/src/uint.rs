//! 256-bit unsigned amounts
//!
//! Coin balances and scaled reward accumulators are `U256`. Reward amounts
//! are multiplied by a large power of ten before per-score division, so
//! 128 bits are not enough headroom for 18-decimal denoms.

use crate::error::{CoreError, Result};
pub use ethnum::U256;

/// Parse a base-10 amount with no sign or separators
pub fn parse_uint(s: &str) -> Result<U256> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidAmount(s.to_string()));
    }
    U256::from_str_radix(s, 10).map_err(|_| CoreError::InvalidAmount(s.to_string()))
}

/// Narrow to `u128`, `None` if the value does not fit
pub fn to_u128(value: U256) -> Option<u128> {
    let (high, low) = value.into_words();
    (high == 0).then_some(low)
}

/// `floor(a * b / d)`; `None` when `d` is zero or the product overflows
pub fn mul_div_floor(a: U256, b: U256, d: U256) -> Option<U256> {
    if d == U256::ZERO {
        return None;
    }
    a.checked_mul(b).map(|product| product / d)
}

/// Serde adapter writing amounts as base-10 strings
pub mod decimal {
    use super::{parse_uint, U256};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_uint(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint("42").unwrap(), U256::new(42));
        let big = "1000000000000000000000000000000000000000000";
        assert_eq!(parse_uint(big).unwrap().to_string(), big);
        assert!(parse_uint("").is_err());
        assert!(parse_uint("-1").is_err());
        assert!(parse_uint("+1").is_err());
        assert!(parse_uint("1e3").is_err());
    }

    #[test]
    fn test_to_u128() {
        assert_eq!(to_u128(U256::new(u128::MAX)), Some(u128::MAX));
        assert_eq!(to_u128(U256::new(u128::MAX) + U256::ONE), None);
    }

    #[test]
    fn test_mul_div_past_u128() {
        let a = U256::new(u128::MAX);
        assert_eq!(mul_div_floor(a, U256::new(4), U256::new(2)), Some(a * U256::new(2)));
        assert_eq!(mul_div_floor(a, a, U256::ZERO), None);
        assert_eq!(mul_div_floor(U256::MAX, U256::new(2), U256::ONE), None);
    }
}
