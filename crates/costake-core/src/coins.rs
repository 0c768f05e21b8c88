//! Coin sets
//!
//! `Coins` holds integer amounts keyed by denom, `DecCoins` holds fixed-point
//! amounts. Both keep denoms sorted and never store a zero amount, so two sets
//! with equal balances compare equal.

use crate::dec::Dec;
use crate::error::{CoreError, Result};
use crate::uint::{parse_uint, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Check a denom against `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> Result<()> {
    let bytes = denom.as_bytes();
    let valid = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidDenom(denom.to_string()))
    }
}

/// Single integer coin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "crate::uint::decimal")]
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Set of integer coins with unique denoms
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coin>", into = "Vec<Coin>")]
pub struct Coins(BTreeMap<String, U256>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from coins, rejecting invalid or duplicate denoms. Zero amounts
    /// are dropped.
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if map.contains_key(&coin.denom) {
                return Err(CoreError::InvalidCoins(format!("duplicate denom {}", coin.denom)));
            }
            map.insert(coin.denom, coin.amount);
        }
        map.retain(|_, amount| *amount != U256::ZERO);
        Ok(Self(map))
    }

    /// Single-denom set
    pub fn one(denom: &str, amount: u128) -> Result<Self> {
        Self::single(denom, U256::new(amount))
    }

    /// Single-denom set with a 256-bit amount
    pub fn single(denom: &str, amount: U256) -> Result<Self> {
        Self::from_coins([Coin::new(denom, amount)])
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> U256 {
        self.0.get(denom).copied().unwrap_or(U256::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, U256)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let entry = out.entry(denom.clone()).or_insert(U256::ZERO);
            *entry = entry
                .checked_add(*amount)
                .ok_or(CoreError::Overflow("Coins::checked_add"))?;
        }
        Ok(Self(out))
    }

    /// Per-denom subtraction; fails if any denom would go negative
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let have = out.get(denom).copied().unwrap_or(U256::ZERO);
            let left = have
                .checked_sub(*amount)
                .ok_or_else(|| CoreError::NegativeAmount {
                    denom: denom.clone(),
                })?;
            if left == U256::ZERO {
                out.remove(denom);
            } else {
                out.insert(denom.clone(), left);
            }
        }
        Ok(Self(out))
    }

    /// Multiply every amount by `factor`, failing on overflow
    pub fn checked_mul_int(&self, factor: U256) -> Result<Coins> {
        let mut out = BTreeMap::new();
        for (denom, amount) in &self.0 {
            let product = amount
                .checked_mul(factor)
                .ok_or(CoreError::Overflow("Coins::checked_mul_int"))?;
            if product != U256::ZERO {
                out.insert(denom.clone(), product);
            }
        }
        Ok(Self(out))
    }

    /// Divide every amount by `divisor`, truncating; zeroed denoms disappear
    pub fn quo_int_floor(&self, divisor: U256) -> Result<Coins> {
        if divisor == U256::ZERO {
            return Err(CoreError::DivisionByZero);
        }
        Ok(Self(
            self.0
                .iter()
                .map(|(d, a)| (d.clone(), *a / divisor))
                .filter(|(_, a)| *a != U256::ZERO)
                .collect(),
        ))
    }

    /// `floor(amount * fraction)` per denom
    pub fn mul_dec_floor(&self, fraction: Dec) -> Result<Coins> {
        let mut out = BTreeMap::new();
        for (denom, amount) in &self.0 {
            let product = fraction.mul_int_floor(*amount)?;
            if product != U256::ZERO {
                out.insert(denom.clone(), product);
            }
        }
        Ok(Self(out))
    }

    /// True when every denom of `other` is covered by `self`
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|(denom, amount)| self.amount_of(denom) >= amount)
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = CoreError;

    fn try_from(coins: Vec<Coin>) -> Result<Self> {
        Self::from_coins(coins)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.0.into_iter().map(|(denom, amount)| Coin { denom, amount }).collect()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(d, a)| format!("{}{}", a, d)).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coins[{}]", self)
    }
}

impl FromStr for Coins {
    type Err = CoreError;

    /// Parses `"100ubbn,5uatom"`; the empty string is the empty set
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::new());
        }
        let mut coins = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| CoreError::InvalidCoins(part.to_string()))?;
            let (amount, denom) = part.split_at(split);
            let amount = parse_uint(amount).map_err(|_| CoreError::InvalidCoins(part.to_string()))?;
            coins.push(Coin::new(denom, amount));
        }
        Self::from_coins(coins)
    }
}

/// Single fixed-point coin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

/// Set of fixed-point coins with unique denoms
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecCoin>", into = "Vec<DecCoin>")]
pub struct DecCoins(BTreeMap<String, Dec>);

impl DecCoins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lossless conversion of integer coins
    pub fn from_coins(coins: &Coins) -> Result<Self> {
        let mut out = BTreeMap::new();
        for (denom, amount) in coins.iter() {
            out.insert(denom.to_string(), Dec::from_uint(amount)?);
        }
        Ok(Self(out))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0.get(denom).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Dec)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn checked_add(&self, other: &DecCoins) -> Result<DecCoins> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let entry = out.entry(denom.clone()).or_default();
            *entry = entry
                .checked_add(*amount)
                .ok_or(CoreError::Overflow("DecCoins::checked_add"))?;
        }
        Ok(Self(out))
    }

    /// Multiply every amount by `fraction`, truncating
    pub fn mul_dec_truncate(&self, fraction: Dec) -> Result<DecCoins> {
        let mut out = BTreeMap::new();
        for (denom, amount) in &self.0 {
            let product = amount
                .checked_mul(fraction)
                .ok_or(CoreError::Overflow("DecCoins::mul_dec_truncate"))?;
            if !product.is_zero() {
                out.insert(denom.clone(), product);
            }
        }
        Ok(Self(out))
    }

    /// Integer parts, dropping the fractional change
    pub fn truncate(&self) -> Coins {
        Coins(
            self.0
                .iter()
                .map(|(d, a)| (d.clone(), a.truncate()))
                .filter(|(_, a)| *a != U256::ZERO)
                .collect(),
        )
    }
}

impl TryFrom<Vec<DecCoin>> for DecCoins {
    type Error = CoreError;

    fn try_from(coins: Vec<DecCoin>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if map.insert(coin.denom.clone(), coin.amount).is_some() {
                return Err(CoreError::InvalidCoins(format!("duplicate denom {}", coin.denom)));
            }
        }
        map.retain(|_, amount: &mut Dec| !amount.is_zero());
        Ok(Self(map))
    }
}

impl From<DecCoins> for Vec<DecCoin> {
    fn from(coins: DecCoins) -> Self {
        coins.0.into_iter().map(|(denom, amount)| DecCoin { denom, amount }).collect()
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(d, a)| format!("{}{}", a, d)).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl fmt::Debug for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecCoins[{}]", self)
    }
}
