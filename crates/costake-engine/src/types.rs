//! Persisted reward accounting records

use crate::error::{CostakingError, Result};
use costake_core::{mul_div_floor, to_u128, Coins, Dec, ValAddress, U256};
use serde::{Deserialize, Serialize};

/// Fixed scaling applied to stored reward amounts (`10^20`)
pub const DECIMAL_REWARDS: U256 = U256::new(100_000_000_000_000_000_000);

/// Open accumulation period
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRewards {
    /// Rewards accumulated this period, scaled by `DECIMAL_REWARDS`
    pub rewards: Coins,
    /// Period number, at least one
    pub period: u64,
    /// Sum of every co-staker's score
    pub total_score: u128,
}

impl CurrentRewards {
    pub fn new(rewards: Coins, period: u64, total_score: u128) -> Self {
        Self {
            rewards,
            period,
            total_score,
        }
    }

    /// Add unscaled rewards
    pub fn add_rewards(&mut self, rewards: &Coins) -> Result<()> {
        let scaled = rewards.checked_mul_int(DECIMAL_REWARDS)?;
        self.rewards = self.rewards.checked_add(&scaled)?;
        Ok(())
    }

    /// Apply a signed change to the total score
    pub fn add_total_score(&mut self, delta: i128) -> Result<()> {
        self.total_score = apply_signed(self.total_score, delta).ok_or_else(|| {
            CostakingError::Invariant(format!(
                "total score {} cannot take delta {}",
                self.total_score, delta
            ))
        })?;
        Ok(())
    }

    /// Accumulated rewards with the scaling removed
    pub fn unscaled_rewards(&self) -> Result<Coins> {
        Ok(self.rewards.quo_int_floor(DECIMAL_REWARDS)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(CostakingError::InvalidGenesis(
                "current rewards period must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sealed period: cumulative rewards per unit of score, scaled
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRewards {
    pub cumulative_rewards_per_score: Coins,
}

impl HistoricalRewards {
    pub fn new(cumulative_rewards_per_score: Coins) -> Self {
        Self {
            cumulative_rewards_per_score,
        }
    }
}

/// Per-co-staker accounting record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostakerRewardsTracker {
    /// Last sealed period the co-staker has been paid up to
    pub start_period_cumulative_reward: u64,
    /// Satoshis staked to active finality providers
    pub active_satoshis: u128,
    /// BABY delegated to active validators
    pub active_baby: u128,
    /// `min(active_satoshis, active_baby / ratio)`
    pub total_score: u128,
}

impl CostakerRewardsTracker {
    pub fn new(
        start_period_cumulative_reward: u64,
        active_satoshis: u128,
        active_baby: u128,
        total_score: u128,
    ) -> Self {
        Self {
            start_period_cumulative_reward,
            active_satoshis,
            active_baby,
            total_score,
        }
    }

    /// Apply a stake change; fails if either amount would go negative
    pub fn apply_delta(&mut self, delta: &TrackerDelta, address: &str) -> Result<()> {
        self.active_satoshis = apply_signed(self.active_satoshis, delta.sats).ok_or_else(|| {
            CostakingError::NegativeAmount {
                field: "active satoshis",
                address: address.to_string(),
            }
        })?;
        self.active_baby = apply_signed(self.active_baby, delta.baby).ok_or_else(|| {
            CostakingError::NegativeAmount {
                field: "active baby",
                address: address.to_string(),
            }
        })?;
        Ok(())
    }
}

/// Signed change to a tracker's active amounts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerDelta {
    pub sats: i128,
    pub baby: i128,
}

impl TrackerDelta {
    pub fn new(sats: i128, baby: i128) -> Self {
        Self { sats, baby }
    }

    pub fn sats(sats: i128) -> Self {
        Self { sats, baby: 0 }
    }

    pub fn baby(baby: i128) -> Self {
        Self { sats: 0, baby }
    }

    pub fn is_zero(&self) -> bool {
        self.sats == 0 && self.baby == 0
    }
}

/// Active validator captured at epoch end
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSetEntry {
    pub validator: ValAddress,
    /// Validator tokens when the snapshot was taken
    pub original_tokens: u128,
    /// Validator delegator shares when the snapshot was taken
    pub original_shares: Dec,
}

impl ValidatorSetEntry {
    pub fn new(validator: ValAddress, original_tokens: u128, original_shares: Dec) -> Self {
        Self {
            validator,
            original_tokens,
            original_shares,
        }
    }

    /// Tokens backing `shares` at the snapshot ratio, floored
    pub fn tokens_for(&self, shares: Dec) -> Result<u128> {
        if self.original_shares.is_zero() {
            return Ok(0);
        }
        mul_div_floor(shares.raw(), U256::new(self.original_tokens), self.original_shares.raw())
            .and_then(to_u128)
            .ok_or_else(|| CostakingError::Overflow("snapshot share valuation".to_string()))
    }
}

/// Active validator set, ordered by operator address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub validators: Vec<ValidatorSetEntry>,
}

impl ValidatorSet {
    /// Build a set, sorting entries by address
    pub fn new(mut validators: Vec<ValidatorSetEntry>) -> Self {
        validators.sort_by(|a, b| a.validator.cmp(&b.validator));
        Self { validators }
    }

    pub fn get(&self, validator: &ValAddress) -> Option<&ValidatorSetEntry> {
        self.validators
            .binary_search_by(|e| e.validator.cmp(validator))
            .ok()
            .map(|idx| &self.validators[idx])
    }

    pub fn contains(&self, validator: &ValAddress) -> bool {
        self.get(validator).is_some()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorSetEntry> {
        self.validators.iter()
    }
}

/// `value + delta`, or `None` if the result leaves `u128`
pub fn apply_signed(value: u128, delta: i128) -> Option<u128> {
    if delta >= 0 {
        value.checked_add(delta.unsigned_abs())
    } else {
        value.checked_sub(delta.unsigned_abs())
    }
}

/// `new - old` as a signed amount
pub fn signed_diff(new: u128, old: u128) -> Result<i128> {
    let overflow = || CostakingError::Overflow(format!("difference of {} and {}", new, old));
    if new >= old {
        i128::try_from(new - old).map_err(|_| overflow())
    } else {
        i128::try_from(old - new).map(|d| -d).map_err(|_| overflow())
    }
}

/// Convert an unsigned stake amount into a delta
pub fn to_delta(amount: u128) -> Result<i128> {
    i128::try_from(amount)
        .map_err(|_| CostakingError::Overflow(format!("amount {} exceeds delta range", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(b: u8) -> ValAddress {
        ValAddress::new(vec![b; 20]).unwrap()
    }

    #[test]
    fn test_add_rewards_scales() {
        let mut current = CurrentRewards::new(Coins::new(), 1, 0);
        current.add_rewards(&Coins::one("ubbn", 3).unwrap()).unwrap();
        assert_eq!(current.rewards.amount_of("ubbn"), U256::new(3) * DECIMAL_REWARDS);
        assert_eq!(current.unscaled_rewards().unwrap().amount_of("ubbn"), U256::new(3));
    }

    #[test]
    fn test_add_rewards_beyond_u128() {
        // 4 * 10^18 base units, scaled by 10^20, needs more than 128 bits
        let mut current = CurrentRewards::new(Coins::new(), 1, 0);
        let amount = U256::new(4_000_000_000_000_000_000);
        let rewards = Coins::single("ubbn", amount).unwrap();
        current.add_rewards(&rewards).unwrap();
        current.add_rewards(&rewards).unwrap();
        assert_eq!(current.rewards.amount_of("ubbn"), amount * U256::new(2) * DECIMAL_REWARDS);
        assert_eq!(current.unscaled_rewards().unwrap().amount_of("ubbn"), amount * U256::new(2));
    }

    #[test]
    fn test_total_score_underflow_is_invariant() {
        let mut current = CurrentRewards::new(Coins::new(), 1, 10);
        current.add_total_score(-4).unwrap();
        assert_eq!(current.total_score, 6);
        let err = current.add_total_score(-7).unwrap_err();
        assert!(matches!(err, CostakingError::Invariant(_)));
    }

    #[test]
    fn test_tracker_delta_rejects_negative() {
        let mut tracker = CostakerRewardsTracker::new(1, 100, 0, 0);
        tracker.apply_delta(&TrackerDelta::new(-100, 50), "a").unwrap();
        assert_eq!((tracker.active_satoshis, tracker.active_baby), (0, 50));

        let err = tracker.apply_delta(&TrackerDelta::baby(-51), "a").unwrap_err();
        assert!(matches!(err, CostakingError::NegativeAmount { field: "active baby", .. }));
    }

    #[test]
    fn test_snapshot_valuation() {
        let entry = ValidatorSetEntry::new(val(1), 900, Dec::from_int(1000));
        assert_eq!(entry.tokens_for(Dec::from_int(1000)).unwrap(), 900);
        assert_eq!(entry.tokens_for(Dec::from_int(1)).unwrap(), 0);

        // share counts past 128 raw bits still value correctly
        let large = ValidatorSetEntry::new(val(1), 10u128.pow(24), Dec::from_int(10u128.pow(24)));
        assert_eq!(large.tokens_for(Dec::from_int(10u128.pow(23))).unwrap(), 10u128.pow(23));

        let empty = ValidatorSetEntry::new(val(1), 0, Dec::zero());
        assert_eq!(empty.tokens_for(Dec::one()).unwrap(), 0);
    }

    #[test]
    fn test_validator_set_lookup() {
        let set = ValidatorSet::new(vec![
            ValidatorSetEntry::new(val(3), 1, Dec::one()),
            ValidatorSetEntry::new(val(1), 1, Dec::one()),
        ]);
        assert_eq!(set.validators[0].validator, val(1));
        assert!(set.contains(&val(3)));
        assert!(!set.contains(&val(2)));
    }

    #[test]
    fn test_signed_helpers() {
        assert_eq!(signed_diff(5, 8).unwrap(), -3);
        assert_eq!(signed_diff(8, 5).unwrap(), 3);
        assert!(signed_diff(u128::MAX, 0).is_err());
        assert_eq!(apply_signed(5, -5), Some(0));
        assert_eq!(apply_signed(5, -6), None);
    }
}
