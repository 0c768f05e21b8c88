//! Genesis import and export

use crate::constants::FIRST_PERIOD;
use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::params::Params;
use crate::score::calculate_score;
use crate::types::{CostakerRewardsTracker, CurrentRewards, HistoricalRewards, ValidatorSet, ValidatorSetEntry};
use costake_core::{AccAddress, Coins, Dec, FpAddress, ValAddress};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Complete module state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub current_rewards: CurrentRewards,
    #[serde(default)]
    pub historical_rewards: Vec<HistoricalRewardsEntry>,
    #[serde(default)]
    pub costakers_rewards_tracker: Vec<CostakerRewardsTrackerEntry>,
    #[serde(default)]
    pub validator_set: Vec<ValidatorSetGenesisEntry>,
    #[serde(default)]
    pub post_slash_delta_shares: Vec<PostSlashDeltaSharesEntry>,
    #[serde(default)]
    pub slashed_validators: Vec<String>,
    #[serde(default)]
    pub active_finality_providers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRewardsEntry {
    pub period: u64,
    pub rewards: HistoricalRewards,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostakerRewardsTrackerEntry {
    /// Hex-encoded account address
    pub costaker_address: String,
    pub tracker: CostakerRewardsTracker,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSetGenesisEntry {
    pub validator: String,
    pub original_tokens: u128,
    pub original_shares: Dec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSlashDeltaSharesEntry {
    pub validator: String,
    pub delegator: String,
    pub shares: Dec,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

fn invalid(msg: impl Into<String>) -> CostakingError {
    CostakingError::InvalidGenesis(msg.into())
}

fn parse_acc(s: &str) -> Result<AccAddress> {
    AccAddress::from_hex(s).map_err(|e| invalid(format!("address {}: {}", s, e)))
}

fn parse_val(s: &str) -> Result<ValAddress> {
    ValAddress::from_hex(s).map_err(|e| invalid(format!("validator {}: {}", s, e)))
}

fn parse_fp(s: &str) -> Result<FpAddress> {
    FpAddress::from_hex(s).map_err(|e| invalid(format!("finality provider {}: {}", s, e)))
}

impl GenesisState {
    /// Fresh state: period 1 open, empty period 0 sealed
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            current_rewards: CurrentRewards::new(Coins::new(), FIRST_PERIOD, 0),
            historical_rewards: vec![HistoricalRewardsEntry {
                period: 0,
                rewards: HistoricalRewards::default(),
            }],
            costakers_rewards_tracker: Vec::new(),
            validator_set: Vec::new(),
            post_slash_delta_shares: Vec::new(),
            slashed_validators: Vec::new(),
            active_finality_providers: Vec::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| invalid(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.current_rewards.validate()?;
        let current_period = self.current_rewards.period;

        // Historical rewards: unique, sealed, monotonic
        let mut historical: BTreeMap<u64, &HistoricalRewards> = BTreeMap::new();
        for entry in &self.historical_rewards {
            if entry.period >= current_period {
                return Err(invalid(format!(
                    "historical period {} not below current period {}",
                    entry.period, current_period
                )));
            }
            if historical.insert(entry.period, &entry.rewards).is_some() {
                return Err(invalid(format!("duplicate historical period {}", entry.period)));
            }
        }
        let last_sealed = current_period - 1;
        if !historical.contains_key(&last_sealed) {
            return Err(invalid(format!("historical period {} missing", last_sealed)));
        }
        let mut previous: Option<&HistoricalRewards> = None;
        for (period, rewards) in &historical {
            if let Some(prev) = previous {
                if !rewards
                    .cumulative_rewards_per_score
                    .is_all_gte(&prev.cumulative_rewards_per_score)
                {
                    return Err(invalid(format!("historical rewards decrease at period {}", period)));
                }
            }
            previous = Some(rewards);
        }

        // Trackers: unique, consistent scores, known start periods
        let mut costakers = BTreeSet::new();
        let mut score_sum: u128 = 0;
        for entry in &self.costakers_rewards_tracker {
            let address = parse_acc(&entry.costaker_address)?;
            if !costakers.insert(address) {
                return Err(invalid(format!("duplicate costaker {}", entry.costaker_address)));
            }
            let tracker = &entry.tracker;
            if tracker.start_period_cumulative_reward > last_sealed {
                return Err(invalid(format!(
                    "tracker of {} starts after period {}",
                    entry.costaker_address, last_sealed
                )));
            }
            if !historical.contains_key(&tracker.start_period_cumulative_reward) {
                return Err(invalid(format!(
                    "tracker of {} starts at unknown period {}",
                    entry.costaker_address, tracker.start_period_cumulative_reward
                )));
            }
            let expected = calculate_score(
                self.params.score_ratio_btc_by_baby,
                tracker.active_baby,
                tracker.active_satoshis,
            );
            if tracker.total_score != expected {
                return Err(invalid(format!(
                    "tracker of {} has score {}, expected {}",
                    entry.costaker_address, tracker.total_score, expected
                )));
            }
            score_sum = score_sum
                .checked_add(tracker.total_score)
                .ok_or_else(|| invalid("total score overflow"))?;
        }
        if score_sum != self.current_rewards.total_score {
            return Err(invalid(format!(
                "tracker scores sum to {}, current rewards total is {}",
                score_sum, self.current_rewards.total_score
            )));
        }

        // Validator set and slash bookkeeping
        let mut validators = BTreeSet::new();
        for entry in &self.validator_set {
            if !validators.insert(parse_val(&entry.validator)?) {
                return Err(invalid(format!("duplicate validator {}", entry.validator)));
            }
        }
        let mut slashed = BTreeSet::new();
        for validator in &self.slashed_validators {
            let address = parse_val(validator)?;
            if !validators.contains(&address) {
                return Err(invalid(format!("slashed validator {} not in set", validator)));
            }
            if !slashed.insert(address) {
                return Err(invalid(format!("duplicate slashed validator {}", validator)));
            }
        }
        let mut pairs = BTreeSet::new();
        for entry in &self.post_slash_delta_shares {
            let validator = parse_val(&entry.validator)?;
            let delegator = parse_acc(&entry.delegator)?;
            if !slashed.contains(&validator) {
                return Err(invalid(format!(
                    "post-slash shares for unslashed validator {}",
                    entry.validator
                )));
            }
            if entry.shares.is_zero() {
                return Err(invalid("zero post-slash shares"));
            }
            if !pairs.insert((validator, delegator)) {
                return Err(invalid(format!(
                    "duplicate post-slash shares for {}/{}",
                    entry.validator, entry.delegator
                )));
            }
        }
        let mut fps = BTreeSet::new();
        for fp in &self.active_finality_providers {
            if !fps.insert(parse_fp(fp)?) {
                return Err(invalid(format!("duplicate finality provider {}", fp)));
            }
        }

        Ok(())
    }
}

impl Keeper {
    pub fn init_genesis(&self, ctx: &mut Context<'_>, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;

        self.set_params(ctx, &genesis.params)?;
        self.set_current_rewards(ctx, &genesis.current_rewards)?;
        for entry in &genesis.historical_rewards {
            self.set_historical_rewards(ctx, entry.period, &entry.rewards)?;
        }
        for entry in &genesis.costakers_rewards_tracker {
            let address = parse_acc(&entry.costaker_address)?;
            self.set_costaker_rewards_tracker(ctx, &address, &entry.tracker)?;
        }

        let mut entries = Vec::with_capacity(genesis.validator_set.len());
        for entry in &genesis.validator_set {
            entries.push(ValidatorSetEntry::new(
                parse_val(&entry.validator)?,
                entry.original_tokens,
                entry.original_shares,
            ));
        }
        if !entries.is_empty() {
            self.set_validator_set(ctx, &ValidatorSet::new(entries))?;
        }

        for validator in &genesis.slashed_validators {
            self.set_validator_slashed(ctx, &parse_val(validator)?)?;
        }
        for entry in &genesis.post_slash_delta_shares {
            self.set_post_slash_delta_shares(
                ctx,
                &parse_val(&entry.validator)?,
                &parse_acc(&entry.delegator)?,
                entry.shares,
            )?;
        }
        for fp in &genesis.active_finality_providers {
            self.set_finality_provider_active(ctx, &parse_fp(fp)?, true)?;
        }

        tracing::info!(
            period = genesis.current_rewards.period,
            costakers = genesis.costakers_rewards_tracker.len(),
            validators = genesis.validator_set.len(),
            "initialized co-staking genesis"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState> {
        let historical_rewards = self
            .all_historical_rewards(ctx)?
            .into_iter()
            .map(|(period, rewards)| HistoricalRewardsEntry { period, rewards })
            .collect();
        let costakers_rewards_tracker = self
            .all_costakers(ctx)?
            .into_iter()
            .map(|(address, tracker)| CostakerRewardsTrackerEntry {
                costaker_address: address.to_hex(),
                tracker,
            })
            .collect();
        let validator_set = self
            .get_validator_set(ctx)?
            .validators
            .into_iter()
            .map(|e| ValidatorSetGenesisEntry {
                validator: e.validator.to_hex(),
                original_tokens: e.original_tokens,
                original_shares: e.original_shares,
            })
            .collect();
        let post_slash_delta_shares = self
            .all_post_slash_delta_shares(ctx)?
            .into_iter()
            .map(|(validator, delegator, shares)| PostSlashDeltaSharesEntry {
                validator: validator.to_hex(),
                delegator: delegator.to_hex(),
                shares,
            })
            .collect();

        Ok(GenesisState {
            params: self.get_params(ctx)?,
            current_rewards: self.get_current_rewards(ctx)?,
            historical_rewards,
            costakers_rewards_tracker,
            validator_set,
            post_slash_delta_shares,
            slashed_validators: self
                .slashed_validators(ctx)?
                .iter()
                .map(ValAddress::to_hex)
                .collect(),
            active_finality_providers: self
                .active_finality_providers(ctx)?
                .iter()
                .map(FpAddress::to_hex)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{acc, val};

    fn tracker_entry(addr: &AccAddress, tracker: CostakerRewardsTracker) -> CostakerRewardsTrackerEntry {
        CostakerRewardsTrackerEntry {
            costaker_address: addr.to_hex(),
            tracker,
        }
    }

    fn genesis_with_tracker() -> GenesisState {
        let mut genesis = GenesisState::with_params(Params::new(Dec::zero(), Dec::zero(), 50));
        genesis.current_rewards.total_score = 1_000;
        genesis
            .costakers_rewards_tracker
            .push(tracker_entry(&acc(1), CostakerRewardsTracker::new(0, 5_000, 50_000, 1_000)));
        genesis
    }

    #[test]
    fn test_default_genesis_valid() {
        assert!(GenesisState::default().validate().is_ok());
        assert!(genesis_with_tracker().validate().is_ok());
    }

    #[test]
    fn test_duplicate_period_rejected() {
        let mut genesis = GenesisState::default();
        genesis.historical_rewards.push(genesis.historical_rewards[0].clone());
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_historical_at_current_period_rejected() {
        let mut genesis = GenesisState::default();
        genesis.historical_rewards.push(HistoricalRewardsEntry {
            period: 1,
            rewards: HistoricalRewards::default(),
        });
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_period_zero_rejected() {
        let mut genesis = GenesisState::default();
        genesis.current_rewards.period = 0;
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_score_sum_mismatch_rejected() {
        let mut genesis = genesis_with_tracker();
        genesis.current_rewards.total_score = 999;
        let err = genesis.validate().unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn test_inconsistent_tracker_score_rejected() {
        let mut genesis = genesis_with_tracker();
        genesis.costakers_rewards_tracker[0].tracker.total_score = 900;
        genesis.current_rewards.total_score = 900;
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_duplicate_and_malformed_addresses_rejected() {
        let mut genesis = genesis_with_tracker();
        genesis.costakers_rewards_tracker.push(genesis.costakers_rewards_tracker[0].clone());
        assert!(genesis.validate().is_err());

        let mut genesis = GenesisState::default();
        genesis.active_finality_providers.push("abc".to_string());
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_slashed_validator_must_be_in_set() {
        let mut genesis = GenesisState::default();
        genesis.slashed_validators.push(val(1).to_hex());
        assert!(genesis.validate().is_err());

        genesis.validator_set.push(ValidatorSetGenesisEntry {
            validator: val(1).to_hex(),
            original_tokens: 10,
            original_shares: Dec::from_int(10),
        });
        assert!(genesis.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let genesis = genesis_with_tracker();
        let json = genesis.to_json().unwrap();
        assert_eq!(GenesisState::from_json(&json).unwrap(), genesis);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "params": {"costaking_portion": "0.5", "validators_portion": "0", "score_ratio_btc_by_baby": 50},
            "current_rewards": {"rewards": [], "period": 1, "total_score": 0},
            "historical_rewards": [{"period": 0, "rewards": {"cumulative_rewards_per_score": []}}]
        }"#;
        let genesis = GenesisState::from_json(json).unwrap();
        assert!(genesis.validate().is_ok());
        assert!(genesis.validator_set.is_empty());
    }
}
