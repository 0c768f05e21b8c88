//! Typed access to persisted module state

use crate::constants::FIRST_PERIOD;
use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::keys;
use crate::params::Params;
use crate::types::{CostakerRewardsTracker, CurrentRewards, HistoricalRewards, ValidatorSet};
use costake_core::{AccAddress, Coins, Dec, FpAddress, ValAddress};
use costake_store::codec;
use serde::{de::DeserializeOwned, Serialize};

fn load<T: DeserializeOwned>(ctx: &Context<'_>, key: &[u8]) -> Result<Option<T>> {
    match ctx.store().get(key)? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

fn save<T: Serialize>(ctx: &Context<'_>, key: &[u8], value: &T) -> Result<()> {
    ctx.store().set(key, codec::encode(value)?)?;
    Ok(())
}

fn corrupt_key(key: &[u8]) -> CostakingError {
    CostakingError::Invariant(format!("malformed store key {}", hex::encode(key)))
}

impl Keeper {
    // === Params ===

    pub fn get_params(&self, ctx: &Context<'_>) -> Result<Params> {
        load(ctx, keys::PARAMS_KEY)?.ok_or_else(|| CostakingError::NotFound("params".to_string()))
    }

    /// Persist params after validating them
    pub fn set_params(&self, ctx: &Context<'_>, params: &Params) -> Result<()> {
        params.validate()?;
        save(ctx, keys::PARAMS_KEY, params)
    }

    // === Current rewards ===

    pub fn get_current_rewards(&self, ctx: &Context<'_>) -> Result<CurrentRewards> {
        self.get_current_rewards_check_found(ctx)?
            .ok_or_else(|| CostakingError::NotFound("current rewards".to_string()))
    }

    pub fn get_current_rewards_check_found(&self, ctx: &Context<'_>) -> Result<Option<CurrentRewards>> {
        load(ctx, keys::CURRENT_REWARDS_KEY_PREFIX)
    }

    pub fn set_current_rewards(&self, ctx: &Context<'_>, current: &CurrentRewards) -> Result<()> {
        save(ctx, keys::CURRENT_REWARDS_KEY_PREFIX, current)
    }

    /// Current rewards, creating period 1 with an empty period 0 if absent
    pub fn get_current_rewards_or_initialize(&self, ctx: &Context<'_>) -> Result<CurrentRewards> {
        match self.get_current_rewards_check_found(ctx)? {
            Some(current) => Ok(current),
            None => self.initialize_rewards_tracker(ctx),
        }
    }

    pub fn initialize_rewards_tracker(&self, ctx: &Context<'_>) -> Result<CurrentRewards> {
        let current = CurrentRewards::new(Coins::new(), FIRST_PERIOD, 0);
        self.set_historical_rewards(ctx, 0, &HistoricalRewards::default())?;
        self.set_current_rewards(ctx, &current)?;
        tracing::debug!("initialized co-staking rewards at period 1");
        Ok(current)
    }

    // === Historical rewards ===

    pub fn get_historical_rewards(&self, ctx: &Context<'_>, period: u64) -> Result<HistoricalRewards> {
        load(ctx, &keys::historical_rewards_key(period))?.ok_or_else(|| {
            CostakingError::NotFound(format!("historical rewards for period {}", period))
        })
    }

    pub(crate) fn set_historical_rewards(
        &self,
        ctx: &Context<'_>,
        period: u64,
        rewards: &HistoricalRewards,
    ) -> Result<()> {
        save(ctx, &keys::historical_rewards_key(period), rewards)
    }

    /// Every sealed period, ascending
    pub fn all_historical_rewards(&self, ctx: &Context<'_>) -> Result<Vec<(u64, HistoricalRewards)>> {
        ctx.store()
            .iter_prefix(keys::HISTORICAL_REWARDS_KEY_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let period = keys::period_from_historical_key(&key).ok_or_else(|| corrupt_key(&key))?;
                Ok((period, codec::decode(&value)?))
            })
            .collect()
    }

    // === Co-staker trackers ===

    pub fn get_costaker_rewards(
        &self,
        ctx: &Context<'_>,
        costaker: &AccAddress,
    ) -> Result<Option<CostakerRewardsTracker>> {
        load(ctx, &keys::costaker_rewards_tracker_key(costaker))
    }

    pub(crate) fn set_costaker_rewards_tracker(
        &self,
        ctx: &Context<'_>,
        costaker: &AccAddress,
        tracker: &CostakerRewardsTracker,
    ) -> Result<()> {
        save(ctx, &keys::costaker_rewards_tracker_key(costaker), tracker)
    }

    /// Stored tracker, or a zero tracker starting at the last sealed period.
    /// The fresh tracker is not persisted.
    pub fn get_costaker_rewards_or_initialize(
        &self,
        ctx: &Context<'_>,
        costaker: &AccAddress,
    ) -> Result<CostakerRewardsTracker> {
        if let Some(tracker) = self.get_costaker_rewards(ctx, costaker)? {
            return Ok(tracker);
        }
        let current = self.get_current_rewards_or_initialize(ctx)?;
        Ok(CostakerRewardsTracker::new(
            current.period.saturating_sub(1),
            0,
            0,
            0,
        ))
    }

    /// Every tracker, ordered by store key
    pub fn all_costakers(&self, ctx: &Context<'_>) -> Result<Vec<(AccAddress, CostakerRewardsTracker)>> {
        ctx.store()
            .iter_prefix(keys::COSTAKER_REWARDS_TRACKER_KEY_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let rest = &key[keys::COSTAKER_REWARDS_TRACKER_KEY_PREFIX.len()..];
                let (addr, _) =
                    AccAddress::split_length_prefixed(rest).map_err(|_| corrupt_key(&key))?;
                Ok((addr, codec::decode(&value)?))
            })
            .collect()
    }

    /// Walk trackers in key order until `f` returns `true`
    pub fn iterate_costakers(
        &self,
        ctx: &Context<'_>,
        mut f: impl FnMut(&AccAddress, &CostakerRewardsTracker) -> Result<bool>,
    ) -> Result<()> {
        for (addr, tracker) in self.all_costakers(ctx)? {
            if f(&addr, &tracker)? {
                break;
            }
        }
        Ok(())
    }

    // === Validator set ===

    /// Active validator set; empty before the first epoch end
    pub fn get_validator_set(&self, ctx: &Context<'_>) -> Result<ValidatorSet> {
        Ok(load(ctx, keys::VALIDATORS_KEY_PREFIX)?.unwrap_or_default())
    }

    pub(crate) fn set_validator_set(&self, ctx: &Context<'_>, set: &ValidatorSet) -> Result<()> {
        save(ctx, keys::VALIDATORS_KEY_PREFIX, set)
    }

    // === Post-slash delta shares ===

    /// Shares a delegator gained on a validator after its last slash this epoch
    pub fn get_post_slash_delta_shares(
        &self,
        ctx: &Context<'_>,
        validator: &ValAddress,
        delegator: &AccAddress,
    ) -> Result<Dec> {
        Ok(load(ctx, &keys::post_slash_delta_shares_key(validator, delegator))?.unwrap_or_default())
    }

    /// Store post-slash shares; zero deletes the record
    pub(crate) fn set_post_slash_delta_shares(
        &self,
        ctx: &Context<'_>,
        validator: &ValAddress,
        delegator: &AccAddress,
        shares: Dec,
    ) -> Result<()> {
        let key = keys::post_slash_delta_shares_key(validator, delegator);
        if shares.is_zero() {
            ctx.store().delete(&key)?;
            Ok(())
        } else {
            save(ctx, &key, &shares)
        }
    }

    pub fn post_slash_delta_shares_of(
        &self,
        ctx: &Context<'_>,
        validator: &ValAddress,
    ) -> Result<Vec<(AccAddress, Dec)>> {
        let prefix = keys::post_slash_delta_shares_prefix(validator);
        ctx.store()
            .iter_prefix(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let (delegator, _) = AccAddress::split_length_prefixed(&key[prefix.len()..])
                    .map_err(|_| corrupt_key(&key))?;
                Ok((delegator, codec::decode(&value)?))
            })
            .collect()
    }

    /// Every post-slash record as `(validator, delegator, shares)`
    pub fn all_post_slash_delta_shares(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, AccAddress, Dec)>> {
        ctx.store()
            .iter_prefix(keys::POST_SLASH_DELTA_SHARES_KEY_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let rest = &key[keys::POST_SLASH_DELTA_SHARES_KEY_PREFIX.len()..];
                let (validator, rest) =
                    ValAddress::split_length_prefixed(rest).map_err(|_| corrupt_key(&key))?;
                let (delegator, _) =
                    AccAddress::split_length_prefixed(rest).map_err(|_| corrupt_key(&key))?;
                Ok((validator, delegator, codec::decode(&value)?))
            })
            .collect()
    }

    pub(crate) fn clear_post_slash_delta_shares(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<()> {
        let prefix = keys::post_slash_delta_shares_prefix(validator);
        for (key, _) in ctx.store().iter_prefix(&prefix)? {
            ctx.store().delete(&key)?;
        }
        Ok(())
    }

    // === Slashed validators ===

    /// Whether `validator` was slashed since its snapshot was taken
    pub fn is_validator_slashed(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<bool> {
        Ok(ctx.store().has(&keys::slashed_validator_key(validator))?)
    }

    pub(crate) fn set_validator_slashed(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<()> {
        save(ctx, &keys::slashed_validator_key(validator), &())
    }

    pub(crate) fn clear_validator_slashed(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<()> {
        ctx.store().delete(&keys::slashed_validator_key(validator))?;
        Ok(())
    }

    pub fn slashed_validators(&self, ctx: &Context<'_>) -> Result<Vec<ValAddress>> {
        ctx.store()
            .iter_prefix(keys::SLASHED_VALIDATORS_KEY_PREFIX)?
            .into_iter()
            .map(|(key, _)| {
                let rest = &key[keys::SLASHED_VALIDATORS_KEY_PREFIX.len()..];
                ValAddress::split_length_prefixed(rest)
                    .map(|(addr, _)| addr)
                    .map_err(|_| corrupt_key(&key))
            })
            .collect()
    }

    // === Active finality providers ===

    pub fn is_finality_provider_active(&self, ctx: &Context<'_>, fp: &FpAddress) -> Result<bool> {
        Ok(ctx.store().has(&keys::active_finality_provider_key(fp))?)
    }

    pub(crate) fn set_finality_provider_active(
        &self,
        ctx: &Context<'_>,
        fp: &FpAddress,
        active: bool,
    ) -> Result<()> {
        let key = keys::active_finality_provider_key(fp);
        if active {
            save(ctx, &key, &())
        } else {
            ctx.store().delete(&key)?;
            Ok(())
        }
    }

    pub fn active_finality_providers(&self, ctx: &Context<'_>) -> Result<Vec<FpAddress>> {
        ctx.store()
            .iter_prefix(keys::ACTIVE_FINALITY_PROVIDERS_KEY_PREFIX)?
            .into_iter()
            .map(|(key, _)| {
                let rest = &key[keys::ACTIVE_FINALITY_PROVIDERS_KEY_PREFIX.len()..];
                FpAddress::split_length_prefixed(rest)
                    .map(|(addr, _)| addr)
                    .map_err(|_| corrupt_key(&key))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::TestChain;
    use crate::types::{CostakerRewardsTracker, HistoricalRewards};
    use costake_core::{AccAddress, Coins, Dec, ValAddress};

    #[test]
    fn test_params_missing_is_not_found() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        assert!(chain.keeper.get_params(&ctx).is_err());
    }

    #[test]
    fn test_lazy_initialization() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        assert!(chain.keeper.get_current_rewards_check_found(&ctx).unwrap().is_none());

        let current = chain.keeper.get_current_rewards_or_initialize(&ctx).unwrap();
        assert_eq!(current.period, 1);
        assert_eq!(current.total_score, 0);
        assert_eq!(
            chain.keeper.get_historical_rewards(&ctx, 0).unwrap(),
            HistoricalRewards::default()
        );
    }

    #[test]
    fn test_fresh_tracker_starts_at_last_sealed_period() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        let addr = AccAddress::new(vec![9u8; 20]).unwrap();
        let tracker = chain.keeper.get_costaker_rewards_or_initialize(&ctx, &addr).unwrap();
        assert_eq!(tracker, CostakerRewardsTracker::new(0, 0, 0, 0));
        assert!(chain.keeper.get_costaker_rewards(&ctx, &addr).unwrap().is_none());
    }

    #[test]
    fn test_historical_iteration_order() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        for period in [300u64, 2, 256] {
            chain
                .keeper
                .set_historical_rewards(&ctx, period, &HistoricalRewards::new(Coins::new()))
                .unwrap();
        }
        let periods: Vec<u64> = chain
            .keeper
            .all_historical_rewards(&ctx)
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(periods, vec![2, 256, 300]);
    }

    #[test]
    fn test_post_slash_shares_zero_deletes() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        let val = ValAddress::new(vec![1u8; 20]).unwrap();
        let del = AccAddress::new(vec![2u8; 32]).unwrap();
        let shares = Dec::from_int(5);

        chain.keeper.set_post_slash_delta_shares(&ctx, &val, &del, shares).unwrap();
        assert_eq!(chain.keeper.get_post_slash_delta_shares(&ctx, &val, &del).unwrap(), shares);
        assert_eq!(
            chain.keeper.all_post_slash_delta_shares(&ctx).unwrap(),
            vec![(val.clone(), del.clone(), shares)]
        );

        chain.keeper.set_post_slash_delta_shares(&ctx, &val, &del, Dec::zero()).unwrap();
        assert!(chain.keeper.post_slash_delta_shares_of(&ctx, &val).unwrap().is_empty());
    }

    #[test]
    fn test_slashed_markers() {
        let chain = TestChain::bare();
        let ctx = chain.ctx();
        let val = ValAddress::new(vec![1u8; 20]).unwrap();
        assert!(!chain.keeper.is_validator_slashed(&ctx, &val).unwrap());
        chain.keeper.set_validator_slashed(&ctx, &val).unwrap();
        assert_eq!(chain.keeper.slashed_validators(&ctx).unwrap(), vec![val.clone()]);
        chain.keeper.clear_validator_slashed(&ctx, &val).unwrap();
        assert!(!chain.keeper.is_validator_slashed(&ctx, &val).unwrap());
    }
}
