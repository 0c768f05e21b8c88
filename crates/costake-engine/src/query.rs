//! Read-only queries over committed state

use crate::context::{BlockInfo, Context};
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::params::Params;
use crate::types::{CostakerRewardsTracker, ValidatorSet};
use costake_core::{AccAddress, Coins};
use costake_store::KvStore;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCurrentRewardsResponse {
    pub rewards: Coins,
    pub period: u64,
    pub total_score: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHistoricalRewardsResponse {
    /// Scaled by `DECIMAL_REWARDS`
    pub cumulative_rewards_per_score: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCostakerRewardsTrackerResponse {
    pub start_period_cumulative_reward: u64,
    pub active_satoshis: u128,
    pub active_baby: u128,
    pub total_score: u128,
}

impl From<CostakerRewardsTracker> for QueryCostakerRewardsTrackerResponse {
    fn from(t: CostakerRewardsTracker) -> Self {
        Self {
            start_period_cumulative_reward: t.start_period_cumulative_reward,
            active_satoshis: t.active_satoshis,
            active_baby: t.active_baby,
            total_score: t.total_score,
        }
    }
}

/// Query handler bound to a store snapshot
pub struct Querier<'a> {
    keeper: &'a Keeper,
    store: &'a dyn KvStore,
}

impl<'a> Querier<'a> {
    pub fn new(keeper: &'a Keeper, store: &'a dyn KvStore) -> Self {
        Self { keeper, store }
    }

    fn ctx(&self) -> Context<'a> {
        Context::new(self.store, BlockInfo::default())
    }

    pub fn params(&self) -> Result<Params> {
        self.keeper.get_params(&self.ctx())
    }

    /// Open period; rewards are unscaled unless `scaled` is set
    pub fn current_rewards(&self, scaled: bool) -> Result<QueryCurrentRewardsResponse> {
        let current = self.keeper.get_current_rewards(&self.ctx())?;
        let rewards = if scaled {
            current.rewards.clone()
        } else {
            current.unscaled_rewards()?
        };
        Ok(QueryCurrentRewardsResponse {
            rewards,
            period: current.period,
            total_score: current.total_score,
        })
    }

    pub fn historical_rewards(&self, period: u64) -> Result<QueryHistoricalRewardsResponse> {
        let historical = self.keeper.get_historical_rewards(&self.ctx(), period)?;
        Ok(QueryHistoricalRewardsResponse {
            cumulative_rewards_per_score: historical.cumulative_rewards_per_score,
        })
    }

    /// Tracker for a hex-encoded co-staker address
    pub fn costaker_rewards_tracker(&self, costaker: &str) -> Result<QueryCostakerRewardsTrackerResponse> {
        let address = AccAddress::from_hex(costaker)
            .map_err(|e| CostakingError::InvalidAddress(format!("{}: {}", costaker, e)))?;
        self.keeper
            .get_costaker_rewards(&self.ctx(), &address)?
            .map(Into::into)
            .ok_or_else(|| CostakingError::NotFound(format!("tracker for {}", costaker)))
    }

    pub fn validator_set(&self) -> Result<ValidatorSet> {
        self.keeper.get_validator_set(&self.ctx())
    }

    /// Rewards a co-staker could withdraw now, up to the last sealed period
    pub fn pending_costaker_rewards(&self, costaker: &str) -> Result<Coins> {
        let address = AccAddress::from_hex(costaker)
            .map_err(|e| CostakingError::InvalidAddress(format!("{}: {}", costaker, e)))?;
        let ctx = self.ctx();
        let current = self.keeper.get_current_rewards(&ctx)?;
        self.keeper
            .calculate_costaker_rewards(&ctx, &address, current.period.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{acc, TestChain, DENOM};
    use crate::types::DECIMAL_REWARDS;
    use costake_core::{Dec, U256};

    #[test]
    fn test_current_rewards_scaling() {
        let mut chain = TestChain::new(Params::default());
        chain
            .exec(|k, ctx| k.add_rewards_for_costakers(ctx, &Coins::one(DENOM, 4).unwrap()))
            .unwrap();
        let querier = Querier::new(&chain.keeper, &chain.store);
        assert_eq!(querier.current_rewards(false).unwrap().rewards.amount_of(DENOM), U256::new(4));
        assert_eq!(
            querier.current_rewards(true).unwrap().rewards.amount_of(DENOM),
            U256::new(4) * DECIMAL_REWARDS
        );
    }

    #[test]
    fn test_tracker_query() {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 50));
        chain
            .exec(|k, ctx| k.costaker_modified_active_amounts(ctx, &acc(1), 5_000, 50_000))
            .unwrap();
        let querier = Querier::new(&chain.keeper, &chain.store);

        let tracker = querier.costaker_rewards_tracker(&acc(1).to_hex()).unwrap();
        assert_eq!(tracker.total_score, 1_000);
        assert!(matches!(
            querier.costaker_rewards_tracker("not-hex"),
            Err(CostakingError::InvalidAddress(_))
        ));
        assert!(matches!(
            querier.costaker_rewards_tracker(&acc(2).to_hex()),
            Err(CostakingError::NotFound(_))
        ));
    }

    #[test]
    fn test_historical_and_params() {
        let chain = TestChain::new(Params::default());
        let querier = Querier::new(&chain.keeper, &chain.store);
        assert_eq!(querier.params().unwrap(), Params::default());
        assert!(querier.historical_rewards(0).unwrap().cumulative_rewards_per_score.is_zero());
        assert!(querier.historical_rewards(5).is_err());
        assert!(querier.validator_set().unwrap().is_empty());
    }

    #[test]
    fn test_pending_rewards() {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 50));
        let a = acc(1);
        chain
            .exec(|k, ctx| k.costaker_modified_active_amounts(ctx, &a, 5_000, 50_000))
            .unwrap();
        chain
            .exec(|k, ctx| k.add_rewards_for_costakers(ctx, &Coins::one(DENOM, 900).unwrap()))
            .unwrap();
        chain.exec(|k, ctx| k.increment_rewards_period(ctx)).unwrap();

        let querier = Querier::new(&chain.keeper, &chain.store);
        let pending = querier.pending_costaker_rewards(&a.to_hex()).unwrap();
        assert_eq!(pending, Coins::one(DENOM, 900).unwrap());
    }
}
