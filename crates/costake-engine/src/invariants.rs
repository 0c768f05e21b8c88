//! State invariants
//!
//! Checked by tests after every operation and available to hosts that run
//! crisis checks.

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::score::calculate_score;

impl Keeper {
    /// Verify scores, period bookkeeping and the cumulative series
    pub fn assert_invariants(&self, ctx: &Context<'_>) -> Result<()> {
        let params = self.get_params(ctx)?;
        let current = self.get_current_rewards(ctx)?;
        if current.period == 0 {
            return Err(CostakingError::Invariant("current period is zero".to_string()));
        }
        let last_sealed = current.period - 1;

        let historical = self.all_historical_rewards(ctx)?;
        let mut expected_period = 0u64;
        let mut previous = None;
        for (period, rewards) in &historical {
            if *period != expected_period {
                return Err(CostakingError::Invariant(format!(
                    "historical period {} missing",
                    expected_period
                )));
            }
            if let Some(prev) = previous {
                if !rewards.cumulative_rewards_per_score.is_all_gte(prev) {
                    return Err(CostakingError::Invariant(format!(
                        "cumulative rewards decrease at period {}",
                        period
                    )));
                }
            }
            previous = Some(&rewards.cumulative_rewards_per_score);
            expected_period += 1;
        }
        if expected_period != current.period {
            return Err(CostakingError::Invariant(format!(
                "sealed periods end at {}, current period is {}",
                expected_period.saturating_sub(1),
                current.period
            )));
        }

        let mut score_sum: u128 = 0;
        for (costaker, tracker) in self.all_costakers(ctx)? {
            let expected = calculate_score(
                params.score_ratio_btc_by_baby,
                tracker.active_baby,
                tracker.active_satoshis,
            );
            if tracker.total_score != expected {
                return Err(CostakingError::Invariant(format!(
                    "costaker {} has score {}, expected {}",
                    costaker, tracker.total_score, expected
                )));
            }
            if tracker.start_period_cumulative_reward > last_sealed {
                return Err(CostakingError::Invariant(format!(
                    "costaker {} starts at {}, after last sealed period {}",
                    costaker, tracker.start_period_cumulative_reward, last_sealed
                )));
            }
            score_sum = score_sum
                .checked_add(tracker.total_score)
                .ok_or_else(|| CostakingError::Overflow("total score".to_string()))?;
        }
        if score_sum != current.total_score {
            return Err(CostakingError::Invariant(format!(
                "scores sum to {}, current total is {}",
                score_sum, current.total_score
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CostakingError;
    use crate::params::Params;
    use crate::testutil::{acc, TestChain};
    use costake_core::Dec;

    #[test]
    fn test_fresh_chain_holds() {
        let chain = TestChain::new(Params::default());
        assert!(chain.keeper.assert_invariants(&chain.ctx()).is_ok());
    }

    #[test]
    fn test_detects_score_sum_drift() {
        let mut chain = TestChain::new(Params::new(Dec::zero(), Dec::zero(), 50));
        chain
            .exec(|k, ctx| k.costaker_modified_active_amounts(ctx, &acc(1), 5_000, 50_000))
            .unwrap();
        let ctx = chain.ctx();
        assert!(chain.keeper.assert_invariants(&ctx).is_ok());

        let mut current = chain.keeper.get_current_rewards(&ctx).unwrap();
        current.total_score += 1;
        chain.keeper.set_current_rewards(&ctx, &current).unwrap();
        assert!(matches!(
            chain.keeper.assert_invariants(&ctx),
            Err(CostakingError::Invariant(_))
        ));
    }
}
