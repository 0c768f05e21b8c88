//! Period-based reward accounting
//!
//! Rewards accrue to the open period. Sealing a period folds
//! `rewards / total_score` into the cumulative per-score series, so that a
//! co-staker with constant score `s` between sealed periods `a` and `b` is
//! owed `s * (hist[b] - hist[a]) / DECIMAL_REWARDS`. Any change to a score
//! first seals the open period, pays the co-staker up to it, then restarts
//! their tracker there.

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::events::{Event, EventCostakersAddRewards};
use crate::keeper::Keeper;
use crate::score::update_score;
use crate::types::{CostakerRewardsTracker, CurrentRewards, HistoricalRewards, TrackerDelta, DECIMAL_REWARDS};
use costake_core::{AccAddress, Coins, U256};

impl Keeper {
    /// Add unscaled rewards to the open period
    pub fn add_rewards_for_costakers(&self, ctx: &mut Context<'_>, rewards: &Coins) -> Result<()> {
        let mut current = self.get_current_rewards_or_initialize(ctx)?;
        let event = EventCostakersAddRewards {
            add_rewards: rewards.clone(),
            current_rewards: current.unscaled_rewards()?,
            current_period: current.period,
            current_total_score: current.total_score,
        };

        current.add_rewards(rewards)?;
        self.set_current_rewards(ctx, &current)?;
        ctx.emit(Event::CostakersAddRewards(event));
        tracing::debug!(rewards = %rewards, period = current.period, "added co-staking rewards");
        Ok(())
    }

    /// Seal the open period and return its number
    ///
    /// With a zero total score nothing is owed, so the whole balance carries
    /// into the next period. Otherwise the truncation remainder carries.
    pub fn increment_rewards_period(&self, ctx: &mut Context<'_>) -> Result<u64> {
        let current = self.get_current_rewards_or_initialize(ctx)?;
        let period = current.period;

        let (per_score, carried) = if current.total_score == 0 {
            (Coins::new(), current.rewards.clone())
        } else {
            let total_score = U256::new(current.total_score);
            let per_score = current.rewards.quo_int_floor(total_score)?;
            let distributed = per_score.checked_mul_int(total_score)?;
            (per_score, current.rewards.checked_sub(&distributed)?)
        };

        let previous_period = period
            .checked_sub(1)
            .ok_or_else(|| CostakingError::Invariant("current period is zero".to_string()))?;
        let previous = self.get_historical_rewards(ctx, previous_period).map_err(|_| {
            CostakingError::Invariant(format!(
                "historical rewards for period {} missing",
                previous_period
            ))
        })?;
        let cumulative = previous.cumulative_rewards_per_score.checked_add(&per_score)?;

        self.set_historical_rewards(ctx, period, &HistoricalRewards::new(cumulative))?;
        self.set_current_rewards(
            ctx,
            &CurrentRewards::new(carried, period + 1, current.total_score),
        )?;

        if let Some(metrics) = &self.metrics {
            metrics.observe_period_sealed(period + 1, current.total_score);
        }
        tracing::debug!(period, total_score = current.total_score, "sealed rewards period");
        Ok(period)
    }

    /// Rewards owed to `costaker` up to sealed period `end_period`
    pub fn calculate_costaker_rewards(
        &self,
        ctx: &Context<'_>,
        costaker: &AccAddress,
        end_period: u64,
    ) -> Result<Coins> {
        match self.get_costaker_rewards(ctx, costaker)? {
            Some(tracker) => self.calculate_tracker_rewards(ctx, &tracker, end_period),
            None => Ok(Coins::new()),
        }
    }

    pub(crate) fn calculate_tracker_rewards(
        &self,
        ctx: &Context<'_>,
        tracker: &CostakerRewardsTracker,
        end_period: u64,
    ) -> Result<Coins> {
        if tracker.total_score == 0 {
            return Ok(Coins::new());
        }

        let start = tracker.start_period_cumulative_reward;
        if start > end_period {
            return Err(CostakingError::InvalidPeriod {
                start,
                end: end_period,
            });
        }

        let starting = self.get_historical_rewards(ctx, start)?;
        let ending = self.get_historical_rewards(ctx, end_period)?;
        let difference = ending
            .cumulative_rewards_per_score
            .checked_sub(&starting.cumulative_rewards_per_score)
            .map_err(|err| match err {
                costake_core::CoreError::NegativeAmount { denom } => CostakingError::NegativeRewards {
                    start,
                    end: end_period,
                    denom,
                },
                other => other.into(),
            })?;

        let scaled = difference.checked_mul_int(U256::new(tracker.total_score))?;
        Ok(scaled.quo_int_floor(DECIMAL_REWARDS)?)
    }

    /// Pay the stored tracker's rewards up to `end_period` into the gauge
    pub fn calculate_costaker_rewards_and_send_to_gauge(
        &self,
        ctx: &mut Context<'_>,
        costaker: &AccAddress,
        end_period: u64,
    ) -> Result<Coins> {
        match self.get_costaker_rewards(ctx, costaker)? {
            Some(tracker) => self.send_tracker_rewards_to_gauge(ctx, costaker, &tracker, end_period),
            None => Ok(Coins::new()),
        }
    }

    /// Credit the gauge, then move the funds to the incentive module
    pub(crate) fn send_tracker_rewards_to_gauge(
        &self,
        ctx: &mut Context<'_>,
        costaker: &AccAddress,
        tracker: &CostakerRewardsTracker,
        end_period: u64,
    ) -> Result<Coins> {
        let rewards = self.calculate_tracker_rewards(ctx, tracker, end_period)?;
        if rewards.is_zero() {
            return Ok(rewards);
        }

        self.incentive
            .accumulate_reward_gauge_for_costaker(costaker, &rewards);
        self.bank
            .send_coins_from_module_to_module(&self.modules.costaking, &self.modules.incentive, &rewards)
            .map_err(|e| CostakingError::external("bank", e))?;

        if let Some(metrics) = &self.metrics {
            metrics.gauge_payouts.inc();
        }
        tracing::debug!(%costaker, rewards = %rewards, end_period, "paid co-staker rewards to gauge");
        Ok(rewards)
    }

    /// Restart the stored tracker at the last sealed period
    pub fn initialize_costaker_rewards_tracker(
        &self,
        ctx: &Context<'_>,
        costaker: &AccAddress,
    ) -> Result<()> {
        let mut tracker = self.get_costaker_rewards_or_initialize(ctx, costaker)?;
        let current = self.get_current_rewards(ctx)?;
        tracker.start_period_cumulative_reward = current
            .period
            .checked_sub(1)
            .ok_or_else(|| CostakingError::Invariant("current period is zero".to_string()))?;
        self.set_costaker_rewards_tracker(ctx, costaker, &tracker)
    }

    /// Apply a stake change to a co-staker
    ///
    /// If the score is unchanged only the amounts are stored and no period is
    /// sealed. Otherwise the co-staker is paid at the old score first.
    pub fn costaker_modified(
        &self,
        ctx: &mut Context<'_>,
        costaker: &AccAddress,
        delta: TrackerDelta,
    ) -> Result<()> {
        let params = self.get_params(ctx)?;
        let before = self.get_costaker_rewards_or_initialize(ctx, costaker)?;
        let mut after = before.clone();
        after.apply_delta(&delta, &costaker.to_hex())?;

        let delta_score = update_score(&mut after, params.score_ratio_btc_by_baby)?;
        if delta_score == 0 {
            return self.set_costaker_rewards_tracker(ctx, costaker, &after);
        }
        self.costaker_modified_score_with_preinit(ctx, costaker, &before, &after, delta_score)
    }

    /// Change by signed satoshi and BABY amounts
    pub fn costaker_modified_active_amounts(
        &self,
        ctx: &mut Context<'_>,
        costaker: &AccAddress,
        sats_delta: i128,
        baby_delta: i128,
    ) -> Result<()> {
        self.costaker_modified(ctx, costaker, TrackerDelta::new(sats_delta, baby_delta))
    }

    /// Seal, pay at the old tracker, store the new one, adjust the total
    /// score and restart the tracker at the sealed period
    fn costaker_modified_score_with_preinit(
        &self,
        ctx: &mut Context<'_>,
        costaker: &AccAddress,
        before: &CostakerRewardsTracker,
        after: &CostakerRewardsTracker,
        delta_score: i128,
    ) -> Result<()> {
        let ended_period = self.increment_rewards_period(ctx)?;
        self.send_tracker_rewards_to_gauge(ctx, costaker, before, ended_period)?;
        self.set_costaker_rewards_tracker(ctx, costaker, after)?;

        if delta_score != 0 {
            let mut current = self.get_current_rewards(ctx)?;
            current.add_total_score(delta_score)?;
            self.set_current_rewards(ctx, &current)?;
            if let Some(metrics) = &self.metrics {
                metrics.observe_total_score(current.total_score);
            }
        }

        self.initialize_costaker_rewards_tracker(ctx, costaker)
    }

    /// Pay everything owed to `costaker`, keeping its stake unchanged.
    /// A co-staker without a tracker has nothing to withdraw.
    pub fn costaker_withdraw_rewards(&self, ctx: &mut Context<'_>, costaker: &AccAddress) -> Result<()> {
        let Some(tracker) = self.get_costaker_rewards(ctx, costaker)? else {
            return Ok(());
        };
        self.costaker_modified_score_with_preinit(ctx, costaker, &tracker, &tracker, 0)
    }

    /// Rescore every co-staker under a new ratio
    ///
    /// Seals once, pays each co-staker whose score changes at its old score,
    /// then stores the summed score as the new total.
    pub fn update_all_costakers_score(&self, ctx: &mut Context<'_>, new_ratio: u128) -> Result<()> {
        if new_ratio == 0 {
            return Err(CostakingError::InvalidParams(
                "score ratio must be at least 1".to_string(),
            ));
        }

        let ended_period = self.increment_rewards_period(ctx)?;
        let mut total_score: u128 = 0;
        let mut rescored = 0usize;

        for (costaker, tracker) in self.all_costakers(ctx)? {
            let mut updated = tracker.clone();
            let delta = update_score(&mut updated, new_ratio)?;
            if delta != 0 {
                self.send_tracker_rewards_to_gauge(ctx, &costaker, &tracker, ended_period)?;
                updated.start_period_cumulative_reward = ended_period;
                self.set_costaker_rewards_tracker(ctx, &costaker, &updated)?;
                rescored += 1;
            }
            total_score = total_score
                .checked_add(updated.total_score)
                .ok_or_else(|| CostakingError::Overflow("total score".to_string()))?;
        }

        let mut current = self.get_current_rewards(ctx)?;
        current.total_score = total_score;
        self.set_current_rewards(ctx, &current)?;
        if let Some(metrics) = &self.metrics {
            metrics.observe_total_score(total_score);
        }

        tracing::info!(new_ratio, rescored, total_score, "rescored co-stakers");
        Ok(())
    }
}
