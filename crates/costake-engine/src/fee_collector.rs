//! Fee interception at begin block
//!
//! Before the distribution module allocates the block's fees, co-staking
//! takes its portion for co-stakers and, optionally, a portion paid straight
//! to the validators that signed the previous block.

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::events::{Event, EventValidatorDirectRewards};
use crate::keeper::Keeper;
use costake_core::{Coins, Dec, DecCoins};

/// How one block's fees were split
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub validators: Coins,
    pub costaking: Coins,
}

impl Keeper {
    /// Split the fee collector balance by the configured portions
    pub fn intercept_fee_collector(&self, ctx: &mut Context<'_>) -> Result<FeeSplit> {
        let params = self.get_params(ctx)?;
        let fee_collector = self.module_address(&self.modules.fee_collector)?;
        let fees = self.bank.get_all_balances(&fee_collector);
        if fees.is_zero() {
            return Ok(FeeSplit::default());
        }

        let validators = fees.mul_dec_floor(params.validators_portion)?;
        let costaking = fees.mul_dec_floor(params.costaking_portion)?;

        let validators = if validators.is_zero() {
            validators
        } else {
            self.allocate_validators_direct_rewards(ctx, &validators)?
        };

        if !costaking.is_zero() {
            self.bank
                .send_coins_from_module_to_module(
                    &self.modules.fee_collector,
                    &self.modules.costaking,
                    &costaking,
                )
                .map_err(|e| CostakingError::external("bank", e))?;
            self.add_rewards_for_costakers(ctx, &costaking)?;
        }

        if let Some(metrics) = &self.metrics {
            metrics.fee_intercepts.inc();
        }
        tracing::debug!(
            fees = %fees,
            validators = %validators,
            costaking = %costaking,
            "intercepted fee collector"
        );
        Ok(FeeSplit {
            validators,
            costaking,
        })
    }

    /// Pay `amount` to the previous block's voters pro rata to voting power,
    /// with full commission. A voter the staking module does not know keeps
    /// its share in the fee collector. Returns what was moved out.
    fn allocate_validators_direct_rewards(&self, ctx: &mut Context<'_>, amount: &Coins) -> Result<Coins> {
        let votes = ctx.vote_infos().to_vec();
        let total_power: u128 = votes.iter().map(|v| u128::from(v.power)).sum();
        if total_power == 0 {
            tracing::debug!("no voting power in last commit, skipping direct validator rewards");
            return Ok(Coins::new());
        }

        let mut recipients = Vec::with_capacity(votes.len());
        let mut known_power: u128 = 0;
        for vote in &votes {
            match self
                .staking
                .validator_by_cons_addr(&vote.validator)
                .map_err(|e| CostakingError::external("staking", e))?
            {
                Some(validator) if vote.power > 0 => {
                    known_power += u128::from(vote.power);
                    recipients.push((validator, vote.power));
                }
                Some(_) => {}
                None => tracing::warn!(cons = %vote.validator, "vote from unknown validator"),
            }
        }
        if known_power == 0 {
            return Ok(Coins::new());
        }

        let transferred = amount.mul_dec_floor(Dec::from_ratio(known_power, total_power)?)?;
        if transferred.is_zero() {
            return Ok(transferred);
        }
        self.bank
            .send_coins_from_module_to_module(
                &self.modules.fee_collector,
                &self.modules.distribution,
                &transferred,
            )
            .map_err(|e| CostakingError::external("bank", e))?;

        let pool = DecCoins::from_coins(&transferred)?;
        let validator_count = recipients.len() as u64;
        for (mut validator, power) in recipients {
            let reward = pool.mul_dec_truncate(Dec::from_ratio(u128::from(power), known_power)?)?;
            validator.commission_rate = Dec::one();
            self.distribution
                .allocate_tokens_to_validator(&validator, &reward)
                .map_err(|e| CostakingError::external("distribution", e))?;
        }

        ctx.emit(Event::ValidatorDirectRewards(EventValidatorDirectRewards {
            amount: transferred.clone(),
            validator_count,
        }));
        Ok(transferred)
    }
}
