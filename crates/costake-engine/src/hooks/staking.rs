//! BABY delegation hooks
//!
//! Delegations to validators in the active set are valued at the set's
//! snapshot exchange rate. Shares gained on a validator after it was slashed
//! in the current epoch are tracked separately and not credited until the
//! epoch end re-snapshots the validator.

use crate::context::Context;
use crate::delta_cache::StakedInfo;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::types::{signed_diff, to_delta, TrackerDelta, ValidatorSetEntry};
use costake_core::{AccAddress, Dec, ValAddress};

impl Keeper {
    /// Capture a zero value so the after-hook credits the full delegation
    pub fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<()> {
        if !self.get_validator_set(ctx)?.contains(validator) {
            return Ok(());
        }
        self.delta_cache
            .lock()
            .set_staked_info(delegator, validator, StakedInfo::default());
        Ok(())
    }

    /// Capture the delegation's counted value before its shares change
    pub fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<()> {
        let set = self.get_validator_set(ctx)?;
        let Some(entry) = set.get(validator) else {
            return Ok(());
        };

        let shares = self.delegation_shares(delegator, validator)?;
        let amount = self.counted_value(ctx, entry, delegator, shares)?;
        self.delta_cache
            .lock()
            .set_staked_info(delegator, validator, StakedInfo { amount, shares });
        Ok(())
    }

    /// Credit the difference between the captured and the new counted value
    pub fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<()> {
        let pre = self.delta_cache.lock().take_staked_info(delegator, validator);
        let set = self.get_validator_set(ctx)?;
        let Some(entry) = set.get(validator) else {
            return Ok(());
        };
        let pre = pre.unwrap_or_default();

        let shares = self.delegation_shares(delegator, validator)?;
        let mut post_slash = self.get_post_slash_delta_shares(ctx, validator, delegator)?;
        if shares > pre.shares {
            if self.is_validator_slashed(ctx, validator)? {
                let gained = shares.saturating_sub(pre.shares);
                post_slash = post_slash
                    .checked_add(gained)
                    .ok_or_else(|| CostakingError::Overflow("post-slash shares".to_string()))?;
            }
        } else {
            post_slash = post_slash.saturating_sub(pre.shares.saturating_sub(shares));
        }
        self.set_post_slash_delta_shares(ctx, validator, delegator, post_slash)?;

        let amount = entry.tokens_for(shares.saturating_sub(post_slash))?;
        let delta = signed_diff(amount, pre.amount)?;
        if delta == 0 {
            return Ok(());
        }
        tracing::trace!(%delegator, %validator, delta, "delegation modified");
        self.costaker_modified(ctx, delegator, TrackerDelta::baby(delta))
    }

    /// Remove the delegation's counted value from the co-staker
    pub fn before_delegation_removed(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<()> {
        let pre = self.delta_cache.lock().take_staked_info(delegator, validator);
        let set = self.get_validator_set(ctx)?;
        let Some(entry) = set.get(validator) else {
            return Ok(());
        };

        let amount = match pre {
            Some(info) => info.amount,
            None => {
                let shares = self.delegation_shares(delegator, validator)?;
                self.counted_value(ctx, entry, delegator, shares)?
            }
        };
        self.set_post_slash_delta_shares(ctx, validator, delegator, Dec::zero())?;

        if amount == 0 {
            return Ok(());
        }
        tracing::trace!(%delegator, %validator, amount, "delegation removed");
        self.costaker_modified(ctx, delegator, TrackerDelta::baby(-to_delta(amount)?))
    }

    /// Mark an active validator as slashed until the next epoch end.
    /// Counted values stay at the snapshot rate in the meantime.
    pub fn before_validator_slashed(
        &self,
        ctx: &mut Context<'_>,
        validator: &ValAddress,
        fraction: Dec,
    ) -> Result<()> {
        if !self.get_validator_set(ctx)?.contains(validator) {
            return Ok(());
        }
        self.set_validator_slashed(ctx, validator)?;
        tracing::info!(%validator, %fraction, "active validator slashed");
        Ok(())
    }

    fn delegation_shares(&self, delegator: &AccAddress, validator: &ValAddress) -> Result<Dec> {
        Ok(self
            .staking
            .get_delegation(delegator, validator)
            .map_err(|e| CostakingError::external("staking", e))?
            .map(|d| d.shares)
            .unwrap_or_default())
    }

    /// Snapshot value of `shares` minus any uncredited post-slash shares
    pub(crate) fn counted_value(
        &self,
        ctx: &Context<'_>,
        entry: &ValidatorSetEntry,
        delegator: &AccAddress,
        shares: Dec,
    ) -> Result<u128> {
        let post_slash = self.get_post_slash_delta_shares(ctx, &entry.validator, delegator)?;
        entry.tokens_for(shares.saturating_sub(post_slash))
    }
}
