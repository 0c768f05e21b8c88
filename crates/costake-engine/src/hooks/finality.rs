//! BTC staking hooks
//!
//! Satoshis count only while delegated to a finality provider recorded as
//! active. The active record flips on status transitions, which makes a
//! repeated status report a no-op.

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::expected_keepers::FinalityProviderStatus;
use crate::keeper::Keeper;
use crate::types::{to_delta, TrackerDelta};
use costake_core::{AccAddress, FpAddress};

impl Keeper {
    pub fn after_btc_delegation_activated(
        &self,
        ctx: &mut Context<'_>,
        fp: &FpAddress,
        delegator: &AccAddress,
        sats: u128,
    ) -> Result<()> {
        if sats == 0 || !self.is_finality_provider_active(ctx, fp)? {
            return Ok(());
        }
        self.costaker_modified(ctx, delegator, TrackerDelta::sats(to_delta(sats)?))
    }

    pub fn after_btc_delegation_unbonded(
        &self,
        ctx: &mut Context<'_>,
        fp: &FpAddress,
        delegator: &AccAddress,
        sats: u128,
    ) -> Result<()> {
        if sats == 0 || !self.is_finality_provider_active(ctx, fp)? {
            return Ok(());
        }
        self.costaker_modified(ctx, delegator, TrackerDelta::sats(-to_delta(sats)?))
    }

    /// Credit or debit every delegator of `fp` when it enters or leaves the
    /// active state
    pub fn after_fp_status_change(
        &self,
        ctx: &mut Context<'_>,
        fp: &FpAddress,
        status: FinalityProviderStatus,
    ) -> Result<()> {
        let was_active = self.is_finality_provider_active(ctx, fp)?;
        let is_active = status == FinalityProviderStatus::Active;
        if was_active == is_active {
            return Ok(());
        }
        self.set_finality_provider_active(ctx, fp, is_active)?;

        let mut delegators = Vec::new();
        self.finality
            .iterate_btc_delegation_rewards_tracker(fp, &mut |delegator, sats| {
                delegators.push((delegator.clone(), sats));
            })
            .map_err(|e| CostakingError::external("finality", e))?;

        for (delegator, sats) in &delegators {
            if *sats == 0 {
                continue;
            }
            let amount = to_delta(*sats)?;
            let delta = if is_active { amount } else { -amount };
            self.costaker_modified(ctx, delegator, TrackerDelta::sats(delta))?;
        }

        tracing::info!(%fp, ?status, delegators = delegators.len(), "finality provider status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::expected_keepers::FinalityProviderStatus;
    use crate::params::Params;
    use crate::testutil::{acc, fp, TestChain};

    fn active_sats(chain: &TestChain, d: u8) -> u128 {
        let ctx = chain.ctx();
        chain
            .keeper
            .get_costaker_rewards(&ctx, &acc(d))
            .unwrap()
            .map(|t| t.active_satoshis)
            .unwrap_or(0)
    }

    #[test]
    fn test_activation_ignored_for_inactive_fp() {
        let mut chain = TestChain::new(Params::default());
        chain.activate_btc_delegation(fp(1), acc(1), 5_000).unwrap();
        assert_eq!(active_sats(&chain, 1), 0);
    }

    #[test]
    fn test_status_change_is_transition_idempotent() {
        let mut chain = TestChain::new(Params::default());
        chain.activate_btc_delegation(fp(1), acc(1), 5_000).unwrap();

        chain.set_fp_status(fp(1), FinalityProviderStatus::Active).unwrap();
        assert_eq!(active_sats(&chain, 1), 5_000);
        chain.set_fp_status(fp(1), FinalityProviderStatus::Active).unwrap();
        assert_eq!(active_sats(&chain, 1), 5_000);

        chain.set_fp_status(fp(1), FinalityProviderStatus::Jailed).unwrap();
        assert_eq!(active_sats(&chain, 1), 0);
        chain.set_fp_status(fp(1), FinalityProviderStatus::Slashed).unwrap();
        assert_eq!(active_sats(&chain, 1), 0);
    }

    #[test]
    fn test_activation_and_unbonding_on_active_fp() {
        let mut chain = TestChain::new(Params::default());
        chain.set_fp_status(fp(1), FinalityProviderStatus::Active).unwrap();
        chain.activate_btc_delegation(fp(1), acc(1), 5_000).unwrap();
        assert_eq!(active_sats(&chain, 1), 5_000);
        chain.unbond_btc_delegation(fp(1), acc(1), 5_000).unwrap();
        assert_eq!(active_sats(&chain, 1), 0);
    }
}
