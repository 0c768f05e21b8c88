//! Epoch-end validator set reconciliation
//!
//! The bonded set is snapshotted at every epoch end together with each
//! validator's `(tokens, shares)`. Delegators are credited BABY only for
//! validators in the snapshot, valued at the snapshot rate:
//!
//! - newly active: credit every delegation at the new rate
//! - no longer active: debit every delegation at the old rate
//! - still active and slashed during the epoch: re-value at the new rate,
//!   now including shares gained after the slash
//! - still active and untouched: keep the old snapshot

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::types::{signed_diff, to_delta, TrackerDelta, ValidatorSet, ValidatorSetEntry};
use costake_core::{AccAddress, ValAddress};
use std::collections::BTreeMap;

/// What an epoch-end reconciliation changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorSetTransition {
    pub activated: Vec<ValAddress>,
    pub deactivated: Vec<ValAddress>,
    pub revalued: Vec<ValAddress>,
    /// Co-stakers whose active BABY changed
    pub affected_costakers: usize,
}

impl ValidatorSetTransition {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.deactivated.is_empty() && self.revalued.is_empty()
    }
}

impl Keeper {
    /// Replace the stored set with the staking module's bonded set and move
    /// delegators' active BABY accordingly
    pub fn update_validator_set(&self, ctx: &mut Context<'_>) -> Result<ValidatorSetTransition> {
        let previous = self.get_validator_set(ctx)?;

        let mut bonded = Vec::new();
        self.staking
            .iterate_last_validator_powers(&mut |validator, _power| {
                bonded.push(validator.clone());
                false
            })
            .map_err(|e| CostakingError::external("staking", e))?;
        bonded.sort();
        bonded.dedup();

        let mut transition = ValidatorSetTransition::default();
        let mut deltas: BTreeMap<AccAddress, i128> = BTreeMap::new();
        let mut entries = Vec::with_capacity(bonded.len());

        for address in &bonded {
            let validator = self
                .staking
                .get_validator(address)
                .map_err(|e| CostakingError::external("staking", e))?
                .ok_or_else(|| CostakingError::NotFound(format!("bonded validator {}", address)))?;
            let snapshot =
                ValidatorSetEntry::new(address.clone(), validator.tokens, validator.delegator_shares);

            match previous.get(address) {
                None => {
                    self.accumulate_activation(&snapshot, &mut deltas)?;
                    transition.activated.push(address.clone());
                    entries.push(snapshot);
                }
                Some(old) if self.is_validator_slashed(ctx, address)? => {
                    self.accumulate_revaluation(ctx, old, &snapshot, &mut deltas)?;
                    self.clear_slash_records(ctx, address)?;
                    transition.revalued.push(address.clone());
                    entries.push(snapshot);
                }
                Some(old) => entries.push(old.clone()),
            }
        }

        for old in previous.iter() {
            if bonded.binary_search(&old.validator).is_ok() {
                continue;
            }
            self.accumulate_deactivation(ctx, old, &mut deltas)?;
            self.clear_slash_records(ctx, &old.validator)?;
            transition.deactivated.push(old.validator.clone());
        }

        self.set_validator_set(ctx, &ValidatorSet::new(entries))?;

        for (costaker, delta) in deltas {
            if delta == 0 {
                continue;
            }
            self.costaker_modified(ctx, &costaker, TrackerDelta::baby(delta))?;
            transition.affected_costakers += 1;
        }

        tracing::info!(
            activated = transition.activated.len(),
            deactivated = transition.deactivated.len(),
            revalued = transition.revalued.len(),
            costakers = transition.affected_costakers,
            "validator set reconciled"
        );
        Ok(transition)
    }

    fn accumulate_activation(
        &self,
        snapshot: &ValidatorSetEntry,
        deltas: &mut BTreeMap<AccAddress, i128>,
    ) -> Result<()> {
        for delegation in self.validator_delegations(&snapshot.validator)? {
            let amount = snapshot.tokens_for(delegation.shares)?;
            add_delta(deltas, delegation.delegator, to_delta(amount)?)?;
        }
        Ok(())
    }

    fn accumulate_deactivation(
        &self,
        ctx: &Context<'_>,
        old: &ValidatorSetEntry,
        deltas: &mut BTreeMap<AccAddress, i128>,
    ) -> Result<()> {
        for delegation in self.validator_delegations(&old.validator)? {
            let amount = self.counted_value(ctx, old, &delegation.delegator, delegation.shares)?;
            add_delta(deltas, delegation.delegator, -to_delta(amount)?)?;
        }
        Ok(())
    }

    fn accumulate_revaluation(
        &self,
        ctx: &Context<'_>,
        old: &ValidatorSetEntry,
        snapshot: &ValidatorSetEntry,
        deltas: &mut BTreeMap<AccAddress, i128>,
    ) -> Result<()> {
        for delegation in self.validator_delegations(&old.validator)? {
            let before = self.counted_value(ctx, old, &delegation.delegator, delegation.shares)?;
            let after = snapshot.tokens_for(delegation.shares)?;
            add_delta(deltas, delegation.delegator, signed_diff(after, before)?)?;
        }
        Ok(())
    }

    fn clear_slash_records(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<()> {
        self.clear_post_slash_delta_shares(ctx, validator)?;
        self.clear_validator_slashed(ctx, validator)
    }

    fn validator_delegations(
        &self,
        validator: &ValAddress,
    ) -> Result<Vec<crate::expected_keepers::Delegation>> {
        self.staking
            .get_validator_delegations(validator)
            .map_err(|e| CostakingError::external("staking", e))
    }
}

fn add_delta(deltas: &mut BTreeMap<AccAddress, i128>, costaker: AccAddress, delta: i128) -> Result<()> {
    let entry = deltas.entry(costaker).or_insert(0);
    *entry = entry
        .checked_add(delta)
        .ok_or_else(|| CostakingError::Overflow("validator set delta".to_string()))?;
    Ok(())
}
