//! Epoching hooks

use crate::context::Context;
use crate::keeper::Keeper;
use crate::validator_set::ValidatorSetTransition;

impl Keeper {
    pub fn after_epoch_begins(&self, _ctx: &mut Context<'_>, epoch: u64) {
        tracing::trace!(epoch, "epoch begins");
    }

    /// Reconcile the validator set on a cache branch. A failure is logged and
    /// leaves the previous set in place; it never halts the chain.
    pub fn after_epoch_ends(&self, ctx: &mut Context<'_>, epoch: u64) -> Option<ValidatorSetTransition> {
        match ctx.branch(|ctx| self.update_validator_set(ctx)) {
            Ok(transition) => {
                tracing::debug!(epoch, "epoch ended");
                Some(transition)
            }
            Err(err) => {
                tracing::error!(epoch, error = %err, "failed to update co-staking validator set");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::params::Params;
    use crate::testutil::{acc, val, TestChain};

    #[test]
    fn test_failure_keeps_previous_set() {
        let mut chain = TestChain::new(Params::default());
        chain.add_validator(val(1), 0);
        chain.delegate(acc(1), val(1), 1_000).unwrap();
        chain.end_epoch(1);
        let before = chain.store.dump();

        chain.staking.fail_next_calls(true);
        let result = chain.exec_infallible(|k, ctx| k.after_epoch_ends(ctx, 2));
        assert!(result.is_none());
        chain.staking.fail_next_calls(false);
        assert_eq!(chain.store.dump(), before);
    }
}
