//! Block lifecycle entry points

use crate::context::Context;
use crate::error::Result;
use crate::keeper::Keeper;

impl Keeper {
    /// Intercept fees ahead of distribution. Skipped at genesis height.
    pub fn begin_blocker(&self, ctx: &mut Context<'_>) -> Result<()> {
        if ctx.block_height() <= 0 {
            return Ok(());
        }
        self.intercept_fee_collector(ctx)?;
        Ok(())
    }

    /// Drop the block-scoped delta cache
    pub fn end_blocker(&self, _ctx: &mut Context<'_>) -> Result<()> {
        let mut cache = self.delta_cache.lock();
        if !cache.is_empty() {
            tracing::warn!(entries = cache.len(), "staking delta cache not drained at end block");
        }
        cache.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::params::Params;
    use crate::testutil::{acc, val, TestChain, DENOM};
    use costake_core::{Coins, U256};

    #[test]
    fn test_begin_blocker_skips_genesis_height() {
        let mut chain = TestChain::new(Params::default());
        chain.fund_fee_collector(Coins::one(DENOM, 10).unwrap());
        chain.height = 0;
        chain.begin_block().unwrap();
        assert_eq!(chain.bank.module_balance("fee_collector").amount_of(DENOM), U256::new(10));

        chain.height = 1;
        chain.begin_block().unwrap();
        assert_eq!(chain.bank.module_balance("fee_collector").amount_of(DENOM), U256::new(5));
    }

    #[test]
    fn test_end_blocker_clears_cache() {
        let mut chain = TestChain::new(Params::default());
        chain.add_validator(val(1), 0);
        chain.end_epoch(1);
        chain
            .exec(|k, ctx| k.before_delegation_created(ctx, &acc(1), &val(1)))
            .unwrap();
        assert_eq!(chain.keeper.pending_deltas(), 1);
        chain.end_block().unwrap();
        assert_eq!(chain.keeper.pending_deltas(), 0);
    }
}
