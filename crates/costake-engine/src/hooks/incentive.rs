//! Incentive module hooks

use crate::context::Context;
use crate::error::Result;
use crate::expected_keepers::StakeholderType;
use crate::keeper::Keeper;
use costake_core::AccAddress;

impl Keeper {
    /// Flush a co-staker's accrued rewards into its gauge before the
    /// incentive module pays the gauge out
    pub fn before_reward_withdraw(
        &self,
        ctx: &mut Context<'_>,
        stakeholder: StakeholderType,
        address: &AccAddress,
    ) -> Result<()> {
        if stakeholder != StakeholderType::Costaker {
            return Ok(());
        }
        self.costaker_withdraw_rewards(ctx, address)
    }
}
