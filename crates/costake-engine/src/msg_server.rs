//! Governance messages

use crate::context::Context;
use crate::error::{CostakingError, Result};
use crate::keeper::Keeper;
use crate::params::Params;
use costake_core::AccAddress;
use serde::{Deserialize, Serialize};

/// Replace the module params. Signed by the governance authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    /// Hex-encoded signer address
    pub authority: String,
    pub params: Params,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParamsResponse {}

impl Keeper {
    /// Apply new params atomically. A ratio change rescores every co-staker
    /// first, paying each at its old score.
    pub fn update_params(&self, ctx: &mut Context<'_>, msg: MsgUpdateParams) -> Result<MsgUpdateParamsResponse> {
        let signer = AccAddress::from_hex(&msg.authority)
            .map_err(|e| CostakingError::InvalidAddress(format!("{}: {}", msg.authority, e)))?;
        if &signer != self.authority() {
            return Err(CostakingError::Unauthorized {
                expected: self.authority().to_hex(),
                got: msg.authority,
            });
        }
        msg.params.validate()?;

        ctx.branch(|ctx| {
            let old = self.get_params(ctx)?;
            if old.score_ratio_btc_by_baby != msg.params.score_ratio_btc_by_baby {
                self.update_all_costakers_score(ctx, msg.params.score_ratio_btc_by_baby)?;
            }
            self.set_params(ctx, &msg.params)
        })?;

        tracing::info!(
            costaking_portion = %msg.params.costaking_portion,
            validators_portion = %msg.params.validators_portion,
            score_ratio = msg.params.score_ratio_btc_by_baby,
            "updated co-staking params"
        );
        Ok(MsgUpdateParamsResponse {})
    }
}
