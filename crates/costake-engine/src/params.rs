//! Governance parameters

use crate::error::{CostakingError, Result};
use costake_core::{Dec, U256};
use serde::{Deserialize, Serialize};

/// Default share of collected fees routed to co-stakers (0.5)
pub const DEFAULT_COSTAKING_PORTION: Dec = Dec::from_raw(U256::new(500_000_000_000_000_000));

/// Default share of collected fees paid directly to voting validators
pub const DEFAULT_VALIDATORS_PORTION: Dec = Dec::zero();

/// Default BABY required per satoshi of score
pub const DEFAULT_SCORE_RATIO_BTC_BY_BABY: u128 = 50;

/// Co-staking parameters, changeable only through governance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Fraction of collected fees routed to co-staking rewards
    pub costaking_portion: Dec,
    /// Fraction of collected fees paid directly to voting validators
    pub validators_portion: Dec,
    /// BABY needed per satoshi to count towards score
    pub score_ratio_btc_by_baby: u128,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            costaking_portion: DEFAULT_COSTAKING_PORTION,
            validators_portion: DEFAULT_VALIDATORS_PORTION,
            score_ratio_btc_by_baby: DEFAULT_SCORE_RATIO_BTC_BY_BABY,
        }
    }
}

impl Params {
    pub fn new(costaking_portion: Dec, validators_portion: Dec, score_ratio_btc_by_baby: u128) -> Self {
        Self {
            costaking_portion,
            validators_portion,
            score_ratio_btc_by_baby,
        }
    }

    /// Each portion in `[0, 1)`, their sum below one, ratio at least one
    pub fn validate(&self) -> Result<()> {
        if self.costaking_portion >= Dec::one() {
            return Err(CostakingError::InvalidParams(format!(
                "costaking portion {} must be below 1",
                self.costaking_portion
            )));
        }
        if self.validators_portion >= Dec::one() {
            return Err(CostakingError::InvalidParams(format!(
                "validators portion {} must be below 1",
                self.validators_portion
            )));
        }
        let sum = self
            .costaking_portion
            .checked_add(self.validators_portion)
            .ok_or_else(|| CostakingError::Overflow("portion sum".to_string()))?;
        if sum >= Dec::one() {
            return Err(CostakingError::InvalidParams(format!(
                "portion sum {} must be below 1",
                sum
            )));
        }
        if self.score_ratio_btc_by_baby < 1 {
            return Err(CostakingError::InvalidParams(
                "score ratio must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
