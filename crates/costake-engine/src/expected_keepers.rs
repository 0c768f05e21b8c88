//! Interfaces consumed from neighbouring modules

use costake_core::{
    mul_div_floor, to_u128, AccAddress, Coins, ConsAddress, Dec, DecCoins, FpAddress, ValAddress, U256,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExternalError(pub String);

impl ExternalError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub type ExternalResult<T> = std::result::Result<T, ExternalError>;

/// Validator bonding status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

/// Validator as exposed by the staking module
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub operator: ValAddress,
    pub cons_address: ConsAddress,
    pub tokens: u128,
    pub delegator_shares: Dec,
    pub status: BondStatus,
    pub commission_rate: Dec,
    pub jailed: bool,
}

impl Validator {
    /// Tokens backing `shares` at the validator's live exchange rate
    pub fn tokens_from_shares(&self, shares: Dec) -> Option<u128> {
        if self.delegator_shares.is_zero() {
            return Some(0);
        }
        mul_div_floor(shares.raw(), U256::new(self.tokens), self.delegator_shares.raw())
            .and_then(to_u128)
    }
}

/// Delegation of BABY from an account to a validator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub shares: Dec,
}

/// Validator vote from the previous block's commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteInfo {
    pub validator: ConsAddress,
    pub power: u64,
}

/// Finality provider status as reported by the BTC staking module
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalityProviderStatus {
    Inactive,
    Active,
    Jailed,
    Slashed,
}

/// Kind of stakeholder withdrawing incentive rewards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeholderType {
    FinalityProvider,
    BtcStaker,
    Costaker,
}

pub trait AccountKeeper: Send + Sync {
    /// Address of a registered module account
    fn get_module_address(&self, name: &str) -> Option<AccAddress>;
}

pub trait BankKeeper: Send + Sync {
    fn get_all_balances(&self, address: &AccAddress) -> Coins;

    fn send_coins_from_module_to_module(
        &self,
        sender_module: &str,
        recipient_module: &str,
        amount: &Coins,
    ) -> ExternalResult<()>;
}

pub trait StakingKeeper: Send + Sync {
    fn get_validator(&self, validator: &ValAddress) -> ExternalResult<Option<Validator>>;

    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> ExternalResult<Option<Delegation>>;

    fn get_validator_delegations(&self, validator: &ValAddress) -> ExternalResult<Vec<Delegation>>;

    /// Walk the bonded set recorded at the last end block. The callback
    /// returns `true` to stop.
    fn iterate_last_validator_powers(
        &self,
        f: &mut dyn FnMut(&ValAddress, i64) -> bool,
    ) -> ExternalResult<()>;

    fn validator_by_cons_addr(&self, cons: &ConsAddress) -> ExternalResult<Option<Validator>>;
}

pub trait DistributionKeeper: Send + Sync {
    fn allocate_tokens_to_validator(
        &self,
        validator: &Validator,
        tokens: &DecCoins,
    ) -> ExternalResult<()>;
}

pub trait FinalityKeeper: Send + Sync {
    /// Walk every BTC delegator of `fp` with its active satoshis
    fn iterate_btc_delegation_rewards_tracker(
        &self,
        fp: &FpAddress,
        f: &mut dyn FnMut(&AccAddress, u128),
    ) -> ExternalResult<()>;
}

pub trait IncentiveKeeper: Send + Sync {
    fn accumulate_reward_gauge_for_costaker(&self, costaker: &AccAddress, rewards: &Coins);
}

/// Handles to every collaborator the keeper calls into
#[derive(Clone)]
pub struct ExpectedKeepers {
    pub accounts: Arc<dyn AccountKeeper>,
    pub bank: Arc<dyn BankKeeper>,
    pub staking: Arc<dyn StakingKeeper>,
    pub distribution: Arc<dyn DistributionKeeper>,
    pub finality: Arc<dyn FinalityKeeper>,
    pub incentive: Arc<dyn IncentiveKeeper>,
}
