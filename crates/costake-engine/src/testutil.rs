//! In-memory collaborators and a small chain harness for tests
//!
//! `TestChain` drives the keeper the way the host chain does: every call
//! runs on a cache branch like a transaction, and staking operations fire
//! their hooks in the staking module's order.

use crate::config::CostakingConfig;
use crate::context::{BlockInfo, Context};
use crate::error::Result;
use crate::events::Event;
use crate::expected_keepers::{
    AccountKeeper, BankKeeper, BondStatus, Delegation, DistributionKeeper, ExpectedKeepers,
    ExternalError, ExternalResult, FinalityKeeper, FinalityProviderStatus, IncentiveKeeper,
    StakingKeeper, Validator, VoteInfo,
};
use crate::genesis::GenesisState;
use crate::keeper::Keeper;
use crate::params::Params;
use crate::validator_set::ValidatorSetTransition;
use costake_core::{
    mul_div_floor, to_u128, AccAddress, Coins, ConsAddress, Dec, DecCoins, FpAddress, ValAddress, U256,
};
use costake_store::MemStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DENOM: &str = "ubbn";

pub fn acc(b: u8) -> AccAddress {
    AccAddress::new(vec![b; 20]).expect("valid address")
}

pub fn val(b: u8) -> ValAddress {
    ValAddress::new(vec![b; 20]).expect("valid address")
}

pub fn cons(b: u8) -> ConsAddress {
    ConsAddress::new(vec![b; 20]).expect("valid address")
}

pub fn fp(b: u8) -> FpAddress {
    FpAddress::new(vec![b; 32]).expect("valid address")
}

pub fn dec(s: &str) -> Dec {
    s.parse().expect("valid decimal")
}

// === Accounts ===

pub struct MockAccounts {
    modules: RwLock<BTreeSet<String>>,
}

impl MockAccounts {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            modules: RwLock::new(names.into_iter().map(str::to_string).collect()),
        }
    }
}

impl AccountKeeper for MockAccounts {
    fn get_module_address(&self, name: &str) -> Option<AccAddress> {
        self.modules
            .read()
            .contains(name)
            .then(|| AccAddress::for_module(name))
    }
}

// === Bank ===

#[derive(Default)]
pub struct MockBank {
    balances: RwLock<HashMap<AccAddress, Coins>>,
}

impl MockBank {
    pub fn mint(&self, address: &AccAddress, amount: &Coins) {
        let mut balances = self.balances.write();
        let balance = balances.entry(address.clone()).or_default();
        *balance = balance.checked_add(amount).expect("mint overflow");
    }

    pub fn balance(&self, address: &AccAddress) -> Coins {
        self.balances.read().get(address).cloned().unwrap_or_default()
    }

    pub fn module_balance(&self, name: &str) -> Coins {
        self.balance(&AccAddress::for_module(name))
    }
}

impl BankKeeper for MockBank {
    fn get_all_balances(&self, address: &AccAddress) -> Coins {
        self.balance(address)
    }

    fn send_coins_from_module_to_module(
        &self,
        sender_module: &str,
        recipient_module: &str,
        amount: &Coins,
    ) -> ExternalResult<()> {
        let from = AccAddress::for_module(sender_module);
        let to = AccAddress::for_module(recipient_module);
        let mut balances = self.balances.write();
        let remaining = balances
            .get(&from)
            .cloned()
            .unwrap_or_default()
            .checked_sub(amount)
            .map_err(|e| ExternalError::new(format!("{}: insufficient funds: {}", sender_module, e)))?;
        let received = balances
            .get(&to)
            .cloned()
            .unwrap_or_default()
            .checked_add(amount)
            .map_err(|e| ExternalError::new(e.to_string()))?;
        balances.insert(from, remaining);
        balances.insert(to, received);
        Ok(())
    }
}

// === Staking ===

#[derive(Default)]
pub struct MockStaking {
    validators: RwLock<BTreeMap<ValAddress, Validator>>,
    delegations: RwLock<BTreeMap<(ValAddress, AccAddress), Dec>>,
    bonded: RwLock<BTreeSet<ValAddress>>,
    fail: AtomicBool,
}

impl MockStaking {
    pub fn add_validator(&self, operator: ValAddress, cons_address: ConsAddress) {
        self.validators.write().insert(
            operator.clone(),
            Validator {
                operator,
                cons_address,
                tokens: 0,
                delegator_shares: Dec::zero(),
                status: BondStatus::Unbonded,
                commission_rate: dec("0.1"),
                jailed: false,
            },
        );
    }

    pub fn set_bonded(&self, operator: &ValAddress, bonded: bool) {
        if let Some(v) = self.validators.write().get_mut(operator) {
            v.status = if bonded {
                BondStatus::Bonded
            } else {
                BondStatus::Unbonding
            };
        }
        if bonded {
            self.bonded.write().insert(operator.clone());
        } else {
            self.bonded.write().remove(operator);
        }
    }

    pub fn validator(&self, operator: &ValAddress) -> Option<Validator> {
        self.validators.read().get(operator).cloned()
    }

    pub fn delegation_shares(&self, delegator: &AccAddress, operator: &ValAddress) -> Dec {
        self.delegations
            .read()
            .get(&(operator.clone(), delegator.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn has_delegation(&self, delegator: &AccAddress, operator: &ValAddress) -> bool {
        self.delegations
            .read()
            .contains_key(&(operator.clone(), delegator.clone()))
    }

    /// Bond `amount` tokens and return the issued shares
    pub fn delegate(&self, delegator: &AccAddress, operator: &ValAddress, amount: u128) -> Dec {
        let mut validators = self.validators.write();
        let validator = validators.get_mut(operator).expect("unknown validator");
        let shares = if validator.tokens == 0 {
            Dec::from_int(amount)
        } else {
            Dec::from_raw(
                mul_div_floor(
                    U256::new(amount),
                    validator.delegator_shares.raw(),
                    U256::new(validator.tokens),
                )
                .expect("shares overflow"),
            )
        };
        validator.tokens += amount;
        validator.delegator_shares = validator
            .delegator_shares
            .checked_add(shares)
            .expect("shares overflow");

        let mut delegations = self.delegations.write();
        let entry = delegations
            .entry((operator.clone(), delegator.clone()))
            .or_default();
        *entry = entry.checked_add(shares).expect("shares overflow");
        shares
    }

    /// Unbond `shares` and return the tokens released and the shares left
    pub fn unbond(&self, delegator: &AccAddress, operator: &ValAddress, shares: Dec) -> (u128, Dec) {
        let mut validators = self.validators.write();
        let validator = validators.get_mut(operator).expect("unknown validator");
        let tokens = validator
            .tokens_from_shares(shares)
            .expect("token overflow");
        validator.tokens -= tokens;
        validator.delegator_shares = validator
            .delegator_shares
            .checked_sub(shares)
            .expect("unbonding more shares than issued");

        let key = (operator.clone(), delegator.clone());
        let mut delegations = self.delegations.write();
        let left = delegations
            .get(&key)
            .copied()
            .unwrap_or_default()
            .checked_sub(shares)
            .expect("unbonding more shares than delegated");
        delegations.insert(key, left);
        (tokens, left)
    }

    pub fn remove_delegation(&self, delegator: &AccAddress, operator: &ValAddress) {
        self.delegations
            .write()
            .remove(&(operator.clone(), delegator.clone()));
    }

    /// Burn `fraction` of the validator's tokens
    pub fn slash(&self, operator: &ValAddress, fraction: Dec) -> u128 {
        let mut validators = self.validators.write();
        let validator = validators.get_mut(operator).expect("unknown validator");
        let burned = fraction
            .mul_int_floor(U256::new(validator.tokens))
            .ok()
            .and_then(to_u128)
            .expect("slash overflow");
        validator.tokens -= burned;
        burned
    }

    /// Make every keeper-facing call fail
    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> ExternalResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::new("staking store unavailable"));
        }
        Ok(())
    }
}

impl StakingKeeper for MockStaking {
    fn get_validator(&self, validator: &ValAddress) -> ExternalResult<Option<Validator>> {
        self.check()?;
        Ok(self.validator(validator))
    }

    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> ExternalResult<Option<Delegation>> {
        self.check()?;
        Ok(self
            .delegations
            .read()
            .get(&(validator.clone(), delegator.clone()))
            .map(|shares| Delegation {
                delegator: delegator.clone(),
                validator: validator.clone(),
                shares: *shares,
            }))
    }

    fn get_validator_delegations(&self, validator: &ValAddress) -> ExternalResult<Vec<Delegation>> {
        self.check()?;
        Ok(self
            .delegations
            .read()
            .iter()
            .filter(|((v, _), _)| v == validator)
            .map(|((v, d), shares)| Delegation {
                delegator: d.clone(),
                validator: v.clone(),
                shares: *shares,
            })
            .collect())
    }

    fn iterate_last_validator_powers(
        &self,
        f: &mut dyn FnMut(&ValAddress, i64) -> bool,
    ) -> ExternalResult<()> {
        self.check()?;
        let validators = self.validators.read();
        for operator in self.bonded.read().iter() {
            let power = validators
                .get(operator)
                .map(|v| i64::try_from(v.tokens).unwrap_or(i64::MAX))
                .unwrap_or(0);
            if f(operator, power) {
                break;
            }
        }
        Ok(())
    }

    fn validator_by_cons_addr(&self, cons: &ConsAddress) -> ExternalResult<Option<Validator>> {
        self.check()?;
        Ok(self
            .validators
            .read()
            .values()
            .find(|v| &v.cons_address == cons)
            .cloned())
    }
}

// === Distribution ===

#[derive(Default)]
pub struct MockDistribution {
    allocations: Mutex<Vec<(Validator, DecCoins)>>,
}

impl MockDistribution {
    pub fn allocations(&self) -> Vec<(Validator, DecCoins)> {
        self.allocations.lock().clone()
    }
}

impl DistributionKeeper for MockDistribution {
    fn allocate_tokens_to_validator(&self, validator: &Validator, tokens: &DecCoins) -> ExternalResult<()> {
        self.allocations
            .lock()
            .push((validator.clone(), tokens.clone()));
        Ok(())
    }
}

// === Finality ===

#[derive(Default)]
pub struct MockFinality {
    delegations: RwLock<BTreeMap<FpAddress, BTreeMap<AccAddress, u128>>>,
}

impl MockFinality {
    pub fn add_delegation(&self, fp: FpAddress, delegator: AccAddress, sats: u128) {
        *self
            .delegations
            .write()
            .entry(fp)
            .or_default()
            .entry(delegator)
            .or_default() += sats;
    }

    pub fn remove_delegation(&self, fp: &FpAddress, delegator: &AccAddress, sats: u128) {
        if let Some(by_delegator) = self.delegations.write().get_mut(fp) {
            if let Some(amount) = by_delegator.get_mut(delegator) {
                *amount = amount.saturating_sub(sats);
            }
        }
    }
}

impl FinalityKeeper for MockFinality {
    fn iterate_btc_delegation_rewards_tracker(
        &self,
        fp: &FpAddress,
        f: &mut dyn FnMut(&AccAddress, u128),
    ) -> ExternalResult<()> {
        if let Some(by_delegator) = self.delegations.read().get(fp) {
            for (delegator, sats) in by_delegator {
                f(delegator, *sats);
            }
        }
        Ok(())
    }
}

// === Incentive ===

#[derive(Default)]
pub struct MockIncentive {
    gauges: RwLock<HashMap<AccAddress, Coins>>,
}

impl MockIncentive {
    pub fn gauge(&self, costaker: &AccAddress) -> Coins {
        self.gauges.read().get(costaker).cloned().unwrap_or_default()
    }

    /// Sum of every gauge
    pub fn total(&self) -> Coins {
        self.gauges
            .read()
            .values()
            .fold(Coins::new(), |acc, c| acc.checked_add(c).expect("gauge overflow"))
    }
}

impl IncentiveKeeper for MockIncentive {
    fn accumulate_reward_gauge_for_costaker(&self, costaker: &AccAddress, rewards: &Coins) {
        let mut gauges = self.gauges.write();
        let gauge = gauges.entry(costaker.clone()).or_default();
        *gauge = gauge.checked_add(rewards).expect("gauge overflow");
    }
}

// === Chain harness ===

pub struct TestChain {
    pub store: MemStore,
    pub keeper: Arc<Keeper>,
    pub accounts: Arc<MockAccounts>,
    pub bank: Arc<MockBank>,
    pub staking: Arc<MockStaking>,
    pub distribution: Arc<MockDistribution>,
    pub finality: Arc<MockFinality>,
    pub incentive: Arc<MockIncentive>,
    pub config: CostakingConfig,
    pub height: i64,
    pub vote_infos: Vec<VoteInfo>,
    /// Events from every committed call
    pub events: Vec<Event>,
}

impl TestChain {
    /// Keeper over an empty store, no genesis
    pub fn bare() -> Self {
        let config = CostakingConfig::default();
        let accounts = Arc::new(MockAccounts::new([
            config.modules.costaking.as_str(),
            config.modules.fee_collector.as_str(),
            config.modules.distribution.as_str(),
            config.modules.incentive.as_str(),
        ]));
        let bank = Arc::new(MockBank::default());
        let staking = Arc::new(MockStaking::default());
        let distribution = Arc::new(MockDistribution::default());
        let finality = Arc::new(MockFinality::default());
        let incentive = Arc::new(MockIncentive::default());

        let keepers = ExpectedKeepers {
            accounts: accounts.clone(),
            bank: bank.clone(),
            staking: staking.clone(),
            distribution: distribution.clone(),
            finality: finality.clone(),
            incentive: incentive.clone(),
        };
        let keeper = Keeper::new(keepers, &config).expect("keeper construction");

        Self {
            store: MemStore::new(),
            keeper: Arc::new(keeper),
            accounts,
            bank,
            staking,
            distribution,
            finality,
            incentive,
            config,
            height: 1,
            vote_infos: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Chain initialised from a fresh genesis with `params`
    pub fn new(params: Params) -> Self {
        Self::with_genesis(&GenesisState::with_params(params))
    }

    pub fn with_genesis(genesis: &GenesisState) -> Self {
        let mut chain = Self::bare();
        chain
            .exec(|k, ctx| k.init_genesis(ctx, genesis))
            .expect("genesis");
        chain
    }

    pub fn block_info(&self) -> BlockInfo {
        BlockInfo::new(self.height, self.vote_infos.clone())
    }

    /// Read context over committed state
    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.store, self.block_info())
    }

    /// Run `f` as a transaction: committed on success, reverted on error
    pub fn exec<T>(&mut self, f: impl FnOnce(&Keeper, &mut Context<'_>) -> Result<T>) -> Result<T> {
        let keeper = self.keeper.clone();
        let (result, events) = {
            let mut ctx = Context::new(&self.store, self.block_info());
            let result = ctx.branch(|ctx| f(&keeper, ctx));
            (result, ctx.take_events())
        };
        self.events.extend(events);
        result
    }

    /// Run `f` directly on committed state
    pub fn exec_infallible<T>(&mut self, f: impl FnOnce(&Keeper, &mut Context<'_>) -> T) -> T {
        let keeper = self.keeper.clone();
        let (value, events) = {
            let mut ctx = Context::new(&self.store, self.block_info());
            let value = f(&keeper, &mut ctx);
            (value, ctx.take_events())
        };
        self.events.extend(events);
        value
    }

    pub fn fund_costaking_module(&self, amount: Coins) {
        self.bank
            .mint(&AccAddress::for_module(&self.config.modules.costaking), &amount);
    }

    pub fn fund_fee_collector(&self, amount: Coins) {
        self.bank
            .mint(&AccAddress::for_module(&self.config.modules.fee_collector), &amount);
    }

    pub fn set_votes(&mut self, votes: &[(ConsAddress, u64)]) {
        self.vote_infos = votes
            .iter()
            .map(|(validator, power)| VoteInfo {
                validator: validator.clone(),
                power: *power,
            })
            .collect();
    }

    /// Operator account of a test validator, distinct from every `acc(_)`
    pub fn operator_account(operator: &ValAddress) -> AccAddress {
        AccAddress::for_module(&format!("operator/{}", operator.to_hex()))
    }

    /// Register a bonded validator with an optional self-bond. It joins the
    /// co-staking set at the next epoch end.
    pub fn add_validator(&mut self, operator: ValAddress, self_bond: u128) {
        let cons_address = ConsAddress::new(operator.as_bytes().to_vec()).expect("valid address");
        self.staking.add_validator(operator.clone(), cons_address);
        if self_bond > 0 {
            self.staking
                .delegate(&Self::operator_account(&operator), &operator, self_bond);
        }
        self.staking.set_bonded(&operator, true);
    }

    /// Delegate with the staking module's hook sequence
    pub fn delegate(&mut self, delegator: AccAddress, operator: ValAddress, amount: u128) -> Result<()> {
        let staking = self.staking.clone();
        self.exec(move |k, ctx| {
            if staking.has_delegation(&delegator, &operator) {
                k.before_delegation_shares_modified(ctx, &delegator, &operator)?;
            } else {
                k.before_delegation_created(ctx, &delegator, &operator)?;
            }
            staking.delegate(&delegator, &operator, amount);
            k.after_delegation_modified(ctx, &delegator, &operator)
        })
    }

    /// Unbond shares; a fully unbonded delegation is removed
    pub fn undelegate(&mut self, delegator: AccAddress, operator: ValAddress, shares: Dec) -> Result<()> {
        let staking = self.staking.clone();
        self.exec(move |k, ctx| {
            k.before_delegation_shares_modified(ctx, &delegator, &operator)?;
            let (_, left) = staking.unbond(&delegator, &operator, shares);
            if left.is_zero() {
                k.before_delegation_removed(ctx, &delegator, &operator)?;
                staking.remove_delegation(&delegator, &operator);
                Ok(())
            } else {
                k.after_delegation_modified(ctx, &delegator, &operator)
            }
        })
    }

    pub fn slash(&mut self, operator: ValAddress, fraction: Dec) -> Result<()> {
        let staking = self.staking.clone();
        self.exec(move |k, ctx| {
            k.before_validator_slashed(ctx, &operator, fraction)?;
            staking.slash(&operator, fraction);
            Ok(())
        })
    }

    pub fn activate_btc_delegation(&mut self, fp: FpAddress, delegator: AccAddress, sats: u128) -> Result<()> {
        self.finality.add_delegation(fp.clone(), delegator.clone(), sats);
        self.exec(move |k, ctx| k.after_btc_delegation_activated(ctx, &fp, &delegator, sats))
    }

    pub fn unbond_btc_delegation(&mut self, fp: FpAddress, delegator: AccAddress, sats: u128) -> Result<()> {
        self.finality.remove_delegation(&fp, &delegator, sats);
        self.exec(move |k, ctx| k.after_btc_delegation_unbonded(ctx, &fp, &delegator, sats))
    }

    pub fn set_fp_status(&mut self, fp: FpAddress, status: FinalityProviderStatus) -> Result<()> {
        self.exec(move |k, ctx| k.after_fp_status_change(ctx, &fp, status))
    }

    /// Fire the epoch-end hook; panics if the reconciliation failed
    pub fn end_epoch(&mut self, epoch: u64) -> ValidatorSetTransition {
        self.exec_infallible(|k, ctx| k.after_epoch_ends(ctx, epoch))
            .expect("validator set update failed")
    }

    pub fn begin_block(&mut self) -> Result<()> {
        self.exec(|k, ctx| k.begin_blocker(ctx))
    }

    pub fn end_block(&mut self) -> Result<()> {
        self.exec(|k, ctx| k.end_blocker(ctx))
    }

    /// Close the current block and open the next one
    pub fn next_block(&mut self) -> Result<()> {
        self.end_block()?;
        self.height += 1;
        self.begin_block()
    }
}
