//! Module keeper

use crate::config::{CostakingConfig, ModuleAccounts};
use crate::delta_cache::StakingDeltaCache;
use crate::error::{CostakingError, Result};
use crate::expected_keepers::{
    AccountKeeper, BankKeeper, DistributionKeeper, ExpectedKeepers, FinalityKeeper,
    IncentiveKeeper, StakingKeeper,
};
use crate::metrics::CostakingMetrics;
use costake_core::AccAddress;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owner of the co-staking state and entry point for every operation
pub struct Keeper {
    pub(crate) accounts: Arc<dyn AccountKeeper>,
    pub(crate) bank: Arc<dyn BankKeeper>,
    pub(crate) staking: Arc<dyn StakingKeeper>,
    pub(crate) distribution: Arc<dyn DistributionKeeper>,
    pub(crate) finality: Arc<dyn FinalityKeeper>,
    pub(crate) incentive: Arc<dyn IncentiveKeeper>,
    pub(crate) modules: ModuleAccounts,
    authority: AccAddress,
    pub(crate) delta_cache: Mutex<StakingDeltaCache>,
    pub(crate) metrics: Option<Arc<CostakingMetrics>>,
}

impl Keeper {
    /// Build a keeper. The co-staking module account must be registered.
    pub fn new(keepers: ExpectedKeepers, config: &CostakingConfig) -> Result<Self> {
        if keepers
            .accounts
            .get_module_address(&config.modules.costaking)
            .is_none()
        {
            return Err(CostakingError::NotFound(format!(
                "module account {}",
                config.modules.costaking
            )));
        }

        let authority = AccAddress::from_hex(&config.authority)
            .unwrap_or_else(|_| AccAddress::for_module(&config.authority));

        Ok(Self {
            accounts: keepers.accounts,
            bank: keepers.bank,
            staking: keepers.staking,
            distribution: keepers.distribution,
            finality: keepers.finality,
            incentive: keepers.incentive,
            modules: config.modules.clone(),
            authority,
            delta_cache: Mutex::new(StakingDeltaCache::new()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<CostakingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Account allowed to update params
    pub fn authority(&self) -> &AccAddress {
        &self.authority
    }

    pub fn module_accounts(&self) -> &ModuleAccounts {
        &self.modules
    }

    /// Resolve a module account address through the account keeper
    pub(crate) fn module_address(&self, name: &str) -> Result<AccAddress> {
        self.accounts
            .get_module_address(name)
            .ok_or_else(|| CostakingError::NotFound(format!("module account {}", name)))
    }

    /// Entries waiting in the block-scoped delta cache
    pub fn pending_deltas(&self) -> usize {
        self.delta_cache.lock().len()
    }
}
