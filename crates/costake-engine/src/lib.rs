//! # Co-staking Engine - Rewards for Combined BABY + BTC Stakers
//!
//! Accounts for rewards owed to accounts that stake both native BABY (to
//! active validators) and BTC (to active finality providers).
//!
//! ## Key Features
//!
//! - **Fee interception**: a governance-set portion of every block's fees is
//!   routed to co-stakers, optionally another portion straight to voters
//! - **Score**: `min(active_sats, active_baby / ratio)`
//! - **Period accounting**: O(1) reward claims from a cumulative
//!   rewards-per-score series
//! - **Hooks**: staking, BTC staking, epoching and incentive events keep
//!   every co-staker's active amounts current
//!
//! ## Reward Flow
//!
//! ```text
//! fee collector ──┬── validators portion ──> distribution (voters, full commission)
//!                 ├── costaking portion ───> costaking module ──> incentive gauges
//!                 └── remainder ───────────> regular distribution
//! ```
//!
//! Rewards accrue to the open period and are scaled by `DECIMAL_REWARDS`
//! (`10^20`) so per-score division keeps precision. A co-staker with score
//! `s` between sealed periods `a < b` is owed
//! `s * (hist[b] - hist[a]) / DECIMAL_REWARDS`.

pub mod abci;
pub mod config;
pub mod context;
pub mod delta_cache;
pub mod error;
pub mod events;
pub mod expected_keepers;
pub mod fee_collector;
pub mod genesis;
pub mod hooks;
pub mod invariants;
pub mod keeper;
pub mod keys;
pub mod metrics;
pub mod msg_server;
pub mod params;
pub mod query;
pub mod rewards;
pub mod score;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validator_set;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-exports
pub use config::{CostakingConfig, LoggingConfig, MetricsConfig, ModuleAccounts};
pub use context::{BlockInfo, Context};
pub use error::{CostakingError, Result};
pub use events::{Event, EventCostakersAddRewards, EventManager, EventValidatorDirectRewards};
pub use expected_keepers::ExpectedKeepers;
pub use fee_collector::FeeSplit;
pub use genesis::GenesisState;
pub use hooks::{HookEvent, HookHandler, HookRouter};
pub use keeper::Keeper;
pub use metrics::CostakingMetrics;
pub use msg_server::{MsgUpdateParams, MsgUpdateParamsResponse};
pub use params::Params;
pub use query::Querier;
pub use types::{
    CostakerRewardsTracker, CurrentRewards, HistoricalRewards, TrackerDelta, ValidatorSet,
    ValidatorSetEntry, DECIMAL_REWARDS,
};
pub use validator_set::ValidatorSetTransition;

/// Module constants
pub mod constants {
    /// Module name, also the name of its module account
    pub const MODULE_NAME: &str = "costaking";

    /// First reward period opened by a fresh chain
    pub const FIRST_PERIOD: u64 = 1;
}
