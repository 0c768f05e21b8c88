//! Hook events from neighbouring modules and their dispatch
//!
//! Neighbouring modules notify co-staking through typed events routed to
//! registered handlers. The keeper is one such handler; hosts can register
//! more alongside it.

mod epoching;
mod finality;
mod incentive;
mod staking;

use crate::context::Context;
use crate::error::Result;
use crate::expected_keepers::{FinalityProviderStatus, StakeholderType};
use crate::keeper::Keeper;
use costake_core::{AccAddress, Dec, FpAddress, ValAddress};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakingEvent {
    BeforeDelegationCreated {
        delegator: AccAddress,
        validator: ValAddress,
    },
    BeforeDelegationSharesModified {
        delegator: AccAddress,
        validator: ValAddress,
    },
    AfterDelegationModified {
        delegator: AccAddress,
        validator: ValAddress,
    },
    BeforeDelegationRemoved {
        delegator: AccAddress,
        validator: ValAddress,
    },
    BeforeValidatorSlashed {
        validator: ValAddress,
        fraction: Dec,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalityEvent {
    BtcDelegationActivated {
        fp: FpAddress,
        delegator: AccAddress,
        sats: u128,
    },
    BtcDelegationUnbonded {
        fp: FpAddress,
        delegator: AccAddress,
        sats: u128,
    },
    FpStatusChanged {
        fp: FpAddress,
        status: FinalityProviderStatus,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EpochingEvent {
    EpochBegins { epoch: u64 },
    EpochEnds { epoch: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncentiveEvent {
    BeforeRewardWithdraw {
        stakeholder: StakeholderType,
        address: AccAddress,
    },
}

/// Notification from a neighbouring module
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookEvent {
    Staking(StakingEvent),
    Finality(FinalityEvent),
    Epoching(EpochingEvent),
    Incentive(IncentiveEvent),
}

impl HookEvent {
    /// Module the event originates from
    pub fn source(&self) -> &'static str {
        match self {
            Self::Staking(_) => "staking",
            Self::Finality(_) => "btcstaking",
            Self::Epoching(_) => "epoching",
            Self::Incentive(_) => "incentive",
        }
    }
}

/// Receiver of hook events
pub trait HookHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, ctx: &mut Context<'_>, event: &HookEvent) -> Result<()>;
}

impl HookHandler for Keeper {
    fn name(&self) -> &str {
        "costaking"
    }

    fn handle(&self, ctx: &mut Context<'_>, event: &HookEvent) -> Result<()> {
        match event {
            HookEvent::Staking(event) => match event {
                StakingEvent::BeforeDelegationCreated { delegator, validator } => {
                    self.before_delegation_created(ctx, delegator, validator)
                }
                StakingEvent::BeforeDelegationSharesModified { delegator, validator } => {
                    self.before_delegation_shares_modified(ctx, delegator, validator)
                }
                StakingEvent::AfterDelegationModified { delegator, validator } => {
                    self.after_delegation_modified(ctx, delegator, validator)
                }
                StakingEvent::BeforeDelegationRemoved { delegator, validator } => {
                    self.before_delegation_removed(ctx, delegator, validator)
                }
                StakingEvent::BeforeValidatorSlashed { validator, fraction } => {
                    self.before_validator_slashed(ctx, validator, *fraction)
                }
            },
            HookEvent::Finality(event) => match event {
                FinalityEvent::BtcDelegationActivated { fp, delegator, sats } => {
                    self.after_btc_delegation_activated(ctx, fp, delegator, *sats)
                }
                FinalityEvent::BtcDelegationUnbonded { fp, delegator, sats } => {
                    self.after_btc_delegation_unbonded(ctx, fp, delegator, *sats)
                }
                FinalityEvent::FpStatusChanged { fp, status } => {
                    self.after_fp_status_change(ctx, fp, *status)
                }
            },
            HookEvent::Epoching(event) => {
                match event {
                    EpochingEvent::EpochBegins { epoch } => self.after_epoch_begins(ctx, *epoch),
                    EpochingEvent::EpochEnds { epoch } => {
                        self.after_epoch_ends(ctx, *epoch);
                    }
                }
                Ok(())
            }
            HookEvent::Incentive(IncentiveEvent::BeforeRewardWithdraw { stakeholder, address }) => {
                self.before_reward_withdraw(ctx, *stakeholder, address)
            }
        }
    }
}

/// Ordered set of hook handlers
#[derive(Default)]
pub struct HookRouter {
    handlers: Vec<Arc<dyn HookHandler>>,
}

impl HookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers run in registration order
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver `event` to every handler, stopping at the first error
    pub fn dispatch(&self, ctx: &mut Context<'_>, event: &HookEvent) -> Result<()> {
        for handler in &self.handlers {
            handler.handle(ctx, event).map_err(|err| {
                tracing::warn!(
                    handler = handler.name(),
                    source = event.source(),
                    error = %err,
                    "hook handler failed"
                );
                err
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CostakingError;
    use crate::params::Params;
    use crate::testutil::{acc, fp, TestChain};
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
        fail: bool,
    }

    impl HookHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn handle(&self, _ctx: &mut Context<'_>, event: &HookEvent) -> Result<()> {
            self.seen.lock().push(event.source());
            if self.fail {
                return Err(CostakingError::NotFound("recorder".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_router_stops_at_first_error() {
        let failing = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let after = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let mut router = HookRouter::new();
        router.register(failing.clone());
        router.register(after.clone());
        assert_eq!(router.len(), 2);

        let mut chain = TestChain::new(Params::default());
        let event = HookEvent::Epoching(EpochingEvent::EpochBegins { epoch: 1 });
        let result = chain.exec(|_, ctx| router.dispatch(ctx, &event));
        assert!(result.is_err());
        assert_eq!(*failing.seen.lock(), vec!["epoching"]);
        assert!(after.seen.lock().is_empty());
    }

    #[test]
    fn test_keeper_handles_finality_events() {
        let mut chain = TestChain::new(Params::default());
        let mut router = HookRouter::new();
        router.register(chain.keeper.clone());

        chain.finality.add_delegation(fp(1), acc(1), 700);
        let event = HookEvent::Finality(FinalityEvent::FpStatusChanged {
            fp: fp(1),
            status: FinalityProviderStatus::Active,
        });
        chain.exec(|_, ctx| router.dispatch(ctx, &event)).unwrap();

        let ctx = chain.ctx();
        let tracker = chain.keeper.get_costaker_rewards(&ctx, &acc(1)).unwrap().unwrap();
        assert_eq!(tracker.active_satoshis, 700);
    }
}
