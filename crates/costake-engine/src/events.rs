//! Typed events emitted during block execution

use crate::types::DECIMAL_REWARDS;
use costake_core::Coins;
use serde::{Deserialize, Serialize};

/// Fees routed to co-stakers. Amounts are unscaled; `current_rewards` is the
/// open period's balance before the addition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCostakersAddRewards {
    pub add_rewards: Coins,
    pub current_rewards: Coins,
    pub current_period: u64,
    pub current_total_score: u128,
}

/// Fees paid straight to the validators that signed the previous block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventValidatorDirectRewards {
    pub amount: Coins,
    pub validator_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CostakersAddRewards(EventCostakersAddRewards),
    ValidatorDirectRewards(EventValidatorDirectRewards),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CostakersAddRewards(_) => "costaking.EventCostakersAddRewards",
            Self::ValidatorDirectRewards(_) => "validator_direct_rewards",
        }
    }

    /// Flat key/value view for indexers
    pub fn attributes(&self) -> Vec<(String, String)> {
        match self {
            Self::CostakersAddRewards(e) => vec![
                ("add_rewards".to_string(), e.add_rewards.to_string()),
                ("current_rewards".to_string(), e.current_rewards.to_string()),
                ("current_period".to_string(), e.current_period.to_string()),
                ("current_total_score".to_string(), e.current_total_score.to_string()),
                ("decimal_rewards".to_string(), DECIMAL_REWARDS.to_string()),
            ],
            Self::ValidatorDirectRewards(e) => vec![
                ("amount".to_string(), e.amount.to_string()),
                ("validator_count".to_string(), e.validator_count.to_string()),
            ],
        }
    }
}

/// Events collected for one execution scope
#[derive(Clone, Debug, Default)]
pub struct EventManager {
    events: Vec<Event>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_attributes() {
        let event = Event::ValidatorDirectRewards(EventValidatorDirectRewards {
            amount: Coins::one("ubbn", 10).unwrap(),
            validator_count: 2,
        });
        assert_eq!(event.kind(), "validator_direct_rewards");
        let attrs = event.attributes();
        assert_eq!(attrs[0], ("amount".to_string(), "10ubbn".to_string()));
        assert_eq!(attrs[1].1, "2");
    }

    #[test]
    fn test_manager_take() {
        let mut manager = EventManager::new();
        manager.emit(Event::ValidatorDirectRewards(EventValidatorDirectRewards {
            amount: Coins::new(),
            validator_count: 0,
        }));
        assert_eq!(manager.events().len(), 1);
        assert_eq!(manager.take().len(), 1);
        assert!(manager.events().is_empty());
    }
}
