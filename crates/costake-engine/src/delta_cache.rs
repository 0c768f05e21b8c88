//! Block-scoped staking delta cache
//!
//! Holds each delegation's value captured just before its shares change, so
//! the after-hook can compute the delta. Cleared at every end block.

use costake_core::{AccAddress, Dec, ValAddress};
use hashbrown::HashMap;

/// Delegation value captured by a before-hook
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StakedInfo {
    /// Tokens credited to the co-staker for this delegation
    pub amount: u128,
    /// Delegation shares at capture time
    pub shares: Dec,
}

#[derive(Debug, Default)]
pub struct StakingDeltaCache {
    pre_amounts: HashMap<(AccAddress, ValAddress), StakedInfo>,
}

impl StakingDeltaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_staked_info(&mut self, delegator: &AccAddress, validator: &ValAddress, info: StakedInfo) {
        self.pre_amounts
            .insert((delegator.clone(), validator.clone()), info);
    }

    pub fn staked_info(&self, delegator: &AccAddress, validator: &ValAddress) -> Option<StakedInfo> {
        self.pre_amounts
            .get(&(delegator.clone(), validator.clone()))
            .copied()
    }

    /// Remove and return the captured value
    pub fn take_staked_info(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Option<StakedInfo> {
        self.pre_amounts
            .remove(&(delegator.clone(), validator.clone()))
    }

    pub fn len(&self) -> usize {
        self.pre_amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pre_amounts.is_empty()
    }

    pub fn clear(&mut self) {
        self.pre_amounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_removes() {
        let del = AccAddress::new(vec![1u8; 20]).unwrap();
        let val = ValAddress::new(vec![2u8; 20]).unwrap();
        let mut cache = StakingDeltaCache::new();
        let info = StakedInfo {
            amount: 10,
            shares: Dec::from_int(10),
        };
        cache.set_staked_info(&del, &val, info);
        assert_eq!(cache.staked_info(&del, &val), Some(info));
        assert_eq!(cache.take_staked_info(&del, &val), Some(info));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = StakingDeltaCache::new();
        cache.set_staked_info(
            &AccAddress::new(vec![1u8; 20]).unwrap(),
            &ValAddress::new(vec![2u8; 20]).unwrap(),
            StakedInfo::default(),
        );
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
