//! Store key layout
//!
//! One-byte prefix per entity. Integers are big-endian so that byte order
//! equals numeric order; addresses carry a one-byte length prefix.

use costake_core::{AccAddress, FpAddress, ValAddress};

pub const PARAMS_KEY: &[u8] = &[0x01];
pub const HISTORICAL_REWARDS_KEY_PREFIX: &[u8] = &[0x02];
pub const CURRENT_REWARDS_KEY_PREFIX: &[u8] = &[0x03];
pub const COSTAKER_REWARDS_TRACKER_KEY_PREFIX: &[u8] = &[0x04];
pub const VALIDATORS_KEY_PREFIX: &[u8] = &[0x05];
pub const POST_SLASH_DELTA_SHARES_KEY_PREFIX: &[u8] = &[0x06];
pub const SLASHED_VALIDATORS_KEY_PREFIX: &[u8] = &[0x07];
pub const ACTIVE_FINALITY_PROVIDERS_KEY_PREFIX: &[u8] = &[0x08];

fn join(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

pub fn historical_rewards_key(period: u64) -> Vec<u8> {
    join(HISTORICAL_REWARDS_KEY_PREFIX, &[&period.to_be_bytes()])
}

/// Period encoded in a historical-rewards key
pub fn period_from_historical_key(key: &[u8]) -> Option<u64> {
    let bytes = key.strip_prefix(HISTORICAL_REWARDS_KEY_PREFIX)?;
    let bytes: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn costaker_rewards_tracker_key(costaker: &AccAddress) -> Vec<u8> {
    join(COSTAKER_REWARDS_TRACKER_KEY_PREFIX, &[&costaker.length_prefixed()])
}

pub fn post_slash_delta_shares_prefix(validator: &ValAddress) -> Vec<u8> {
    join(POST_SLASH_DELTA_SHARES_KEY_PREFIX, &[&validator.length_prefixed()])
}

pub fn post_slash_delta_shares_key(validator: &ValAddress, delegator: &AccAddress) -> Vec<u8> {
    join(
        POST_SLASH_DELTA_SHARES_KEY_PREFIX,
        &[&validator.length_prefixed(), &delegator.length_prefixed()],
    )
}

pub fn slashed_validator_key(validator: &ValAddress) -> Vec<u8> {
    join(SLASHED_VALIDATORS_KEY_PREFIX, &[&validator.length_prefixed()])
}

pub fn active_finality_provider_key(fp: &FpAddress) -> Vec<u8> {
    join(ACTIVE_FINALITY_PROVIDERS_KEY_PREFIX, &[&fp.length_prefixed()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_keys_sort_numerically() {
        assert!(historical_rewards_key(255) < historical_rewards_key(256));
        assert_eq!(period_from_historical_key(&historical_rewards_key(42)), Some(42));
        assert_eq!(period_from_historical_key(&[0x02, 1]), None);
    }

    #[test]
    fn test_post_slash_key_under_validator_prefix() {
        let val = ValAddress::new(vec![1u8; 20]).unwrap();
        let del = AccAddress::new(vec![2u8; 20]).unwrap();
        let key = post_slash_delta_shares_key(&val, &del);
        assert!(key.starts_with(&post_slash_delta_shares_prefix(&val)));
    }
}
