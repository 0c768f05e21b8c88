//! # Co-staking Storage
//!
//! Byte-oriented key-value storage used by the rewards engine.
//!
//! ## Layout
//!
//! - `kv` - the `KvStore` trait and the ordered in-memory `MemStore`
//! - `cache` - `CacheStore`, a write buffer over a parent store that is either
//!   written through or dropped (transaction semantics)
//! - `codec` - bincode encoding of typed values
//!
//! Iteration is always in ascending key order so that every replica walks
//! entries identically.

pub mod cache;
pub mod codec;
pub mod error;
pub mod kv;

pub use cache::CacheStore;
pub use codec::{decode, encode};
pub use error::{Result, StoreError};
pub use kv::{KvStore, MemStore};

/// Smallest key strictly greater than every key starting with `prefix`,
/// or `None` when the prefix is all `0xff`
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(&[1, 2]), Some(vec![1, 3]));
        assert_eq!(prefix_end(&[1, 0xff]), Some(vec![2]));
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
    }
}
