//! Key-value store trait and in-memory backend

use crate::error::Result;
use crate::prefix_end;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered byte store
///
/// Methods take `&self`; backends synchronise internally so that read-only
/// queriers can share a handle with the block executor.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`, ascending by key
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory ordered store
#[derive(Default)]
pub struct MemStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of every entry, for snapshot comparisons
    pub fn dump(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data.read().clone()
    }
}

pub(crate) fn range_bounds(prefix: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let start = Bound::Included(prefix.to_vec());
    let end = match prefix_end(prefix) {
        Some(end) => Bound::Excluded(end),
        None => Bound::Unbounded,
    };
    (start, end)
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.data.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .read()
            .range(range_bounds(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
