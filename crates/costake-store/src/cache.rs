//! Cache branch over a parent store
//!
//! Writes are buffered until `write` flushes them to the parent. Dropping the
//! branch without writing discards every buffered change, which is how an
//! aborted transaction reverts its state.

use crate::error::Result;
use crate::kv::{range_bounds, KvStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Buffered branch of a parent store. `None` marks a deletion.
pub struct CacheStore<'a> {
    parent: &'a dyn KvStore,
    writes: RwLock<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a dyn KvStore) -> Self {
        Self {
            parent,
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of buffered writes and deletions
    pub fn pending(&self) -> usize {
        self.writes.read().len()
    }

    /// Flush buffered changes to the parent in key order
    pub fn write(self) -> Result<()> {
        let writes = self.writes.into_inner();
        let count = writes.len();
        for (key, value) in writes {
            match value {
                Some(value) => self.parent.set(&key, value)?,
                None => self.parent.delete(&key)?,
            }
        }
        tracing::trace!(count, "cache branch written");
        Ok(())
    }

    /// Drop buffered changes
    pub fn discard(self) {
        tracing::trace!(count = self.pending(), "cache branch discarded");
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.read().get(key) {
            return Ok(buffered.clone());
        }
        self.parent.get(key)
    }

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.writes.write().insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.writes.write().insert(key.to_vec(), None);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.iter_prefix(prefix)?.into_iter().collect();
        for (key, value) in self.writes.read().range(range_bounds(prefix)) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
