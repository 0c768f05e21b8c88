//! Execution context: store handle, block info and event sink

use crate::error::Result;
use crate::events::{Event, EventManager};
use crate::expected_keepers::VoteInfo;
use costake_store::{CacheStore, KvStore};

/// Header data visible to the module
#[derive(Clone, Debug, Default)]
pub struct BlockInfo {
    pub height: i64,
    /// Votes from the previous block's last commit
    pub vote_infos: Vec<VoteInfo>,
}

impl BlockInfo {
    pub fn new(height: i64, vote_infos: Vec<VoteInfo>) -> Self {
        Self { height, vote_infos }
    }
}

/// State access for one execution scope
pub struct Context<'a> {
    store: &'a dyn KvStore,
    block: BlockInfo,
    events: EventManager,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a dyn KvStore, block: BlockInfo) -> Self {
        Self {
            store,
            block,
            events: EventManager::new(),
        }
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store
    }

    pub fn block_height(&self) -> i64 {
        self.block.height
    }

    pub fn vote_infos(&self) -> &[VoteInfo] {
        &self.block.vote_infos
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take()
    }

    /// Run `f` on a cache branch. State writes and events are committed only
    /// if `f` succeeds; on error nothing it did is visible.
    pub fn branch<T>(&mut self, f: impl FnOnce(&mut Context<'_>) -> Result<T>) -> Result<T> {
        let cache = CacheStore::new(self.store);
        let (result, events) = {
            let mut child = Context {
                store: &cache,
                block: self.block.clone(),
                events: EventManager::new(),
            };
            let result = f(&mut child);
            (result, child.take_events())
        };

        match result {
            Ok(value) => {
                cache.write()?;
                self.events.extend(events);
                Ok(value)
            }
            Err(err) => {
                cache.discard();
                Err(err)
            }
        }
    }
}
