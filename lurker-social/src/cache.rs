//! Deduplicating in-memory store for fetched posts.
//!
//! Entries are keyed by the item's own `id` (see [`item_id`]) and are
//! first-write-wins: content for an id is immutable within a process run, so
//! later writes for an id already present are ignored. Nothing is persisted
//! or evicted.
//!
//! The cache is a cheap handle over shared state. Construct one at startup
//! and clone it into whatever needs it; every clone sees the same entries.
use crate::twitter::extract::{item_id, to_item_list};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, Value>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every identifiable item found in `data`.
    ///
    /// `data` may be a single item or any payload [`to_item_list`] understands.
    /// Items without an id are skipped. Returns how many new entries were
    /// inserted.
    ///
    /// ```
    /// use lurker_social::ResponseCache;
    /// use serde_json::json;
    ///
    /// let cache = ResponseCache::new();
    /// assert_eq!(cache.write(&json!([{ "id": "1" }, { "id": "1" }, { "text": "?" }])), 1);
    /// assert_eq!(cache.read("1"), Some(json!({ "id": "1" })));
    /// ```
    pub fn write(&self, data: &Value) -> usize {
        let items = to_item_list(data);
        let total = items.len();
        let mut inserted = 0usize;
        let mut skipped = 0usize;

        for item in items {
            let Some(id) = item_id(&item) else {
                skipped += 1;
                tracing::trace!("cache.write.no_id");
                continue;
            };
            // check and insert under one shard lock
            match self.entries.entry(id) {
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(item);
                    inserted += 1;
                }
            }
        }

        tracing::debug!(
            items = total,
            inserted,
            skipped,
            size = self.entries.len(),
            "cache.write"
        );
        inserted
    }

    /// Look up an item by id.
    pub fn read(&self, id: &str) -> Option<Value> {
        let hit = self.entries.get(id).map(|e| e.value().clone());
        tracing::trace!(id, hit = hit.is_some(), "cache.read");
        hit
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("len", &self.entries.len())
            .finish()
    }
}
