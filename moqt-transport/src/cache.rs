use std::collections::BTreeMap;
use std::sync::Arc;

use crate::tick::TickService;

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum CacheError {
    /// A range query where the lower bound is not below the upper bound.
    #[error("invalid range")]
    InvalidRange,
}

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at_ms: u64,
}

/// Keyed TTL-bounded store used for short-lived subscribe-range replay.
///
/// Expiry is lazy: lookups skip entries whose insertion time plus TTL is in
/// the past according to the tick service, and a sweep drops them for real.
pub struct Cache<K: Ord + Clone, V> {
    entries: BTreeMap<K, CacheEntry<V>>,
    tick: Arc<dyn TickService>,
}

impl<K: Ord + Clone, V> Cache<K, V> {
    pub fn new(tick: Arc<dyn TickService>) -> Self {
        Self {
            entries: BTreeMap::new(),
            tick,
        }
    }

    fn live(&self, entry: &CacheEntry<V>) -> bool {
        entry.expires_at_ms > self.tick.milliseconds()
    }

    pub fn insert(&mut self, key: K, value: V, ttl_ms: u64) {
        let expires_at_ms = self.tick.milliseconds() + ttl_ms;
        self.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                expires_at_ms,
            },
        );
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| self.live(entry))
            .unwrap_or(false)
    }

    /// True if any live entry falls in the half-open range `[lo, hi)`.
    pub fn contains_range(&self, lo: &K, hi: &K) -> Result<bool, CacheError> {
        if lo >= hi {
            return Err(CacheError::InvalidRange);
        }

        Ok(self
            .entries
            .range(lo.clone()..hi.clone())
            .any(|(_, entry)| self.live(entry)))
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|entry| self.live(entry))
            .map(|entry| entry.value.clone())
    }

    /// Shared references to every live value with a key in `[lo, hi)`,
    /// in key order.
    pub fn get_range(&self, lo: &K, hi: &K) -> Result<Vec<Arc<V>>, CacheError> {
        if lo >= hi {
            return Err(CacheError::InvalidRange);
        }

        Ok(self
            .entries
            .range(lo.clone()..hi.clone())
            .filter(|(_, entry)| self.live(entry))
            .map(|(_, entry)| entry.value.clone())
            .collect())
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry whose TTL has lapsed.
    pub fn sweep(&mut self) {
        let now = self.tick.milliseconds();
        self.entries.retain(|_, entry| entry.expires_at_ms > now);
    }

    /// Live entry count; lazily-expired entries are not counted.
    pub fn size(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| self.live(entry))
            .count()
    }
}
