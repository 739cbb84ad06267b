//! In-memory result cache with TTL support.
//!
//! Entries are immutable once stored and replaced wholesale. Expiry is lazy:
//! nothing sweeps the map, an expired entry is simply treated as absent by
//! [`TtlCache::get`] while staying resident for [`TtlCache::get_stale`].

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use super::parsers::{PlayerDetail, RosterEntry};

/// Cache entry with timestamp
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// An entry is valid strictly less than `ttl` after capture.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.cached_at < ttl
    }
}

/// Keyed, time-bounded store shared across requests
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<Arc<V>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get cached data if still valid
    pub fn get(&self, key: &K) -> Option<CacheEntry<Arc<V>>> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<CacheEntry<Arc<V>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl, now))
            .cloned()
    }

    /// Get the resident entry regardless of age
    pub fn get_stale(&self, key: &K) -> Option<CacheEntry<Arc<V>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Store data, replacing any previous entry for the key
    pub fn put(&self, key: K, data: V) -> Arc<V> {
        self.put_at(key, data, Utc::now())
    }

    fn put_at(&self, key: K, data: V, cached_at: DateTime<Utc>) -> Arc<V> {
        let data = Arc::new(data);
        let entry = CacheEntry {
            data: Arc::clone(&data),
            cached_at,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, entry);
        data
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Last full roster scrape with its pagination metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    pub players: Vec<RosterEntry>,
    /// Total reported by the site's "Showing A-B of N" marker
    pub expected: Option<u32>,
    /// Pagination stopped before the last page
    pub partial: bool,
}

impl RosterSnapshot {
    pub fn total_known(&self) -> bool {
        self.expected.is_some()
    }
}

/// Both result caches, created at startup and injected into the orchestrator
pub struct ResultCache {
    pub roster: TtlCache<(), RosterSnapshot>,
    pub details: TtlCache<String, PlayerDetail>,
}

impl ResultCache {
    pub fn new(roster_ttl: Duration, detail_ttl: Duration) -> Self {
        Self {
            roster: TtlCache::new(roster_ttl),
            details: TtlCache::new(detail_ttl),
        }
    }

    /// Roster cached for one hour, details for six
    #[cfg(test)]
    pub fn with_default_ttls() -> Self {
        Self::new(Duration::hours(1), Duration::hours(6))
    }

    /// Drop every entry; called at shutdown
    pub fn clear(&self) {
        self.roster.clear();
        self.details.clear();
    }
}
