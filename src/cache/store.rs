// Cache store for reading and writing cached data.
// Wraps values in JSON envelopes with write timestamps and handles TTL
// checking, stale reads, and eviction under storage pressure.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::clock::Clock;

use super::storage::{Storage, StorageError};

/// Envelope for cached values.
/// `timestamp` is the wall-clock write time in milliseconds and is never
/// mutated; re-writes replace the whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub value: T,
    pub timestamp: i64,
}

/// Summary of the entries in a store's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
    pub average_bytes: usize,
}

/// Namespaced key-value cache with a uniform TTL.
pub struct CacheStore {
    storage: Box<dyn Storage>,
    clock: Arc<dyn Clock>,
    namespace: String,
    ttl_millis: i64,
}

impl CacheStore {
    pub fn new(
        storage: Box<dyn Storage>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            namespace: namespace.into(),
            ttl_millis: ttl.as_millis() as i64,
        }
    }

    /// Read a value if its entry is still within the TTL.
    /// An expired entry is evicted on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data: CachedData<T> = self.read_envelope(key)?;

        if self.clock.now_millis() - data.timestamp < self.ttl_millis {
            return Some(data.value);
        }

        self.storage.remove(key);
        None
    }

    /// Read a value regardless of age. Never evicts.
    /// Used only as an error-path fallback.
    pub fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_envelope(key).map(|data: CachedData<T>| data.value)
    }

    /// Write a value, stamping it with the current time.
    ///
    /// A capacity failure evicts the oldest half of this namespace and
    /// retries once; a second failure drops the write without surfacing an
    /// error to the caller.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let data = CachedData {
            value,
            timestamp: self.clock.now_millis(),
        };
        let json = match serde_json::to_string(&data) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        match self.storage.set(key, &json) {
            Ok(()) => {}
            Err(StorageError::Full) => {
                warn!(key, "cache storage full, evicting old entries");
                self.evict_oldest_half();

                if let Err(e) = self.storage.set(key, &json) {
                    warn!(key, error = %e, "failed to cache data after eviction");
                }
            }
            Err(e) => warn!(key, error = %e, "failed to write cache entry"),
        }
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn clear(&self, prefix: &str) {
        for key in self.storage.keys() {
            if key.starts_with(prefix) {
                self.storage.remove(&key);
            }
        }
    }

    /// Entry counts and sizes for this store's namespace.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let mut stats = CacheStats::default();

        for key in self.namespace_keys() {
            let Some(raw) = self.storage.get(&key) else {
                continue;
            };
            stats.total_entries += 1;
            stats.total_bytes += raw.len();

            // Unreadable entries count as expired
            match serde_json::from_str::<CachedData<serde_json::Value>>(&raw) {
                Ok(data) if now - data.timestamp < self.ttl_millis => stats.valid_entries += 1,
                _ => stats.expired_entries += 1,
            }
        }

        if stats.total_entries > 0 {
            stats.average_bytes = stats.total_bytes / stats.total_entries;
        }
        stats
    }

    fn read_envelope<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let raw = self.storage.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key, error = %e, "unreadable cache entry");
                None
            }
        }
    }

    fn namespace_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.namespace))
            .collect();
        keys.sort();
        keys
    }

    /// Drop the oldest half of this namespace's entries, oldest first.
    fn evict_oldest_half(&self) {
        let mut entries: Vec<(String, i64)> = self
            .namespace_keys()
            .into_iter()
            .map(|key| {
                let timestamp = self
                    .storage
                    .get(&key)
                    .and_then(|raw| {
                        serde_json::from_str::<CachedData<serde_json::Value>>(&raw).ok()
                    })
                    .map(|data| data.timestamp)
                    .unwrap_or(0);
                (key, timestamp)
            })
            .collect();

        // Keys are pre-sorted, so equal timestamps evict in a stable order
        entries.sort_by_key(|(_, timestamp)| *timestamp);

        let to_remove = entries.len().div_ceil(2);
        for (key, _) in entries.iter().take(to_remove) {
            self.storage.remove(key);
        }
        debug!(count = to_remove, "evicted old cache entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::storage::MemoryStorage;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(300);
    const NAMESPACE: &str = "github-api";

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            name: "test".to_string(),
            value: 42,
        }
    }

    fn store_with_clock(clock: Arc<ManualClock>) -> CacheStore {
        CacheStore::new(Box::new(MemoryStorage::new()), clock, NAMESPACE, TTL)
    }

    #[test]
    fn test_round_trip() {
        let store = store_with_clock(Arc::new(ManualClock::new(1_000)));

        store.set("github-api-repos-user", &sample());
        let read: Option<TestData> = store.get("github-api-repos-user");
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = store_with_clock(clock.clone());

        store.set("github-api-repos-user", &sample());

        // One millisecond under the TTL is still fresh
        clock.advance(TTL.as_millis() as i64 - 1);
        let read: Option<TestData> = store.get("github-api-repos-user");
        assert!(read.is_some());

        clock.advance(1);
        let read: Option<TestData> = store.get("github-api-repos-user");
        assert!(read.is_none());
    }

    #[test]
    fn test_stale_read_survives_expiry() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = store_with_clock(clock.clone());

        store.set("github-api-repos-user", &sample());
        clock.advance(TTL.as_millis() as i64 * 2);

        // The stale path returns the value and leaves the entry in place
        let stale: Option<TestData> = store.get_stale("github-api-repos-user");
        assert_eq!(stale, Some(sample()));
        let stale: Option<TestData> = store.get_stale("github-api-repos-user");
        assert_eq!(stale, Some(sample()));

        // The fresh path evicts it
        let fresh: Option<TestData> = store.get("github-api-repos-user");
        assert!(fresh.is_none());
        let stale: Option<TestData> = store.get_stale("github-api-repos-user");
        assert!(stale.is_none());
    }

    #[test]
    fn test_keys_are_isolated() {
        let store = store_with_clock(Arc::new(ManualClock::new(1_000)));

        let other = TestData {
            name: "other".to_string(),
            value: 7,
        };
        store.set("github-api-repos-a", &sample());
        store.set("github-api-repos-b", &other);
        store.set("github-api-repos-a", &other);

        let b: Option<TestData> = store.get("github-api-repos-b");
        assert_eq!(b, Some(other));
    }

    #[test]
    fn test_eviction_frees_oldest_half() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = CacheStore::new(
            Box::new(MemoryStorage::with_capacity(4)),
            clock.clone(),
            NAMESPACE,
            TTL,
        );

        for i in 0..4 {
            store.set(&format!("github-api-repos-u{i}"), &i);
            clock.advance(10);
        }

        // Full storage: the two oldest entries make room for the new one
        store.set("github-api-repos-u4", &4);

        assert!(store.get_stale::<i32>("github-api-repos-u0").is_none());
        assert!(store.get_stale::<i32>("github-api-repos-u1").is_none());
        assert_eq!(store.get_stale::<i32>("github-api-repos-u2"), Some(2));
        assert_eq!(store.get_stale::<i32>("github-api-repos-u3"), Some(3));
        assert_eq!(store.get_stale::<i32>("github-api-repos-u4"), Some(4));
    }

    #[test]
    fn test_failed_retry_drops_write_silently() {
        let clock = Arc::new(ManualClock::new(1_000));
        let storage = MemoryStorage::with_capacity(1);

        // Occupy the only slot with a key outside the namespace, so
        // eviction cannot free anything
        storage.set("unrelated", "x").unwrap();

        let store = CacheStore::new(Box::new(storage), clock, NAMESPACE, TTL);
        store.set("github-api-repos-user", &sample());

        let read: Option<TestData> = store.get_stale("github-api-repos-user");
        assert!(read.is_none());
    }

    #[test]
    fn test_clear_by_prefix() {
        let store = store_with_clock(Arc::new(ManualClock::new(1_000)));

        store.set("github-api-repos-user", &1);
        store.set("github-api-user-user", &2);
        store.set("github-api-repos-other", &3);

        store.clear("github-api-repos-user");

        assert!(store.get_stale::<i32>("github-api-repos-user").is_none());
        assert_eq!(store.get_stale::<i32>("github-api-user-user"), Some(2));
        assert_eq!(store.get_stale::<i32>("github-api-repos-other"), Some(3));
    }

    #[test]
    fn test_unreadable_entry_reads_as_absent() {
        let clock = Arc::new(ManualClock::new(1_000));
        let storage = MemoryStorage::new();
        storage.set("github-api-repos-user", "not json").unwrap();

        let store = CacheStore::new(Box::new(storage), clock, NAMESPACE, TTL);
        assert!(store.get::<TestData>("github-api-repos-user").is_none());
        assert!(store.get_stale::<TestData>("github-api-repos-user").is_none());
    }

    #[test]
    fn test_stats_split_valid_and_expired() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = store_with_clock(clock.clone());

        store.set("github-api-repos-user", &sample());
        clock.advance(TTL.as_millis() as i64 + 1);
        store.set("github-api-user-user", &sample());

        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert!(stats.total_bytes > 0);
        assert!(stats.average_bytes <= stats.total_bytes);
    }
}
