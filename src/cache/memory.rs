//! In-memory keyed cache with per-key TTL.
//!
//! Thread-safe implementation over `RwLock<HashMap>`. Entries expire
//! lazily: an expired entry is treated as absent and pruned on the next
//! access. Backs the memory session handler and the lock subsystem tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::cache::KeyValueCache;
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() < deadline,
            None => true,
        }
    }
}

/// In-memory TTL-aware cache.
///
/// Values never persist past the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.is_live())
            .count()
    }

    /// Check if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Remaining TTL of a live key, if it has one.
    ///
    /// Primarily for tests and diagnostics; a `None` result does not
    /// distinguish an absent key from one without expiry.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if !entry.is_live() {
            return None;
        }
        entry
            .expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Drop every expired entry.
    pub fn prune_expired(&self) {
        self.entries.write().unwrap().retain(|_, e| e.is_live());
    }
}

impl KeyValueCache for InMemoryCache {
    fn connect(&self) -> bool {
        true
    }

    fn disconnect(&self) {}

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn get_and_touch(&self, key: &str, ttl: Duration) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        if entries.get(key).map(|e| e.is_live()).unwrap_or(false) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        match entries.remove(key) {
            Some(entry) => Ok(entry.is_live()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::exercise_cache_contract;
    use std::thread;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_cache_contract() {
        let cache = InMemoryCache::new();
        exercise_cache_contract(&cache);
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = InMemoryCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v", Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        assert!(cache.get("k").unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_if_absent_succeeds_over_expired_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", b"old", Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        assert!(cache.set_if_absent("k", b"new", TTL).unwrap());
        assert_eq!(cache.get("k").unwrap().as_deref(), Some(b"new".as_ref()));
    }

    #[test]
    fn test_get_and_touch_extends_ttl() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v", Duration::from_secs(5)).unwrap();

        cache.get_and_touch("k", Duration::from_secs(300)).unwrap();

        let remaining = cache.remaining_ttl("k").unwrap();
        assert!(remaining > Duration::from_secs(5));
    }

    #[test]
    fn test_delete_expired_entry_reports_absent() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v", Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        assert!(!cache.delete("k").unwrap());
    }

    #[test]
    fn test_prune_expired() {
        let cache = InMemoryCache::new();
        cache.set("live", b"v", TTL).unwrap();
        cache.set("dead", b"v", Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        cache.prune_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("live").unwrap().is_some());
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;

        let cache = Arc::new(InMemoryCache::new());
        let mut handles = vec![];

        for i in 0..10 {
            let cache_clone = Arc::clone(&cache);
            let handle = thread::spawn(move || {
                let key = format!("k{}", i);
                cache_clone.set(&key, b"v", TTL).unwrap();
                cache_clone.get(&key).unwrap();
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_set_if_absent_races_to_single_winner() {
        use std::sync::Arc;

        let cache = Arc::new(InMemoryCache::new());
        let mut handles = vec![];

        for i in 0..8 {
            let cache_clone = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                cache_clone
                    .set_if_absent("lock", format!("t{}", i).as_bytes(), TTL)
                    .unwrap()
            }));
        }

        let winners: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
