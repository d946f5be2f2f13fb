//! In-memory session handler.
//!
//! Degenerate backend for surfaces that need session semantics without
//! durability: nothing survives the process. Entries still carry the
//! configured lifetime so expiry behaves like the cache-backed handlers.

use std::time::Duration;

use crate::cache::{InMemoryCache, KeyValueCache};
use crate::error::Result;
use crate::handler::SessionHandler;

/// Session handler over an in-process TTL cache.
pub struct MemoryHandler {
    cache: InMemoryCache,
    key_prefix: String,
    lifetime: Duration,
}

impl MemoryHandler {
    pub fn new(key_prefix: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            cache: InMemoryCache::new(),
            key_prefix: key_prefix.into(),
            lifetime,
        }
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    /// Number of live sessions held.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl SessionHandler for MemoryHandler {
    fn open(&self, _save_path: &str, _session_name: &str) -> bool {
        true
    }

    fn close(&self) -> bool {
        true
    }

    fn read(&self, session_id: &str) -> Result<Vec<u8>> {
        let value = self.cache.get_and_touch(&self.key(session_id), self.lifetime)?;
        Ok(value.unwrap_or_default())
    }

    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool> {
        if payload.is_empty() {
            return Ok(false);
        }
        self.cache.set(&self.key(session_id), payload, self.lifetime)?;
        Ok(true)
    }

    fn destroy(&self, session_id: &str) -> Result<bool> {
        self.cache.delete(&self.key(session_id))?;
        Ok(true)
    }

    fn garbage_collect(&self, _max_lifetime: Duration) -> Result<bool> {
        // Entries expire on their own TTL; sweeping just reclaims memory.
        self.cache.prune_expired();
        Ok(true)
    }
}
