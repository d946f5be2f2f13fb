//! Forced lock release and the releaser registry.
//!
//! Release is an operator-triggered recovery path for stuck sessions, not
//! part of normal application flow: it deletes the lock key without
//! checking the ownership token.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::KeyValueCache;
use crate::config::Config;
use crate::error::{Result, SatchelError};
use crate::handler::HANDLER_REDIS_LOCKING;
use crate::lock::{LockKeys, LockReader};

/// Force-releases a session's distributed lock.
pub struct LockReleaser {
    cache: Arc<dyn KeyValueCache>,
    keys: LockKeys,
}

impl LockReleaser {
    pub fn new(cache: Arc<dyn KeyValueCache>, keys: LockKeys) -> Self {
        Self { cache, keys }
    }

    /// Unconditionally delete the lock key for a session.
    ///
    /// Succeeds whether or not a lock was held; the caller only cares
    /// that the session is unlocked afterwards.
    pub fn release(&self, session_id: &str) -> Result<()> {
        let key = self.keys.lock_key(session_id);
        let removed = self.cache.delete(&key)?;
        tracing::debug!(session_id, removed, "forced session lock release");
        Ok(())
    }

    /// A reader over the same keyspace, for inspecting the holder.
    pub fn reader(&self) -> LockReader {
        LockReader::new(Arc::clone(&self.cache), self.keys.clone())
    }
}

impl std::fmt::Debug for LockReleaser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockReleaser")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// Name-indexed registry of lock releasers.
///
/// Only locking-capable handlers get a releaser registered; resolving any
/// other handler name fails with [`SatchelError::NotALockingHandler`] so
/// operators do not mistake "unsupported" for "already unlocked".
#[derive(Default)]
pub struct LockReleaserPool {
    releasers: HashMap<String, Arc<LockReleaser>>,
}

impl LockReleaserPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with the default releaser set for the given config:
    /// one releaser, registered under the locking cache handler's name.
    pub fn with_defaults(config: &Config, cache: Arc<dyn KeyValueCache>) -> Self {
        let mut pool = Self::new();
        pool.add_lock_releaser(
            HANDLER_REDIS_LOCKING,
            Arc::new(LockReleaser::new(
                cache,
                LockKeys::new(config.session.key_prefix.clone()),
            )),
        );
        pool
    }

    /// Register a releaser under a handler name. A later registration for
    /// the same name replaces the earlier one.
    pub fn add_lock_releaser(
        &mut self,
        handler_name: impl Into<String>,
        releaser: Arc<LockReleaser>,
    ) -> &mut Self {
        self.releasers.insert(handler_name.into(), releaser);
        self
    }

    /// Resolve the releaser for a handler name.
    pub fn get_lock_releaser(&self, handler_name: &str) -> Result<Arc<LockReleaser>> {
        self.releasers
            .get(handler_name)
            .cloned()
            .ok_or_else(|| SatchelError::not_a_locking_handler(handler_name))
    }
}
