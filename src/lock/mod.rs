//! Distributed session locking.
//!
//! Locking-capable handlers guard their write/destroy paths with a spin
//! lock over an atomic set-if-absent on a derived lock key. This module
//! holds the lock primitives: single-attempt acquisition, the bounded
//! spin-retry wrapper, a read-only holder inspector, and the force-release
//! machinery used by operators to recover stuck sessions.

pub mod locker;
pub mod reader;
pub mod releaser;

pub use locker::{CacheLocker, LockGuard, LockToken, Locker, SpinLock};
pub use reader::LockReader;
pub use releaser::{LockReleaser, LockReleaserPool};

/// Derives lock keys from session ids.
///
/// The lock key lives next to the session key in the same keyspace:
/// `{key_prefix}{session_id}:lock`.
#[derive(Debug, Clone)]
pub struct LockKeys {
    key_prefix: String,
}

impl LockKeys {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }

    /// The lock key for a session id.
    pub fn lock_key(&self, session_id: &str) -> String {
        format!("{}{}:lock", self.key_prefix, session_id)
    }
}
