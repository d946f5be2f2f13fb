//! Keyed-cache abstraction for session handlers.
//!
//! The handlers only need a store's read/write/delete/touch primitives,
//! not its transport, so they talk to this trait. The Redis implementation
//! backs production deployments; the in-memory implementation backs the
//! memory handler and tests.

pub mod memory;
pub mod redis;

pub use memory::InMemoryCache;
pub use redis::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Keyed cache with per-key TTL and an atomic set-if-absent primitive.
///
/// All implementations must be thread-safe; handlers share them behind
/// `Arc` and call from whichever thread owns the current request.
pub trait KeyValueCache: Send + Sync {
    /// Establish the underlying connection. Returns false, never an error,
    /// when the connection cannot be constructed.
    fn connect(&self) -> bool;

    /// Release the underlying connection.
    fn disconnect(&self);

    /// Fetch a value without touching its expiry.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch a value and reset its TTL in the same operation, so active
    /// sessions are not expired out from under a live user.
    fn get_and_touch(&self, key: &str, ttl: Duration) -> Result<Option<Vec<u8>>>;

    /// Upsert a value with the given TTL.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Atomically set the value only if the key is absent.
    ///
    /// Returns true when the value was stored. This is the compare-and-set
    /// primitive the lock subsystem is built on.
    fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;

    /// Delete a key. Returns true when a live value was removed.
    fn delete(&self, key: &str) -> Result<bool>;
}

/// Blanket implementation for Arc-wrapped caches.
///
/// This allows using `Arc<T>` where `T: KeyValueCache` is expected, which
/// is useful for sharing one cache between a handler and the lock subsystem.
impl<T: KeyValueCache + ?Sized> KeyValueCache for Arc<T> {
    fn connect(&self) -> bool {
        (**self).connect()
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn get_and_touch(&self, key: &str, ttl: Duration) -> Result<Option<Vec<u8>>> {
        (**self).get_and_touch(key, ttl)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl)
    }

    fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
}
