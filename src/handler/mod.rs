//! Backend session handlers.
//!
//! One handler per store kind: in-process memory, relational (SQLite),
//! keyed cache (Redis), keyed cache with distributed locking, and
//! filesystem. The [`SessionHandler`] contract is the only coupling point
//! between the orchestrator and a backend; handlers are selected by name
//! through the [`HandlerPool`].

pub mod cache;
pub mod file;
pub mod locking;
pub mod memory;
pub mod pool;
pub mod sql;

pub use cache::CacheHandler;
pub use file::FileHandler;
pub use locking::LockingCacheHandler;
pub use memory::MemoryHandler;
pub use pool::HandlerPool;
pub use sql::SqlHandler;

use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Canonical handler names used by the pool's default registrations.
pub const HANDLER_SQL: &str = "sql";
pub const HANDLER_REDIS: &str = "redis";
pub const HANDLER_REDIS_LOCKING: &str = "redis_locking";
pub const HANDLER_FILE: &str = "file";
pub const HANDLER_MEMORY: &str = "memory";

/// Contract every backend handler implements.
///
/// Handlers are shared process-wide behind `Arc` and use interior
/// mutability for their connections; all methods take `&self`.
pub trait SessionHandler: Send + Sync {
    /// Establish or verify the underlying connection.
    ///
    /// Returns false, never an error, when the connection object could
    /// not be constructed.
    fn open(&self, save_path: &str, session_name: &str) -> bool;

    /// Release the connection. Always succeeds.
    fn close(&self) -> bool;

    /// Fetch the serialized payload for a session id.
    ///
    /// Returns an empty vec, not an error, when the key is absent.
    /// Backends that support read-with-touch refresh their expiry here.
    fn read(&self, session_id: &str) -> Result<Vec<u8>>;

    /// Upsert the payload with the handler's configured lifetime.
    ///
    /// A zero-length payload must never overwrite existing session data:
    /// the write is rejected with `Ok(false)`.
    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool>;

    /// Delete the session record. Idempotent; succeeds when absent.
    fn destroy(&self, session_id: &str) -> Result<bool>;

    /// Remove expired sessions.
    ///
    /// Handlers over stores with native TTL expiry are no-ops returning
    /// true; that is correct only because those stores self-expire and is
    /// a backend-specific property, not a general pattern.
    fn garbage_collect(&self, max_lifetime: Duration) -> Result<bool>;
}

impl fmt::Debug for dyn SessionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandler")
    }
}
