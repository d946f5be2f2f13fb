//! Satchel - Pluggable Session Storage
//!
//! Satchel persists small, keyed units of per-user state across independent,
//! stateless request handlers. Backends are swappable without touching
//! callers: an in-process memory store, a relational store, a keyed cache,
//! a keyed cache with distributed locking, and the filesystem all implement
//! one handler contract and are selected by name through a pool. For
//! locking backends, an administrative lock releaser can force-clear a
//! stuck session lock out of band.

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod lock;
pub mod metrics;
pub mod session;

pub use cache::{InMemoryCache, KeyValueCache, RedisCache};
pub use config::{satchel_home, Config, LockConfig};
pub use error::{Result, SatchelError};
pub use handler::{
    CacheHandler, FileHandler, HandlerPool, LockingCacheHandler, MemoryHandler, SessionHandler,
    SqlHandler, HANDLER_FILE, HANDLER_MEMORY, HANDLER_REDIS, HANDLER_REDIS_LOCKING, HANDLER_SQL,
};
pub use lock::{
    CacheLocker, LockKeys, LockReader, LockReleaser, LockReleaserPool, LockToken, Locker, SpinLock,
};
pub use metrics::{MetricsRecorder, NullRecorder, TracingRecorder};
pub use session::{
    generate_session_id, AttributeBag, MemorySessionStorage, MetadataBag, Namespace,
    PooledSessionStorage, Session, SessionBag, SessionStorage,
};
