//! Keyed-cache session handler with distributed locking.
//!
//! Wraps the plain cache handler's write and destroy in a spin-locked
//! critical section so two processes operating on the same session id
//! cannot clobber each other. Acquisition failure fails the operation;
//! it never proceeds unlocked. Release is guaranteed on every exit path
//! by an RAII guard.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::KeyValueCache;
use crate::config::{Config, LockConfig};
use crate::error::Result;
use crate::handler::{CacheHandler, SessionHandler};
use crate::lock::{CacheLocker, LockKeys, SpinLock};

/// Locking variant of the keyed-cache handler.
pub struct LockingCacheHandler {
    inner: CacheHandler,
    spin: SpinLock,
}

impl LockingCacheHandler {
    /// Wrap a cache handler with a spin lock over the same cache.
    pub fn new(inner: CacheHandler, key_prefix: impl Into<String>, lock: &LockConfig) -> Self {
        let locker = CacheLocker::new(inner.cache(), LockKeys::new(key_prefix), lock.ttl());
        let spin = SpinLock::new(Arc::new(locker), lock.max_attempts, lock.retry_delay());
        Self { inner, spin }
    }

    /// Create a Redis-backed locking handler from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let inner = CacheHandler::from_config(config)?;
        Ok(Self::new(
            inner,
            config.session.key_prefix.clone(),
            &config.redis.lock,
        ))
    }

    /// The cache this handler operates on.
    pub fn cache(&self) -> Arc<dyn KeyValueCache> {
        self.inner.cache()
    }
}

impl SessionHandler for LockingCacheHandler {
    fn open(&self, save_path: &str, session_name: &str) -> bool {
        self.inner.open(save_path, session_name)
    }

    fn close(&self) -> bool {
        self.inner.close()
    }

    fn read(&self, session_id: &str) -> Result<Vec<u8>> {
        self.inner.read(session_id)
    }

    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool> {
        let _guard = self.spin.acquire_guarded(session_id)?;
        self.inner.write(session_id, payload)
    }

    fn destroy(&self, session_id: &str) -> Result<bool> {
        let _guard = self.spin.acquire_guarded(session_id)?;
        self.inner.destroy(session_id)
    }

    fn garbage_collect(&self, max_lifetime: Duration) -> Result<bool> {
        self.inner.garbage_collect(max_lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::error::SatchelError;
    use crate::handler::tests::exercise_handler_contract;
    use std::sync::Barrier;
    use std::thread;

    const LIFETIME: Duration = Duration::from_secs(600);

    fn lock_config() -> LockConfig {
        LockConfig {
            ttl_millis: 10_000,
            retry_delay_millis: 0,
            max_attempts: 50,
        }
    }

    fn handler_over(cache: Arc<InMemoryCache>) -> LockingCacheHandler {
        let inner = CacheHandler::new(cache, "session:", LIFETIME);
        LockingCacheHandler::new(inner, "session:", &lock_config())
    }

    #[test]
    fn test_handler_contract() {
        let handler = handler_over(Arc::new(InMemoryCache::new()));
        exercise_handler_contract(&handler);
    }

    #[test]
    fn test_lock_key_absent_after_write() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("s1", b"data").unwrap();

        assert!(cache.get("session:s1:lock").unwrap().is_none());
        assert!(cache.get("session:s1").unwrap().is_some());
    }

    #[test]
    fn test_write_fails_under_exhausted_contention() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("s1", b"original").unwrap();

        // A foreign holder keeps the lock past our entire retry budget.
        cache
            .set("session:s1:lock", b"other-process", Duration::from_secs(60))
            .unwrap();

        let err = handler.write("s1", b"clobber").unwrap_err();
        assert!(matches!(err, SatchelError::LockContended { .. }));

        // The stored value was never touched without the lock.
        assert_eq!(cache.get("session:s1").unwrap().unwrap(), b"original");
    }

    #[test]
    fn test_concurrent_writes_exclude_each_other() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = Arc::new(handler_over(Arc::clone(&cache)));
        let barrier = Arc::new(Barrier::new(2));

        let mut handles = vec![];
        for payload in [b"payload-one".as_ref(), b"payload-two".as_ref()] {
            let handler = Arc::clone(&handler);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                handler.write("s1", payload).unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        // Exactly one writer's payload persisted intact, and no lock
        // remains held.
        let stored = cache.get("session:s1").unwrap().unwrap();
        assert!(stored == b"payload-one" || stored == b"payload-two");
        assert!(cache.get("session:s1:lock").unwrap().is_none());
    }

    #[test]
    fn test_destroy_takes_and_releases_lock() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("s1", b"data").unwrap();
        handler.destroy("s1").unwrap();

        assert!(cache.get("session:s1").unwrap().is_none());
        assert!(cache.get("session:s1:lock").unwrap().is_none());
    }

    #[test]
    fn test_lock_released_when_wrapped_operation_fails() {
        /// Cache whose writes always fail; lock traffic still works.
        struct WriteFailingCache(InMemoryCache);

        impl KeyValueCache for WriteFailingCache {
            fn connect(&self) -> bool {
                true
            }
            fn disconnect(&self) {}
            fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
                self.0.get(key)
            }
            fn get_and_touch(&self, key: &str, ttl: Duration) -> Result<Option<Vec<u8>>> {
                self.0.get_and_touch(key, ttl)
            }
            fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
                Err(SatchelError::backend("cache write refused"))
            }
            fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
                self.0.set_if_absent(key, value, ttl)
            }
            fn delete(&self, key: &str) -> Result<bool> {
                self.0.delete(key)
            }
        }

        let cache = Arc::new(WriteFailingCache(InMemoryCache::new()));
        let inner = CacheHandler::new(
            Arc::clone(&cache) as Arc<dyn KeyValueCache>,
            "session:",
            LIFETIME,
        );
        let handler = LockingCacheHandler::new(inner, "session:", &lock_config());

        assert!(handler.write("s1", b"data").is_err());

        // The guard released the lock despite the failure.
        assert!(cache.get("session:s1:lock").unwrap().is_none());
    }

    #[test]
    fn test_empty_write_rejected_and_lock_released() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("s1", b"data").unwrap();
        assert!(!handler.write("s1", b"").unwrap());

        assert_eq!(cache.get("session:s1").unwrap().unwrap(), b"data");
        assert!(cache.get("session:s1:lock").unwrap().is_none());
    }
}
