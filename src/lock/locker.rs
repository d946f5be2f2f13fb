//! Lock acquisition: single-attempt locker and bounded spin retry.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::KeyValueCache;
use crate::error::{Result, SatchelError};
use crate::lock::LockKeys;

/// Opaque ownership token stored under the lock key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Single-attempt lock acquisition.
///
/// Retry is the spin lock's responsibility, not the locker's; one call
/// maps to one compare-and-set against the backend.
pub trait Locker: Send + Sync {
    /// Attempt to acquire the lock for a session id once.
    ///
    /// Returns the ownership token on success, `None` when another holder
    /// already owns the lock.
    fn acquire(&self, session_id: &str) -> Result<Option<LockToken>>;

    /// Release the lock for a session id. Returns true when a lock key
    /// was actually removed.
    fn release(&self, session_id: &str) -> Result<bool>;
}

/// Locker over a keyed cache's atomic set-if-absent.
pub struct CacheLocker {
    cache: Arc<dyn KeyValueCache>,
    keys: LockKeys,
    ttl: Duration,
}

impl CacheLocker {
    pub fn new(cache: Arc<dyn KeyValueCache>, keys: LockKeys, ttl: Duration) -> Self {
        Self { cache, keys, ttl }
    }
}

impl Locker for CacheLocker {
    fn acquire(&self, session_id: &str) -> Result<Option<LockToken>> {
        let token = LockToken::generate();
        let key = self.keys.lock_key(session_id);
        let acquired = self
            .cache
            .set_if_absent(&key, token.as_str().as_bytes(), self.ttl)?;
        Ok(acquired.then_some(token))
    }

    fn release(&self, session_id: &str) -> Result<bool> {
        self.cache.delete(&self.keys.lock_key(session_id))
    }
}

/// Bounded retry-with-backoff around a [`Locker`].
///
/// On exhaustion the operation fails with a contention error; it never
/// falls through unlocked. Attempt count and delay are injectable so
/// tests can exercise both the first-try and exhausted paths without
/// wall-clock waits.
pub struct SpinLock {
    locker: Arc<dyn Locker>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SpinLock {
    pub fn new(locker: Arc<dyn Locker>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            locker,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Acquire the lock, retrying up to the configured attempt budget.
    pub fn acquire(&self, session_id: &str) -> Result<LockToken> {
        for attempt in 1..=self.max_attempts {
            if let Some(token) = self.locker.acquire(session_id)? {
                if attempt > 1 {
                    tracing::debug!(session_id, attempt, "session lock acquired after retry");
                }
                return Ok(token);
            }
            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                thread::sleep(self.retry_delay);
            }
        }

        Err(SatchelError::lock_contended(session_id, self.max_attempts))
    }

    /// Acquire the lock and return a guard that releases it on drop.
    ///
    /// The guard covers every exit path of the critical section, including
    /// errors raised by the wrapped operation.
    pub fn acquire_guarded(&self, session_id: &str) -> Result<LockGuard<'_>> {
        let token = self.acquire(session_id)?;
        Ok(LockGuard {
            locker: self.locker.as_ref(),
            session_id: session_id.to_string(),
            token,
        })
    }
}

/// RAII guard for an acquired session lock.
pub struct LockGuard<'a> {
    locker: &'a dyn Locker,
    session_id: String,
    #[allow(dead_code)]
    token: LockToken,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.locker.release(&self.session_id) {
            tracing::warn!(
                session_id = %self.session_id,
                "failed to release session lock: {}",
                err
            );
        }
    }
}
