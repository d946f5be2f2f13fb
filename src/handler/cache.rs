//! Keyed-cache session handler (non-locking).
//!
//! The straight contract over a [`KeyValueCache`]: reads touch the key's
//! TTL so active sessions stay alive, writes upsert with the configured
//! lifetime, and garbage collection is a no-op because the cache expires
//! keys natively. That no-op is correct only for self-expiring stores.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{KeyValueCache, RedisCache};
use crate::config::Config;
use crate::error::Result;
use crate::handler::SessionHandler;
use crate::metrics::{names, timed, MetricsRecorder, TracingRecorder};

/// Session handler over a keyed cache with native TTL.
pub struct CacheHandler {
    cache: Arc<dyn KeyValueCache>,
    key_prefix: String,
    lifetime: Duration,
    metrics: Arc<dyn MetricsRecorder>,
}

impl CacheHandler {
    pub fn new(cache: Arc<dyn KeyValueCache>, key_prefix: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            cache,
            key_prefix: key_prefix.into(),
            lifetime,
            metrics: Arc::new(TracingRecorder),
        }
    }

    /// Create a Redis-backed handler from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(RedisCache::from_url(&config.redis.url)?);
        Ok(Self::new(
            cache,
            config.session.key_prefix.clone(),
            config.session.lifetime(),
        ))
    }

    /// Replace the metrics recorder.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The cache this handler operates on; the lock subsystem shares it.
    pub fn cache(&self) -> Arc<dyn KeyValueCache> {
        Arc::clone(&self.cache)
    }

    /// The configured session lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }
}

impl SessionHandler for CacheHandler {
    fn open(&self, _save_path: &str, _session_name: &str) -> bool {
        self.cache.connect()
    }

    fn close(&self) -> bool {
        self.cache.disconnect();
        true
    }

    fn read(&self, session_id: &str) -> Result<Vec<u8>> {
        let key = self.key(session_id);
        timed(self.metrics.as_ref(), names::CACHE_READ_TIME, || {
            let value = self.cache.get_and_touch(&key, self.lifetime)?;
            Ok(value.unwrap_or_default())
        })
    }

    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool> {
        if payload.is_empty() {
            return Ok(false);
        }

        let key = self.key(session_id);
        timed(self.metrics.as_ref(), names::CACHE_WRITE_TIME, || {
            self.cache.set(&key, payload, self.lifetime)?;
            Ok(true)
        })
    }

    fn destroy(&self, session_id: &str) -> Result<bool> {
        let key = self.key(session_id);
        timed(self.metrics.as_ref(), names::CACHE_DELETE_TIME, || {
            self.cache.delete(&key)?;
            Ok(true)
        })
    }

    fn garbage_collect(&self, _max_lifetime: Duration) -> Result<bool> {
        // The cache expires keys itself; nothing to sweep here.
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::handler::tests::exercise_handler_contract;
    use crate::metrics::test_support::CapturingRecorder;

    const LIFETIME: Duration = Duration::from_secs(600);

    fn handler_over(cache: Arc<InMemoryCache>) -> CacheHandler {
        CacheHandler::new(cache, "session:", LIFETIME)
    }

    #[test]
    fn test_handler_contract() {
        let handler = handler_over(Arc::new(InMemoryCache::new()));
        exercise_handler_contract(&handler);
    }

    #[test]
    fn test_keys_carry_prefix() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("abc", b"data").unwrap();

        assert!(cache.get("session:abc").unwrap().is_some());
    }

    #[test]
    fn test_read_touches_expiry() {
        let cache = Arc::new(InMemoryCache::new());
        let handler = handler_over(Arc::clone(&cache));

        handler.write("abc", b"data").unwrap();
        // Drain most of the TTL, then read.
        cache
            .set("session:abc", b"data", Duration::from_secs(5))
            .unwrap();
        handler.read("abc").unwrap();

        let remaining = cache.remaining_ttl("session:abc").unwrap();
        assert!(remaining > Duration::from_secs(5));
    }

    #[test]
    fn test_operations_record_timing_metrics() {
        let metrics = Arc::new(CapturingRecorder::new());
        let handler = handler_over(Arc::new(InMemoryCache::new()))
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsRecorder>);

        handler.write("s1", b"data").unwrap();
        handler.read("s1").unwrap();
        handler.destroy("s1").unwrap();

        assert_eq!(metrics.count_for(names::CACHE_WRITE_TIME), 1);
        assert_eq!(metrics.count_for(names::CACHE_READ_TIME), 1);
        assert_eq!(metrics.count_for(names::CACHE_DELETE_TIME), 1);
    }

    #[test]
    fn test_empty_write_records_no_metric() {
        let metrics = Arc::new(CapturingRecorder::new());
        let handler = handler_over(Arc::new(InMemoryCache::new()))
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsRecorder>);

        assert!(!handler.write("s1", b"").unwrap());

        assert_eq!(metrics.count_for(names::CACHE_WRITE_TIME), 0);
    }
}
