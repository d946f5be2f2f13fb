//! Redis-backed keyed cache.
//!
//! Uses the synchronous `redis` connection API. The connection is
//! established on `connect()` (or lazily on first use, so administrative
//! callers like the lock releaser do not need to go through a handler's
//! open path) and dropped on `disconnect()`.

use std::sync::Mutex;
use std::time::Duration;

use crate::cache::KeyValueCache;
use crate::error::{Result, SatchelError};

/// Keyed cache over a single Redis connection.
pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
}

impl RedisCache {
    /// Create a cache for the given connection URL.
    ///
    /// The URL is validated here; the connection itself is not established
    /// until `connect()` or the first operation.
    pub fn from_url(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let mut guard = self.connection.lock().unwrap();
        if guard.is_none() {
            *guard = Some(self.client.get_connection()?);
        }
        match guard.as_mut() {
            Some(conn) => Ok(f(conn)?),
            None => Err(SatchelError::backend("redis connection unavailable")),
        }
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

impl KeyValueCache for RedisCache {
    fn connect(&self) -> bool {
        match self.with_connection(|_| Ok(())) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("redis connection failed: {}", err);
                false
            }
        }
    }

    fn disconnect(&self) {
        *self.connection.lock().unwrap() = None;
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_connection(|conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn get_and_touch(&self, key: &str, ttl: Duration) -> Result<Option<Vec<u8>>> {
        let secs = Self::ttl_secs(ttl);
        self.with_connection(|conn| {
            redis::cmd("GETEX").arg(key).arg("EX").arg(secs).query(conn)
        })
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let secs = Self::ttl_secs(ttl);
        self.with_connection(|conn| {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query(conn)
        })
    }

    fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let millis = Self::ttl_millis(ttl);
        let reply: Option<String> = self.with_connection(|conn| {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(millis)
                .query(conn)
        })?;
        Ok(reply.is_some())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed: i64 = self.with_connection(|conn| redis::cmd("DEL").arg(key).query(conn))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_accepts_valid_url() {
        assert!(RedisCache::from_url("redis://127.0.0.1:6379/0").is_ok());
    }

    #[test]
    fn test_from_url_rejects_invalid_url() {
        assert!(RedisCache::from_url("definitely not a url").is_err());
    }

    #[test]
    fn test_ttl_conversion_clamps_to_minimum() {
        assert_eq!(RedisCache::ttl_secs(Duration::from_millis(100)), 1);
        assert_eq!(RedisCache::ttl_secs(Duration::from_secs(30)), 30);
        assert_eq!(RedisCache::ttl_millis(Duration::ZERO), 1);
        assert_eq!(RedisCache::ttl_millis(Duration::from_millis(250)), 250);
    }
}
