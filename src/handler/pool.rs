//! Name-indexed session handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, SatchelError};
use crate::handler::{
    CacheHandler, LockingCacheHandler, SessionHandler, SqlHandler, HANDLER_REDIS,
    HANDLER_REDIS_LOCKING, HANDLER_SQL,
};

/// Registry resolving a configured handler name to an instance.
///
/// Registration completes at construction; the registry is immutable
/// afterwards, so `resolve` needs no further synchronization.
///
/// Construction policy: with zero external registrations the pool
/// auto-registers the default set (relational, keyed-cache,
/// keyed-cache-locking) under their canonical names. Any external
/// registration fully replaces the defaults; the two sets never merge.
/// Duplicate registrations for one name are allowed and the last wins.
pub struct HandlerPool {
    handlers: HashMap<String, Arc<dyn SessionHandler>>,
}

impl HandlerPool {
    /// Build a pool from explicit registrations, falling back to the
    /// default set when none are supplied.
    pub fn new(
        config: &Config,
        registrations: Vec<(String, Arc<dyn SessionHandler>)>,
    ) -> Result<Self> {
        let mut handlers: HashMap<String, Arc<dyn SessionHandler>> = HashMap::new();

        if registrations.is_empty() {
            handlers.insert(
                HANDLER_SQL.to_string(),
                Arc::new(SqlHandler::from_config(config)),
            );
            handlers.insert(
                HANDLER_REDIS.to_string(),
                Arc::new(CacheHandler::from_config(config)?),
            );
            handlers.insert(
                HANDLER_REDIS_LOCKING.to_string(),
                Arc::new(LockingCacheHandler::from_config(config)?),
            );
        } else {
            for (name, handler) in registrations {
                handlers.insert(name, handler);
            }
        }

        Ok(Self { handlers })
    }

    /// Resolve a handler by its registered name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn SessionHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| SatchelError::unknown_handler(name))
    }

    /// Whether a handler is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered handler names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MemoryHandler;
    use std::time::Duration;

    fn memory_handler() -> Arc<dyn SessionHandler> {
        Arc::new(MemoryHandler::new("session:", Duration::from_secs(60)))
    }

    #[test]
    fn test_empty_registrations_fall_back_to_defaults() {
        let pool = HandlerPool::new(&Config::default(), vec![]).unwrap();

        assert!(pool.resolve(HANDLER_SQL).is_ok());
        assert!(pool.resolve(HANDLER_REDIS).is_ok());
        assert!(pool.resolve(HANDLER_REDIS_LOCKING).is_ok());
        assert_eq!(pool.names(), vec!["redis", "redis_locking", "sql"]);
    }

    #[test]
    fn test_external_registrations_suppress_defaults() {
        let pool = HandlerPool::new(
            &Config::default(),
            vec![("custom".to_string(), memory_handler())],
        )
        .unwrap();

        assert!(pool.resolve("custom").is_ok());
        for default_name in [HANDLER_SQL, HANDLER_REDIS, HANDLER_REDIS_LOCKING] {
            assert!(
                matches!(
                    pool.resolve(default_name),
                    Err(SatchelError::UnknownHandler { .. })
                ),
                "default {} must not be registered",
                default_name
            );
        }
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let pool = HandlerPool::new(&Config::default(), vec![]).unwrap();

        let err = pool.resolve("memcached").unwrap_err();
        match err {
            SatchelError::UnknownHandler { name } => assert_eq!(name, "memcached"),
            other => panic!("expected UnknownHandler, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let first = memory_handler();
        let second = Arc::new(MemoryHandler::new("session:", Duration::from_secs(60)));
        second.write("probe", b"second").unwrap();

        let pool = HandlerPool::new(
            &Config::default(),
            vec![
                ("memory".to_string(), first),
                ("memory".to_string(), second as Arc<dyn SessionHandler>),
            ],
        )
        .unwrap();

        let resolved = pool.resolve("memory").unwrap();
        assert_eq!(resolved.read("probe").unwrap(), b"second");
    }

    #[test]
    fn test_contains() {
        let pool = HandlerPool::new(
            &Config::default(),
            vec![("custom".to_string(), memory_handler())],
        )
        .unwrap();

        assert!(pool.contains("custom"));
        assert!(!pool.contains(HANDLER_SQL));
    }
}
