//! Relational session handler over SQLite.
//!
//! The handler bootstraps its own schema on open. Expiry is relative to
//! the last update and evaluated at read time against the stored
//! timestamps; there is no background sweep, so `garbage_collect` prunes
//! rows whose last update is older than the given lifetime.
//!
//! Every row carries the deployment's store/environment pair and every
//! query filters on it, so co-located tenants never see each other's
//! sessions under an id collision.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::error::{Result, SatchelError};
use crate::handler::SessionHandler;
use crate::metrics::{names, timed, MetricsRecorder, TracingRecorder};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    "key" TEXT NOT NULL UNIQUE,
    value BLOB NOT NULL,
    store TEXT NOT NULL DEFAULT '',
    environment TEXT NOT NULL DEFAULT '',
    expires INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

enum Location {
    Disk(PathBuf),
    Memory,
}

/// Relational session handler.
pub struct SqlHandler {
    location: Location,
    store: String,
    environment: String,
    key_prefix: String,
    lifetime: Duration,
    connection: Mutex<Option<Connection>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SqlHandler {
    /// Create a handler from configuration. The connection is established
    /// on `open()`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            location: Location::Disk(config.sql.database_path()),
            store: config.store.store.clone(),
            environment: config.store.environment.clone(),
            key_prefix: config.session.key_prefix.clone(),
            lifetime: config.session.lifetime(),
            connection: Mutex::new(None),
            metrics: Arc::new(TracingRecorder),
        }
    }

    /// Create a handler over an in-memory database.
    ///
    /// Data lives only as long as the connection; meant for tests and
    /// ephemeral use.
    pub fn in_memory(store: &str, environment: &str, lifetime: Duration) -> Self {
        Self {
            location: Location::Memory,
            store: store.to_string(),
            environment: environment.to_string(),
            key_prefix: "session:".to_string(),
            lifetime,
            connection: Mutex::new(None),
            metrics: Arc::new(TracingRecorder),
        }
    }

    /// Replace the metrics recorder.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    fn establish(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::Disk(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| SatchelError::storage(parent, e))?;
                }
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };
        conn.execute(SCHEMA, [])?;
        Ok(conn)
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.connection.lock().unwrap();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(SatchelError::backend("sql session handler is not open")),
        }
    }

    /// Shift a row's stamps into the past. Test hook for expiry checks.
    #[cfg(test)]
    fn backdate(&self, session_id: &str, secs: i64) {
        let key = self.key(session_id);
        self.with_connection(|conn| {
            conn.execute(
                r#"UPDATE sessions SET updated_at = updated_at - ?1, expires = expires - ?1 WHERE "key" = ?2"#,
                params![secs, key],
            )?;
            Ok(())
        })
        .unwrap();
    }
}

impl SessionHandler for SqlHandler {
    fn open(&self, _save_path: &str, _session_name: &str) -> bool {
        let mut guard = self.connection.lock().unwrap();
        if guard.is_some() {
            return true;
        }

        match self.establish() {
            Ok(conn) => {
                *guard = Some(conn);
                true
            }
            Err(err) => {
                tracing::warn!("could not open sql session store: {}", err);
                false
            }
        }
    }

    fn close(&self) -> bool {
        *self.connection.lock().unwrap() = None;
        true
    }

    fn read(&self, session_id: &str) -> Result<Vec<u8>> {
        let key = self.key(session_id);
        let now = Utc::now().timestamp();
        let lifetime = self.lifetime.as_secs() as i64;

        timed(self.metrics.as_ref(), names::SQL_READ_TIME, || {
            self.with_connection(|conn| {
                let value = conn
                    .query_row(
                        r#"SELECT value FROM sessions
                           WHERE "key" = ?1 AND store = ?2 AND environment = ?3
                             AND updated_at + ?4 > ?5
                           LIMIT 1"#,
                        params![key, self.store, self.environment, lifetime, now],
                        |row| row.get::<_, Vec<u8>>(0),
                    )
                    .optional()?;
                Ok(value.unwrap_or_default())
            })
        })
    }

    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool> {
        if payload.is_empty() {
            return Ok(false);
        }

        let key = self.key(session_id);
        let now = Utc::now().timestamp();
        let expires = now + self.lifetime.as_secs() as i64;

        timed(self.metrics.as_ref(), names::SQL_WRITE_TIME, || {
            self.with_connection(|conn| {
                conn.execute(
                    r#"REPLACE INTO sessions ("key", value, store, environment, expires, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                    params![key, payload, self.store, self.environment, expires, now],
                )?;
                Ok(true)
            })
        })
    }

    fn destroy(&self, session_id: &str) -> Result<bool> {
        let key = self.key(session_id);

        timed(self.metrics.as_ref(), names::SQL_DELETE_TIME, || {
            self.with_connection(|conn| {
                conn.execute(r#"DELETE FROM sessions WHERE "key" = ?1"#, params![key])?;
                Ok(true)
            })
        })
    }

    fn garbage_collect(&self, max_lifetime: Duration) -> Result<bool> {
        let now = Utc::now().timestamp();
        let lifetime = max_lifetime.as_secs() as i64;

        self.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE updated_at + ?1 <= ?2",
                params![lifetime, now],
            )?;
            if removed > 0 {
                tracing::debug!(removed, "swept expired sql sessions");
            }
            Ok(true)
        })
    }
}
