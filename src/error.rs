//! Unified error types for satchel.
//!
//! The error taxonomy separates configuration errors (unknown handler name),
//! capability mismatches (lock release on a non-locking handler), transient
//! store errors (propagated, never retried here), and protocol violations
//! (saving a session that was never started). Lock acquisition contention
//! gets its own variant so callers can tell liveness failures apart from
//! store faults.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for satchel operations.
#[derive(Error, Debug)]
pub enum SatchelError {
    /// I/O errors from file-backed session storage.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backend store errors (connection, query, or command failures).
    #[error("backend error: {message}")]
    Backend { message: String },

    /// JSON payload serialization/deserialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Session lifecycle violations (save before start, late set_id).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// No handler registered under the requested name.
    #[error("unknown session handler: {name}")]
    UnknownHandler { name: String },

    /// The named handler does not support session locking.
    #[error("session handler does not support locking: {name}")]
    NotALockingHandler { name: String },

    /// Spin lock gave up after exhausting its retry budget.
    #[error("could not acquire lock for {key} after {attempts} attempts")]
    LockContended { key: String, attempts: u32 },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for satchel operations.
pub type Result<T> = std::result::Result<T, SatchelError>;

impl SatchelError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an unknown handler error.
    pub fn unknown_handler(name: impl Into<String>) -> Self {
        Self::UnknownHandler { name: name.into() }
    }

    /// Create a not-a-locking-handler error.
    pub fn not_a_locking_handler(name: impl Into<String>) -> Self {
        Self::NotALockingHandler { name: name.into() }
    }

    /// Create a lock contention error.
    pub fn lock_contended(key: impl Into<String>, attempts: u32) -> Self {
        Self::LockContended {
            key: key.into(),
            attempts,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error marks a capability mismatch rather than a fault.
    ///
    /// Administrative tooling uses this to report "unsupported for this
    /// backend" distinctly from "backend misconfigured or unreachable".
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::NotALockingHandler { .. })
    }
}

impl From<io::Error> for SatchelError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SatchelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for SatchelError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for SatchelError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the satchel CLI.
///
/// Operators scripting lock recovery need to distinguish "the configured
/// backend does not support this operation" from ordinary failures.
pub mod exit_codes {
    /// Operation completed.
    pub const OK: i32 = 0;

    /// Operation failed.
    pub const ERROR: i32 = 1;

    /// Operation is not supported by the configured handler.
    pub const UNSUPPORTED: i32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = SatchelError::storage(
            "/tmp/sessions",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/sessions"));
    }

    #[test]
    fn test_backend_error_display() {
        let err = SatchelError::backend("connection refused");
        assert_eq!(err.to_string(), "backend error: connection refused");
    }

    #[test]
    fn test_unknown_handler_display() {
        let err = SatchelError::unknown_handler("memcached");
        assert_eq!(err.to_string(), "unknown session handler: memcached");
    }

    #[test]
    fn test_not_a_locking_handler_display() {
        let err = SatchelError::not_a_locking_handler("sql");
        assert_eq!(
            err.to_string(),
            "session handler does not support locking: sql"
        );
    }

    #[test]
    fn test_lock_contended_display() {
        let err = SatchelError::lock_contended("session:abc:lock", 30);
        assert!(err.to_string().contains("session:abc:lock"));
        assert!(err.to_string().contains("30 attempts"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = SatchelError::invalid_state("session already started");
        assert!(err.to_string().contains("invalid state"));
    }

    #[test]
    fn test_is_unsupported() {
        assert!(SatchelError::not_a_locking_handler("sql").is_unsupported());
        assert!(!SatchelError::unknown_handler("sql").is_unsupported());
        assert!(!SatchelError::backend("boom").is_unsupported());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: SatchelError = io_err.into();
        assert!(matches!(err, SatchelError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SatchelError = json_err.into();
        assert!(matches!(err, SatchelError::Serde { .. }));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::OK, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::UNSUPPORTED, 2);
    }
}
