//! Configuration loading for satchel.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Config file (`~/.satchel/config.toml` or an explicit path)
//! 3. Defaults (lowest priority)
//!
//! All configuration is optional. The crate runs with sensible defaults
//! when no config exists. Connection parameters are read once at handler
//! construction and are immutable afterwards.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SatchelError};

/// Main configuration struct for satchel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Session lifecycle configuration.
    pub session: SessionConfig,
    /// Tenant tags stamped onto every relational row.
    pub store: StoreConfig,
    /// Keyed-cache (Redis) connection configuration.
    pub redis: RedisConfig,
    /// Relational (SQLite) configuration.
    pub sql: SqlConfig,
    /// Filesystem handler configuration.
    pub file: FileConfig,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the handler the pool resolves at start().
    pub handler: String,
    /// Session name (the cookie/storage key of the hosting application).
    pub name: String,
    /// Session lifetime in seconds; doubles as the backend TTL.
    pub lifetime_secs: u64,
    /// Prefix applied to every backend key.
    pub key_prefix: String,
}

impl SessionConfig {
    /// Session lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handler: "redis".to_string(),
            name: "SESSID".to_string(),
            lifetime_secs: 600,
            key_prefix: "session:".to_string(),
        }
    }
}

/// Tenant tags for multi-tenant relational storage.
///
/// Co-located tenants must never see each other's sessions under an ID
/// collision, so every row carries this pair and every query filters on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Store/tenant tag.
    pub store: String,
    /// Deployment environment tag.
    pub environment: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store: "default".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Keyed-cache connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
    /// Spin-lock tuning for the locking handler.
    pub lock: LockConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            lock: LockConfig::default(),
        }
    }
}

/// Spin-lock tuning parameters.
///
/// Injectable so tests can force both the acquired-first-try and the
/// exhausted-retries paths without real wall-clock delay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LockConfig {
    /// TTL of the lock key in milliseconds; bounds how long a crashed
    /// holder can wedge a session.
    pub ttl_millis: u64,
    /// Delay between acquisition attempts in milliseconds.
    pub retry_delay_millis: u64,
    /// Maximum acquisition attempts before the operation fails.
    pub max_attempts: u32,
}

impl LockConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_millis)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_millis: 10_000,
            retry_delay_millis: 10,
            max_attempts: 1_000,
        }
    }
}

/// Relational handler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SqlConfig {
    /// Database file path. Defaults to `<satchel home>/sessions.db`.
    pub path: Option<PathBuf>,
}

impl SqlConfig {
    /// Resolve the database path, falling back to the satchel home.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| satchel_home().join("sessions.db"))
    }
}

/// Filesystem handler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Directory where session files are stored.
    /// Defaults to `<satchel home>/sessions`.
    pub save_path: Option<PathBuf>,
}

impl FileConfig {
    /// Resolve the save directory, falling back to the satchel home.
    pub fn directory(&self) -> PathBuf {
        self.save_path
            .clone()
            .unwrap_or_else(|| satchel_home().join("sessions"))
    }
}

impl Config {
    /// Load configuration from the default location with env overrides.
    pub fn load() -> Self {
        let mut config = Self::load_user_config().unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from an explicit file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_user_config() -> Option<Config> {
        let path = satchel_home().join("config.toml");
        Self::load_from_file(&path).ok()
    }

    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| SatchelError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| SatchelError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SATCHEL_SESSION_HANDLER") {
            self.session.handler = val;
        }

        if let Ok(val) = env::var("SATCHEL_SESSION_NAME") {
            self.session.name = val;
        }

        if let Ok(val) = env::var("SATCHEL_SESSION_LIFETIME_SECS") {
            if let Ok(parsed) = val.parse::<u64>() {
                self.session.lifetime_secs = parsed;
            } else {
                tracing::warn!("Invalid SATCHEL_SESSION_LIFETIME_SECS value: {}", val);
            }
        }

        if let Ok(val) = env::var("SATCHEL_STORE") {
            self.store.store = val;
        }

        if let Ok(val) = env::var("SATCHEL_ENVIRONMENT") {
            self.store.environment = val;
        }

        if let Ok(val) = env::var("SATCHEL_REDIS_URL") {
            self.redis.url = val;
        }

        if let Ok(val) = env::var("SATCHEL_SQL_PATH") {
            self.sql.path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("SATCHEL_FILE_SAVE_PATH") {
            self.file.save_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("SATCHEL_LOCK_MAX_ATTEMPTS") {
            if let Ok(parsed) = val.parse::<u32>() {
                self.redis.lock.max_attempts = parsed;
            } else {
                tracing::warn!("Invalid SATCHEL_LOCK_MAX_ATTEMPTS value: {}", val);
            }
        }

        if let Ok(val) = env::var("SATCHEL_LOCK_RETRY_DELAY_MS") {
            if let Ok(parsed) = val.parse::<u64>() {
                self.redis.lock.retry_delay_millis = parsed;
            } else {
                tracing::warn!("Invalid SATCHEL_LOCK_RETRY_DELAY_MS value: {}", val);
            }
        }

        if let Ok(val) = env::var("SATCHEL_LOCK_TTL_MS") {
            if let Ok(parsed) = val.parse::<u64>() {
                self.redis.lock.ttl_millis = parsed;
            } else {
                tracing::warn!("Invalid SATCHEL_LOCK_TTL_MS value: {}", val);
            }
        }
    }
}

/// Get the satchel home directory.
///
/// Checks the `SATCHEL_HOME` environment variable first, then falls back
/// to `~/.satchel`, and finally to a temp-dir location for containerized
/// environments without a home directory.
pub fn satchel_home() -> PathBuf {
    if let Ok(home) = env::var("SATCHEL_HOME") {
        return PathBuf::from(home);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".satchel");
    }

    env::temp_dir().join("satchel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.handler, "redis");
        assert_eq!(config.session.lifetime_secs, 600);
        assert_eq!(config.session.key_prefix, "session:");
        assert_eq!(config.store.store, "default");
        assert_eq!(config.store.environment, "development");
        assert_eq!(config.redis.lock.max_attempts, 1_000);
    }

    #[test]
    fn test_lifetime_as_duration() {
        let config = Config::default();
        assert_eq!(config.session.lifetime(), Duration::from_secs(600));
        assert_eq!(config.redis.lock.ttl(), Duration::from_millis(10_000));
        assert_eq!(config.redis.lock.retry_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[session]
handler = "redis_locking"
lifetime_secs = 1200

[store]
store = "acme"
environment = "production"

[redis.lock]
max_attempts = 25
"#
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.session.handler, "redis_locking");
        assert_eq!(config.session.lifetime_secs, 1200);
        assert_eq!(config.store.store, "acme");
        assert_eq!(config.store.environment, "production");
        assert_eq!(config.redis.lock.max_attempts, 25);
        // Untouched sections keep defaults.
        assert_eq!(config.session.name, "SESSID");
        assert_eq!(config.redis.lock.retry_delay_millis, 10);
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not [valid toml").unwrap();
        let result = Config::load_from(&path);
        assert!(matches!(result, Err(SatchelError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("SATCHEL_SESSION_HANDLER", "sql");
        env::set_var("SATCHEL_SESSION_LIFETIME_SECS", "90");
        env::set_var("SATCHEL_STORE", "acme");
        env::set_var("SATCHEL_LOCK_MAX_ATTEMPTS", "3");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.session.handler, "sql");
        assert_eq!(config.session.lifetime_secs, 90);
        assert_eq!(config.store.store, "acme");
        assert_eq!(config.redis.lock.max_attempts, 3);

        env::remove_var("SATCHEL_SESSION_HANDLER");
        env::remove_var("SATCHEL_SESSION_LIFETIME_SECS");
        env::remove_var("SATCHEL_STORE");
        env::remove_var("SATCHEL_LOCK_MAX_ATTEMPTS");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_number_ignored() {
        env::set_var("SATCHEL_SESSION_LIFETIME_SECS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.session.lifetime_secs, 600);

        env::remove_var("SATCHEL_SESSION_LIFETIME_SECS");
    }

    #[test]
    #[serial]
    fn test_satchel_home_env_override() {
        env::set_var("SATCHEL_HOME", "/tmp/custom-satchel");
        assert_eq!(satchel_home(), PathBuf::from("/tmp/custom-satchel"));
        env::remove_var("SATCHEL_HOME");
    }

    #[test]
    fn test_sql_path_fallback() {
        let config = SqlConfig::default();
        assert!(config.database_path().ends_with("sessions.db"));

        let custom = SqlConfig {
            path: Some(PathBuf::from("/data/s.db")),
        };
        assert_eq!(custom.database_path(), PathBuf::from("/data/s.db"));
    }

    #[test]
    fn test_config_roundtrip_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
