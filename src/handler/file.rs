//! Filesystem session handler.
//!
//! Sessions are stored one file per id under the save path. Writes are
//! atomic via the temp file + rename pattern. The filesystem has no native
//! TTL, so expiry is enforced at read time against the file's mtime and
//! `garbage_collect` performs a real sweep.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use crate::error::{Result, SatchelError};
use crate::handler::SessionHandler;

/// Session handler over a directory of session files.
pub struct FileHandler {
    save_path: RwLock<PathBuf>,
    lifetime: Duration,
}

impl FileHandler {
    pub fn new(save_path: impl Into<PathBuf>, lifetime: Duration) -> Self {
        Self {
            save_path: RwLock::new(save_path.into()),
            lifetime,
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.save_path
            .read()
            .unwrap()
            .join(format!("sess_{}", session_id))
    }

    fn temp_path(&self, session_id: &str) -> PathBuf {
        self.save_path
            .read()
            .unwrap()
            .join(format!(".sess_{}.tmp", session_id))
    }

    fn is_expired(mtime: SystemTime, lifetime: Duration) -> bool {
        match mtime.elapsed() {
            Ok(age) => age > lifetime,
            // Clock skew put the mtime in the future; treat as fresh.
            Err(_) => false,
        }
    }

    fn atomic_write(&self, session_id: &str, payload: &[u8]) -> Result<()> {
        let final_path = self.session_path(session_id);
        let temp_path = self.temp_path(session_id);

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| SatchelError::storage(&temp_path, e))?;
            file.write_all(payload)
                .map_err(|e| SatchelError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| SatchelError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| SatchelError::storage(&final_path, e))?;

        Ok(())
    }
}

impl SessionHandler for FileHandler {
    fn open(&self, save_path: &str, _session_name: &str) -> bool {
        if !save_path.is_empty() {
            *self.save_path.write().unwrap() = PathBuf::from(save_path);
        }

        let dir = self.save_path.read().unwrap().clone();
        match fs::create_dir_all(&dir) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("could not create session directory {:?}: {}", dir, err);
                false
            }
        }
    }

    fn close(&self) -> bool {
        true
    }

    fn read(&self, session_id: &str) -> Result<Vec<u8>> {
        let path = self.session_path(session_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let metadata = fs::metadata(&path).map_err(|e| SatchelError::storage(&path, e))?;
        if let Ok(mtime) = metadata.modified() {
            if Self::is_expired(mtime, self.lifetime) {
                let _ = fs::remove_file(&path);
                return Ok(Vec::new());
            }
        }

        fs::read(&path).map_err(|e| SatchelError::storage(&path, e))
    }

    fn write(&self, session_id: &str, payload: &[u8]) -> Result<bool> {
        if payload.is_empty() {
            return Ok(false);
        }
        self.atomic_write(session_id, payload)?;
        Ok(true)
    }

    fn destroy(&self, session_id: &str) -> Result<bool> {
        let path = self.session_path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(SatchelError::storage(&path, err)),
        }
    }

    fn garbage_collect(&self, max_lifetime: Duration) -> Result<bool> {
        let dir = self.save_path.read().unwrap().clone();
        if !dir.exists() {
            return Ok(true);
        }

        let entries = fs::read_dir(&dir).map_err(|e| SatchelError::storage(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SatchelError::storage(&dir, e))?;
            let path = entry.path();

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("sess_") && !name.starts_with(".sess_") {
                continue;
            }

            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|mtime| Self::is_expired(mtime, max_lifetime))
                .unwrap_or(false);
            if expired {
                if let Err(err) = fs::remove_file(&path) {
                    tracing::warn!("could not remove expired session {:?}: {}", path, err);
                }
            }
        }

        Ok(true)
    }
}
