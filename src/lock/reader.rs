//! Read-only lock inspection.

use std::sync::Arc;

use crate::cache::KeyValueCache;
use crate::error::Result;
use crate::lock::LockKeys;

/// Inspects the current holder of a session lock.
///
/// Administrative tooling reads the holder token before deciding whether
/// a force-release is safe; absence of a lock record means the session
/// is unlocked.
pub struct LockReader {
    cache: Arc<dyn KeyValueCache>,
    keys: LockKeys,
}

impl LockReader {
    pub fn new(cache: Arc<dyn KeyValueCache>, keys: LockKeys) -> Self {
        Self { cache, keys }
    }

    /// The token of the current lock holder, or `None` when unlocked.
    pub fn current_holder(&self, session_id: &str) -> Result<Option<String>> {
        let raw = self.cache.get(&self.keys.lock_key(session_id))?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}
