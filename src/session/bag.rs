//! Session bags: named, independently-clearable partitions of session data.
//!
//! Each bag owns one namespace of the session's data map, keyed by its
//! storage key. The attribute bag is the general-purpose variant; the
//! metadata bag tracks creation/last-used stamps and the lifetime marker
//! used by regenerate.

use chrono::Utc;
use serde_json::Value;

/// One bag's slice of the session data map.
pub type Namespace = serde_json::Map<String, Value>;

/// Capability set shared by all bag variants.
pub trait SessionBag: Send {
    /// Registry name of the bag.
    fn name(&self) -> &str;

    /// Key of the bag's namespace inside the session data map.
    fn storage_key(&self) -> &str;

    /// Adopt the namespace hydrated from the backend.
    fn initialize(&mut self, data: Namespace);

    /// Export the bag's current contents for persistence.
    fn export(&self) -> Namespace;

    /// Drop the bag's in-memory contents.
    fn clear(&mut self);
}

/// General-purpose attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBag {
    name: String,
    storage_key: String,
    attributes: Namespace,
}

impl AttributeBag {
    pub fn new(name: impl Into<String>, storage_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_key: storage_key.into(),
            attributes: Namespace::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// All attributes in the bag.
    pub fn all(&self) -> &Namespace {
        &self.attributes
    }

    /// Replace the full attribute set.
    pub fn replace(&mut self, attributes: Namespace) {
        self.attributes = attributes;
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl SessionBag for AttributeBag {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn initialize(&mut self, data: Namespace) {
        self.attributes = data;
    }

    fn export(&self) -> Namespace {
        self.attributes.clone()
    }

    fn clear(&mut self) {
        self.attributes.clear();
    }
}

const META_CREATED: &str = "created";
const META_LAST_USED: &str = "last_used";
const META_LIFETIME: &str = "lifetime";

/// Bag tracking session creation/last-used timestamps and the lifetime
/// stamp used by regenerate.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBag {
    storage_key: String,
    created: i64,
    last_used: i64,
    lifetime: i64,
}

impl MetadataBag {
    pub fn new() -> Self {
        Self {
            storage_key: "_meta".to_string(),
            created: 0,
            last_used: 0,
            lifetime: 0,
        }
    }

    /// Unix timestamp of session creation.
    pub fn created(&self) -> i64 {
        self.created
    }

    /// Unix timestamp of the previous session use.
    pub fn last_used(&self) -> i64 {
        self.last_used
    }

    /// Lifetime stamp in seconds.
    pub fn lifetime(&self) -> i64 {
        self.lifetime
    }

    /// Re-stamp the bag as a brand new session.
    ///
    /// Used by regenerate: creation and last-used move to now, and the
    /// lifetime stamp is replaced when one is given.
    pub fn stamp_new(&mut self, lifetime: Option<i64>) {
        let now = Utc::now().timestamp();
        self.created = now;
        self.last_used = now;
        if let Some(lifetime) = lifetime {
            self.lifetime = lifetime;
        }
    }
}

impl Default for MetadataBag {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBag for MetadataBag {
    fn name(&self) -> &str {
        "metadata"
    }

    fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn initialize(&mut self, data: Namespace) {
        let now = Utc::now().timestamp();
        self.created = data
            .get(META_CREATED)
            .and_then(Value::as_i64)
            .unwrap_or(now);
        // The stored last-used stamp is the previous use; this call is
        // the current one.
        self.last_used = now;
        self.lifetime = data
            .get(META_LIFETIME)
            .and_then(Value::as_i64)
            .unwrap_or(self.lifetime);
    }

    fn export(&self) -> Namespace {
        let mut data = Namespace::new();
        data.insert(META_CREATED.to_string(), self.created.into());
        data.insert(META_LAST_USED.to_string(), self.last_used.into());
        data.insert(META_LIFETIME.to_string(), self.lifetime.into());
        data
    }

    fn clear(&mut self) {
        self.created = 0;
        self.last_used = 0;
        self.lifetime = 0;
    }
}
