//! Session values and the storage façade used by request handlers.
//!
//! A session is created per logical request, hydrated by `start()`,
//! mutated through bag accessors, and persisted by `save()`. The storage
//! itself holds no cross-request state: the bag registry and metadata live
//! in an explicit per-storage context, never in process-wide statics.

pub mod bag;
pub mod memory;
pub mod storage;

pub use bag::{AttributeBag, MetadataBag, Namespace, SessionBag};
pub use memory::MemorySessionStorage;
pub use storage::PooledSessionStorage;

use std::collections::HashMap;

use crate::error::Result;

/// A single session value.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Opaque session id token.
    pub id: String,
    /// Session name (the cookie/storage key of the hosting application).
    pub name: String,
    /// Whether the session has been started (hydrated).
    pub started: bool,
    /// Whether the session has been closed.
    pub closed: bool,
    /// Bag storage key → that bag's namespace.
    pub data: HashMap<String, Namespace>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Generate a fresh opaque session id.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Façade contract for session storages.
///
/// State machine over one session value:
/// unstarted → started → saved(→unstarted) / cleared(→started).
pub trait SessionStorage {
    /// Hydrate the session. Idempotent when already started.
    fn start(&mut self) -> Result<bool>;

    fn is_started(&self) -> bool;

    fn id(&self) -> &str;

    /// Fix the session id. Fails once the session has started; the id
    /// must be set before hydration.
    fn set_id(&mut self, id: &str) -> Result<()>;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// Re-stamp the metadata bag and assign a fresh id. With `destroy`
    /// set, the old backend record is removed.
    fn regenerate(&mut self, destroy: bool, lifetime: Option<i64>) -> Result<bool>;

    /// Persist the serialized bag namespaces. Fails when the session was
    /// never started or was already closed.
    fn save(&mut self) -> Result<()>;

    /// Clear every bag's in-memory content and re-hydrate the namespaces
    /// from the now-empty data map. A structural reset, not a backend
    /// destroy.
    fn clear(&mut self);

    /// Register a bag. A later registration under the same name replaces
    /// the earlier one.
    fn register_bag(&mut self, bag: AttributeBag);

    /// Access a registered bag, starting the session if necessary.
    fn bag(&mut self, name: &str) -> Result<&mut AttributeBag>;

    /// The metadata bag.
    fn metadata_bag(&self) -> &MetadataBag;
}

/// Bag registry and metadata for one storage instance.
pub(crate) struct SessionContext {
    pub session: Session,
    bags: HashMap<String, AttributeBag>,
    pub metadata: MetadataBag,
}

impl SessionContext {
    pub fn new(session_name: &str) -> Self {
        Self {
            session: Session::new(session_name),
            bags: HashMap::new(),
            metadata: MetadataBag::new(),
        }
    }

    pub fn register_bag(&mut self, bag: AttributeBag) {
        self.bags.insert(bag.name().to_string(), bag);
    }

    pub fn bag_mut(&mut self, name: &str) -> Option<&mut AttributeBag> {
        self.bags.get_mut(name)
    }

    /// Hand each bag its namespace from the session data map and mark the
    /// session started. Afterwards the data map holds a namespace for
    /// every registered bag plus the metadata bag.
    pub fn load_namespaces(&mut self) {
        for bag in self.bags.values_mut() {
            let namespace = self
                .session
                .data
                .remove(bag.storage_key())
                .unwrap_or_default();
            bag.initialize(namespace);
        }
        let meta = self
            .session
            .data
            .remove(self.metadata.storage_key())
            .unwrap_or_default();
        self.metadata.initialize(meta);

        self.session.data = self.collect_namespaces();
        self.session.started = true;
        self.session.closed = false;
    }

    /// Export every bag's namespace keyed by storage key.
    pub fn collect_namespaces(&self) -> HashMap<String, Namespace> {
        let mut data = HashMap::new();
        for bag in self.bags.values() {
            data.insert(bag.storage_key().to_string(), bag.export());
        }
        data.insert(self.metadata.storage_key().to_string(), self.metadata.export());
        data
    }

    /// Clear every bag and rebuild the namespaces from scratch.
    pub fn clear(&mut self) {
        for bag in self.bags.values_mut() {
            bag.clear();
        }
        self.metadata.clear();
        self.session.data.clear();
        self.load_namespaces();
    }
}
