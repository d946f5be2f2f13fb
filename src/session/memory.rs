//! In-memory session storage.
//!
//! Degenerate storage for surfaces that need session semantics without a
//! durable backend (stateless API requests): the full lifecycle works,
//! but nothing survives past the storage instance.

use std::collections::HashMap;

use crate::error::{Result, SatchelError};
use crate::session::{
    generate_session_id, AttributeBag, MetadataBag, Namespace, SessionContext, SessionStorage,
};

/// Session storage with no backend.
pub struct MemorySessionStorage {
    context: SessionContext,
}

impl MemorySessionStorage {
    pub fn new(session_name: &str) -> Self {
        Self {
            context: SessionContext::new(session_name),
        }
    }

    /// Seed the session data map before start, e.g. from a request body.
    pub fn set_session_data(&mut self, data: HashMap<String, Namespace>) {
        self.context.session.data = data;
    }
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new("SESSID")
    }
}

impl SessionStorage for MemorySessionStorage {
    fn start(&mut self) -> Result<bool> {
        if self.context.session.started {
            return Ok(true);
        }

        if self.context.session.id.is_empty() {
            self.context.session.id = generate_session_id();
        }

        self.context.load_namespaces();

        Ok(true)
    }

    fn is_started(&self) -> bool {
        self.context.session.started
    }

    fn id(&self) -> &str {
        &self.context.session.id
    }

    fn set_id(&mut self, id: &str) -> Result<()> {
        if self.context.session.started {
            return Err(SatchelError::invalid_state(
                "cannot set session ID after the session has started",
            ));
        }
        self.context.session.id = id.to_string();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.context.session.name
    }

    fn set_name(&mut self, name: &str) {
        self.context.session.name = name.to_string();
    }

    fn regenerate(&mut self, _destroy: bool, lifetime: Option<i64>) -> Result<bool> {
        if !self.context.session.started {
            self.start()?;
        }

        // No backend record to destroy; re-stamp and rotate the id.
        self.context.metadata.stamp_new(lifetime);
        self.context.session.id = generate_session_id();

        Ok(true)
    }

    fn save(&mut self) -> Result<()> {
        if !self.context.session.started || self.context.session.closed {
            return Err(SatchelError::invalid_state(
                "cannot save a session that was not started or was already closed",
            ));
        }

        self.context.session.data = self.context.collect_namespaces();
        self.context.session.started = false;
        self.context.session.closed = false;

        Ok(())
    }

    fn clear(&mut self) {
        self.context.clear();
    }

    fn register_bag(&mut self, bag: AttributeBag) {
        self.context.register_bag(bag);
    }

    fn bag(&mut self, name: &str) -> Result<&mut AttributeBag> {
        if !self.context.session.started {
            self.start()?;
        }
        self.context
            .bag_mut(name)
            .ok_or_else(|| SatchelError::invalid_state(format!("bag '{}' is not registered", name)))
    }

    fn metadata_bag(&self) -> &MetadataBag {
        &self.context.metadata
    }
}
