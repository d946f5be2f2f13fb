//! Handler-backed session storage.
//!
//! The façade request handlers use: resolves the configured handler from
//! the pool at start, hydrates bag namespaces from the stored payload,
//! and writes them back on save. One instance serves one logical request.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, SatchelError};
use crate::handler::{HandlerPool, SessionHandler};
use crate::session::{
    generate_session_id, AttributeBag, MetadataBag, Namespace, SessionContext, SessionStorage,
};

/// Session storage over a named handler from the pool.
pub struct PooledSessionStorage {
    context: SessionContext,
    pool: Arc<HandlerPool>,
    handler_name: String,
    save_path: String,
    handler: Option<Arc<dyn SessionHandler>>,
}

impl PooledSessionStorage {
    /// Create a storage using the configured handler name.
    pub fn new(pool: Arc<HandlerPool>, config: &Config) -> Self {
        Self {
            context: SessionContext::new(&config.session.name),
            pool,
            handler_name: config.session.handler.clone(),
            save_path: config.file.directory().to_string_lossy().into_owned(),
            handler: None,
        }
    }

    /// Override the handler name resolved at start.
    pub fn with_handler_name(mut self, name: impl Into<String>) -> Self {
        self.handler_name = name.into();
        self
    }

    fn open_handler(&mut self) -> Result<Arc<dyn SessionHandler>> {
        if let Some(handler) = &self.handler {
            return Ok(Arc::clone(handler));
        }

        let handler = self.pool.resolve(&self.handler_name)?;
        if !handler.open(&self.save_path, &self.context.session.name) {
            return Err(SatchelError::backend(format!(
                "could not open session handler '{}'",
                self.handler_name
            )));
        }
        self.handler = Some(Arc::clone(&handler));
        Ok(handler)
    }
}

impl SessionStorage for PooledSessionStorage {
    fn start(&mut self) -> Result<bool> {
        if self.context.session.started {
            return Ok(true);
        }

        if self.context.session.id.is_empty() {
            self.context.session.id = generate_session_id();
        }

        let handler = self.open_handler()?;
        let payload = handler.read(&self.context.session.id)?;
        if !payload.is_empty() {
            let data: HashMap<String, Namespace> = serde_json::from_slice(&payload)?;
            self.context.session.data = data;
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

    fn regenerate(&mut self, destroy: bool, lifetime: Option<i64>) -> Result<bool> {
        if !self.context.session.started {
            self.start()?;
        }

        if destroy {
            // Old-id cleanup is explicit: without it the superseded record
            // would linger until backend expiry.
            let old_id = self.context.session.id.clone();
            let handler = self.open_handler()?;
            handler.destroy(&old_id)?;
        }

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

        let data = self.context.collect_namespaces();
        let payload = serde_json::to_vec(&data)?;
        self.context.session.data = data;

        let handler = self.open_handler()?;
        let written = handler.write(&self.context.session.id, &payload)?;
        if !written {
            return Err(SatchelError::backend("session handler rejected the write"));
        }

        // Ready to be started again.
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
