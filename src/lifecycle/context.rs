//! Per-invocation execution context.

use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigStore, Settings};
use crate::error::ZerocutError;
use crate::materials::{AssetProbe, MaterialSynchronizer};
use crate::session::Session;
use crate::Result;

/// State threaded through dispatch, action and teardown of one command.
///
/// Holds at most one bound session.
pub struct ExecutionContext {
    store: ConfigStore,
    probe: Arc<dyn AssetProbe>,
    settings: Option<Settings>,
    session: Option<Session>,
}

impl ExecutionContext {
    /// Create a context with no session.
    pub fn new(store: ConfigStore, probe: Arc<dyn AssetProbe>) -> Self {
        Self {
            store,
            probe,
            settings: None,
            session: None,
        }
    }

    /// The invocation's config store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Record the validated settings.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = Some(settings);
    }

    /// Validated settings of a sandbox-backed invocation.
    pub fn settings(&self) -> Result<&Settings> {
        self.settings.as_ref().ok_or(ZerocutError::NoActiveSession)
    }

    /// Bind `session`; a session that is already bound stays and the new
    /// one is handed back.
    pub fn bind(&mut self, session: Session) -> std::result::Result<(), Session> {
        if self.session.is_some() {
            return Err(session);
        }
        self.session = Some(session);
        Ok(())
    }

    /// Take the bound session out, if any.
    pub fn unbind(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// The bound session.
    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(ZerocutError::NoActiveSession)
    }

    /// Synchronizer over the project's materials directory.
    pub fn synchronizer(&self) -> Result<MaterialSynchronizer<Arc<dyn AssetProbe>>> {
        let settings = self.settings()?;
        Ok(MaterialSynchronizer::new(
            settings.materials_dir(),
            Arc::clone(&self.probe),
        ))
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
