//! Sandbox session acquisition and release.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    Credential, LaunchOptions, Progress, SandboxConnector, SandboxHandle, RECONNECT_TIMEOUT,
};
use crate::config::{ConfigStore, Region, KEY_API_KEY, KEY_REGION, KEY_SANDBOX_ID};
use crate::error::ZerocutError;
use crate::Result;

/// How a session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Reattached to the persisted sandbox.
    Reconnected,
    /// A new sandbox was started.
    Launched,
}

/// A live sandbox session owned by one invocation.
pub struct Session {
    handle: Box<dyn SandboxHandle>,
    region: Region,
    origin: SessionOrigin,
}

impl Session {
    /// Wrap an open sandbox handle.
    pub fn new(handle: Box<dyn SandboxHandle>, region: Region, origin: SessionOrigin) -> Self {
        Self {
            handle,
            region,
            origin,
        }
    }

    /// Sandbox identifier.
    pub fn sandbox_id(&self) -> &str {
        self.handle.sandbox_id()
    }

    /// Terminal identifier namespacing this session's files.
    pub fn terminal_id(&self) -> &str {
        self.handle.terminal_id()
    }

    /// Region the session was opened in.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Whether the session was reconnected or launched.
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Public URL for `path` inside the sandbox.
    pub fn url(&self, path: &str) -> String {
        self.handle.url(path)
    }

    /// Copy a local file into the sandbox.
    pub async fn upload(&self, local: &Path, remote_path: &str) -> Result<()> {
        self.handle.upload(local, remote_path).await
    }

    /// Call a generation endpoint.
    pub async fn invoke(
        &self,
        operation: &str,
        params: Value,
        progress: Progress<'_>,
    ) -> Result<Value> {
        self.handle.invoke(operation, params, progress).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sandbox_id", &self.sandbox_id())
            .field("terminal_id", &self.terminal_id())
            .field("region", &self.region)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Obtains and releases sandbox sessions, persisting the sandbox id.
pub struct SessionManager<C> {
    store: ConfigStore,
    connector: C,
}

impl<C: SandboxConnector> SessionManager<C> {
    /// Create a manager over `store` using `connector` for remote calls.
    pub fn new(store: ConfigStore, connector: C) -> Self {
        Self { store, connector }
    }

    /// The config store the manager persists into.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Reconnect to the persisted sandbox or launch a new one.
    ///
    /// Fails with [`ZerocutError::Credential`] before any network call when
    /// no API key is configured. A failed reconnect is not an error: a new
    /// sandbox is launched and its id replaces the persisted one.
    pub async fn acquire(&self) -> Result<Session> {
        let api_key = self
            .store
            .get_string(KEY_API_KEY)
            .await?
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ZerocutError::Credential("apiKey is not set".into()))?;
        let stored = self.store.get(KEY_REGION).await?;
        let region = Region::from_value(stored.as_ref()).unwrap_or_default();
        let credential = Credential::for_region(&api_key, region);

        let persisted = self
            .store
            .get_string(KEY_SANDBOX_ID)
            .await?
            .filter(|id| !id.is_empty());

        if let Some(id) = persisted {
            match self.connector.connect(&credential, &id, RECONNECT_TIMEOUT).await {
                Ok(handle) => {
                    info!(sandbox_id = %id, %region, "reconnected to sandbox");
                    return Ok(Session::new(handle, region, SessionOrigin::Reconnected));
                }
                Err(e) => {
                    debug!(
                        sandbox_id = %id,
                        error = %e,
                        "reconnect failed, launching a new sandbox"
                    );
                }
            }
        }

        let handle = self
            .connector
            .launch(&credential, LaunchOptions::new(region))
            .await?;
        let id = handle.sandbox_id().to_string();

        if let Err(e) = self.store.set(KEY_SANDBOX_ID, id.as_str()).await {
            close_quietly(handle).await;
            return Err(e);
        }

        info!(sandbox_id = %id, %region, "launched sandbox");
        Ok(Session::new(handle, region, SessionOrigin::Launched))
    }

    /// Close `session`, ignoring failures.
    pub async fn release(&self, session: Session) {
        debug!(sandbox_id = %session.sandbox_id(), "releasing session");
        close_quietly(session.handle).await;
    }
}

async fn close_quietly(handle: Box<dyn SandboxHandle>) {
    let id = handle.sandbox_id().to_string();
    if let Err(e) = handle.close().await {
        warn!(sandbox_id = %id, error = %e, "failed to close session");
    }
}
