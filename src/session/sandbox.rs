//! Remote sandbox API seams.
//!
//! [`SandboxConnector`] opens sandboxes and [`SandboxHandle`] operates on an
//! open one. The HTTP implementation lives in [`super::http`]; tests use the
//! doubles in [`crate::testing`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Credential;
use crate::config::Region;
use crate::Result;

/// Keep-alive requested when reconnecting to a persisted sandbox.
pub const RECONNECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Startup timeout for a freshly launched sandbox.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Callback ticked while a long remote call is pending.
pub type Progress<'a> = Option<&'a (dyn Fn() + Send + Sync)>;

/// Options for launching a new sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Startup timeout.
    pub timeout: Duration,
    /// Region tag for the sandbox.
    pub region: Region,
}

impl LaunchOptions {
    /// Default options for `region`.
    pub fn new(region: Region) -> Self {
        Self {
            timeout: LAUNCH_TIMEOUT,
            region,
        }
    }
}

/// An open remote sandbox.
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    /// Opaque sandbox identifier, persisted for reconnects.
    fn sandbox_id(&self) -> &str;

    /// Terminal identifier namespacing this session's files.
    fn terminal_id(&self) -> &str;

    /// Public URL for `path` inside the sandbox.
    fn url(&self, path: &str) -> String;

    /// Copy a local file to `remote_path`, overwriting any existing object.
    async fn upload(&self, local: &Path, remote_path: &str) -> Result<()>;

    /// Call a generation endpoint with JSON parameters.
    async fn invoke(&self, operation: &str, params: Value, progress: Progress<'_>) -> Result<Value>;

    /// Close the session. The sandbox itself expires on its own.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sandboxes for a credential.
#[async_trait]
pub trait SandboxConnector: Send + Sync {
    /// Reattach to an existing sandbox.
    async fn connect(
        &self,
        credential: &Credential,
        sandbox_id: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SandboxHandle>>;

    /// Start a new sandbox.
    async fn launch(
        &self,
        credential: &Credential,
        options: LaunchOptions,
    ) -> Result<Box<dyn SandboxHandle>>;
}
