//! Testing infrastructure for zerocut.
//!
//! Provides in-memory implementations of the remote seams so session,
//! material and lifecycle logic can be exercised without a sandbox:
//! - [`MockConnector`]: a [`SandboxConnector`] recording every call
//! - [`MockSandbox`]: the [`SandboxHandle`] it hands out
//! - [`MockProbe`]: an [`AssetProbe`] with scripted responses
//!
//! # Example
//!
//! ```
//! use zerocut::testing::{MockCall, MockConnector};
//!
//! let connector = MockConnector::new().with_live_sandbox("sbx-1");
//! // ... run a SessionManager with connector.clone()
//! assert!(connector.calls().iter().all(|c| !matches!(c, MockCall::Close { .. })));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Region;
use crate::error::ZerocutError;
use crate::materials::{AssetProbe, ProbeResponse};
use crate::session::{Credential, LaunchOptions, Progress, SandboxConnector, SandboxHandle};
use crate::Result;

/// Call recorded by [`MockConnector`] and its sandboxes.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// Reconnect attempt.
    Connect {
        sandbox_id: String,
        credential: String,
        timeout: Duration,
    },
    /// Sandbox launch.
    Launch { credential: String, region: Region },
    /// File upload.
    Upload { local: PathBuf, remote: String },
    /// Generation call.
    Invoke { operation: String, params: Value },
    /// Session close.
    Close { sandbox_id: String },
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<MockCall>>,
    live: Mutex<HashSet<String>>,
    results: Mutex<HashMap<String, Value>>,
    launched: AtomicU64,
    fail_launch: AtomicBool,
    fail_close: AtomicBool,
}

impl MockState {
    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// In-memory [`SandboxConnector`].
///
/// Reconnects succeed only for ids registered with
/// [`with_live_sandbox`](Self::with_live_sandbox) or launched earlier.
/// Clones share state, so keep one clone for assertions.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Creates a connector with no live sandboxes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `sandbox_id` as reconnectable.
    pub fn with_live_sandbox(self, sandbox_id: &str) -> Self {
        self.state.live.lock().unwrap().insert(sandbox_id.to_string());
        self
    }

    /// Makes every launch fail.
    pub fn failing_launch(self) -> Self {
        self.state.fail_launch.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every close fail.
    pub fn failing_close(self) -> Self {
        self.state.fail_close.store(true, Ordering::SeqCst);
        self
    }

    /// Scripts the JSON returned by `operation`.
    pub fn with_result(self, operation: &str, result: Value) -> Self {
        self.state
            .results
            .lock()
            .unwrap()
            .insert(operation.to_string(), result);
        self
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Number of times the session for `sandbox_id` was closed.
    pub fn close_count(&self, sandbox_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Close { sandbox_id: id } if id == sandbox_id))
            .count()
    }
}

#[async_trait]
impl SandboxConnector for MockConnector {
    async fn connect(
        &self,
        credential: &Credential,
        sandbox_id: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SandboxHandle>> {
        self.state.record(MockCall::Connect {
            sandbox_id: sandbox_id.to_string(),
            credential: credential.expose().to_string(),
            timeout,
        });
        if !self.state.live.lock().unwrap().contains(sandbox_id) {
            return Err(ZerocutError::Sandbox(format!("sandbox {sandbox_id} not found")));
        }
        Ok(Box::new(MockSandbox::new(sandbox_id, "term-reconnected", self)))
    }

    async fn launch(
        &self,
        credential: &Credential,
        options: LaunchOptions,
    ) -> Result<Box<dyn SandboxHandle>> {
        self.state.record(MockCall::Launch {
            credential: credential.expose().to_string(),
            region: options.region,
        });
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(ZerocutError::Sandbox("launch refused".into()));
        }
        let n = self.state.launched.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("sbx-{n:04}");
        self.state.live.lock().unwrap().insert(id.clone());
        Ok(Box::new(MockSandbox::new(&id, &format!("term-{n:04}"), self)))
    }
}

/// In-memory [`SandboxHandle`] recording into its connector.
pub struct MockSandbox {
    sandbox_id: String,
    terminal_id: String,
    state: Arc<MockState>,
}

impl MockSandbox {
    /// Creates a sandbox that records into `connector`.
    pub fn new(sandbox_id: &str, terminal_id: &str, connector: &MockConnector) -> Self {
        Self {
            sandbox_id: sandbox_id.to_string(),
            terminal_id: terminal_id.to_string(),
            state: Arc::clone(&connector.state),
        }
    }
}

#[async_trait]
impl SandboxHandle for MockSandbox {
    fn sandbox_id(&self) -> &str {
        &self.sandbox_id
    }

    fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}.sandbox.test{}", self.sandbox_id, path)
    }

    async fn upload(&self, local: &Path, remote_path: &str) -> Result<()> {
        self.state.record(MockCall::Upload {
            local: local.to_path_buf(),
            remote: remote_path.to_string(),
        });
        Ok(())
    }

    async fn invoke(
        &self,
        operation: &str,
        params: Value,
        progress: Progress<'_>,
    ) -> Result<Value> {
        if let Some(tick) = progress {
            tick();
        }
        self.state.record(MockCall::Invoke {
            operation: operation.to_string(),
            params,
        });
        let scripted = self.state.results.lock().unwrap().get(operation).cloned();
        Ok(scripted.unwrap_or_else(|| json!({ "url": "https://cdn.test/result" })))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.record(MockCall::Close {
            sandbox_id: self.sandbox_id.clone(),
        });
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(ZerocutError::Sandbox("close refused".into()));
        }
        Ok(())
    }
}

/// Scripted [`AssetProbe`]; unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockProbe {
    responses: Arc<Mutex<HashMap<String, ProbeResponse>>>,
    probed: Arc<Mutex<Vec<String>>>,
}

impl MockProbe {
    /// Creates a probe where every URL is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for `url`.
    pub fn respond(&self, url: &str, response: ProbeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// URLs probed so far, in order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetProbe for MockProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        self.probed.lock().unwrap().push(url.to_string());
        let response = self.responses.lock().unwrap().get(url).cloned();
        Ok(response.unwrap_or_else(ProbeResponse::not_found))
    }
}
