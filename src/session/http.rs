//! HTTP client for the remote sandbox API.
//!
//! ## Endpoints
//!
//! - `POST {api}/sandboxes` - launch, body `{"region", "timeout"}`
//! - `POST {api}/sandboxes/{id}/connect` - reconnect, body `{"timeoutMs"}`
//! - `POST {api}/sandboxes/{id}/ai/{operation}` - generation call
//! - `DELETE {api}/sandboxes/{id}/terminals/{terminal}` - close
//! - `PUT {sandbox}/files?path=...` - file upload
//!
//! Launch and connect answer with `{"sandboxId", "terminalId", "baseUrl"}`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Credential, LaunchOptions, Progress, SandboxConnector, SandboxHandle};
use crate::config::Region;
use crate::error::ZerocutError;
use crate::Result;

/// Environment variable overriding the sandbox API base URL.
pub const ENDPOINT_ENV: &str = "ZEROCUT_ENDPOINT";

/// Default API base for the `us` region.
pub const DEFAULT_US_ENDPOINT: &str = "https://api.zerocut.art";

/// Default API base for the `cn` region.
pub const DEFAULT_CN_ENDPOINT: &str = "https://api.zerocut.cn";

/// Deadline for a single file upload.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Deadline for a generation call.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Deadline for closing a session.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between progress ticks.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Pick the API base URL.
///
/// Priority: environment override, then config override, then the region
/// default.
pub fn resolve_endpoint(env: Option<&str>, configured: Option<&str>, region: Region) -> String {
    let chosen = env
        .or(configured)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(match region {
            Region::Us => DEFAULT_US_ENDPOINT,
            Region::Cn => DEFAULT_CN_ENDPOINT,
        });
    chosen.trim_end_matches('/').to_string()
}

/// Shared HTTP client with the crate's user agent.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("zerocut/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SandboxDescriptor {
    sandbox_id: String,
    terminal_id: String,
    base_url: String,
}

/// [`SandboxConnector`] speaking the sandbox REST API.
#[derive(Debug, Clone)]
pub struct HttpSandboxConnector {
    client: Client,
    endpoint_override: Option<String>,
}

impl HttpSandboxConnector {
    /// Create a connector; `endpoint_override` replaces the region default.
    pub fn new(endpoint_override: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint_override,
        })
    }

    /// Create a connector honouring `ZEROCUT_ENDPOINT` before `configured`.
    pub fn from_env(configured: Option<String>) -> Result<Self> {
        let env = std::env::var(ENDPOINT_ENV).ok().filter(|s| !s.trim().is_empty());
        Self::new(env.or(configured))
    }

    /// API base URL used for `region`.
    pub fn endpoint(&self, region: Region) -> String {
        resolve_endpoint(None, self.endpoint_override.as_deref(), region)
    }

    async fn open(
        &self,
        credential: &Credential,
        request: RequestBuilder,
        what: &'static str,
    ) -> Result<Box<dyn SandboxHandle>> {
        let request = request.bearer_auth(credential.expose());
        let descriptor: SandboxDescriptor = send_json(request, what).await?;
        debug!(
            sandbox_id = %descriptor.sandbox_id,
            terminal_id = %descriptor.terminal_id,
            "sandbox descriptor received"
        );
        Ok(Box::new(HttpSandbox {
            client: self.client.clone(),
            api: self.endpoint(credential.region()),
            credential: credential.clone(),
            descriptor,
        }))
    }
}

#[async_trait]
impl SandboxConnector for HttpSandboxConnector {
    async fn connect(
        &self,
        credential: &Credential,
        sandbox_id: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SandboxHandle>> {
        let endpoint = self.endpoint(credential.region());
        let url = format!("{endpoint}/sandboxes/{sandbox_id}/connect");
        let request = self
            .client
            .post(url)
            .json(&json!({ "timeoutMs": timeout.as_millis() as u64 }))
            .timeout(timeout);
        self.open(credential, request, "sandbox connect").await
    }

    async fn launch(
        &self,
        credential: &Credential,
        options: LaunchOptions,
    ) -> Result<Box<dyn SandboxHandle>> {
        let url = format!("{}/sandboxes", self.endpoint(credential.region()));
        let request = self
            .client
            .post(url)
            .json(&json!({
                "region": options.region.code(),
                "timeout": options.timeout.as_secs(),
            }))
            .timeout(options.timeout);
        self.open(credential, request, "sandbox launch").await
    }
}

/// An open sandbox reached over HTTP.
#[derive(Debug)]
pub struct HttpSandbox {
    client: Client,
    api: String,
    credential: Credential,
    descriptor: SandboxDescriptor,
}

impl HttpSandbox {
    fn api_url(&self, tail: &str) -> String {
        format!("{}/sandboxes/{}{}", self.api, self.descriptor.sandbox_id, tail)
    }
}

#[async_trait]
impl SandboxHandle for HttpSandbox {
    fn sandbox_id(&self) -> &str {
        &self.descriptor.sandbox_id
    }

    fn terminal_id(&self) -> &str {
        &self.descriptor.terminal_id
    }

    fn url(&self, path: &str) -> String {
        let base = self.descriptor.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    async fn upload(&self, local: &Path, remote_path: &str) -> Result<()> {
        let bytes = tokio::fs::read(local)
            .await
            .map_err(|source| ZerocutError::LocalMaterial {
                path: local.to_path_buf(),
                source,
            })?;
        debug!(
            local = %local.display(),
            remote = remote_path,
            size = bytes.len(),
            "uploading file"
        );

        let request = self
            .client
            .put(self.url("/files"))
            .query(&[("path", remote_path)])
            .bearer_auth(self.credential.expose())
            .body(bytes)
            .timeout(UPLOAD_TIMEOUT);
        send(request, "upload").await?;
        Ok(())
    }

    async fn invoke(
        &self,
        operation: &str,
        params: Value,
        progress: Progress<'_>,
    ) -> Result<Value> {
        let request = self
            .client
            .post(self.api_url(&format!("/ai/{operation}")))
            .bearer_auth(self.credential.expose())
            .json(&params)
            .timeout(INVOKE_TIMEOUT);

        let call = send_json::<Value>(request, "generation");
        tokio::pin!(call);

        let Some(tick) = progress else {
            return call.await;
        };
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        loop {
            tokio::select! {
                result = &mut call => return result,
                _ = interval.tick() => tick(),
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let request = self
            .client
            .delete(self.api_url(&format!("/terminals/{}", self.descriptor.terminal_id)))
            .bearer_auth(self.credential.expose())
            .timeout(CLOSE_TIMEOUT);
        send(request, "session close").await?;
        Ok(())
    }
}

fn classify(e: reqwest::Error, what: &'static str) -> ZerocutError {
    if e.is_timeout() {
        ZerocutError::Timeout(what)
    } else {
        ZerocutError::Http(e)
    }
}

/// Send `request` and fail on a non-success status.
pub(crate) async fn send(request: RequestBuilder, what: &'static str) -> Result<Response> {
    let response = request.send().await.map_err(|e| classify(e, what))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(ZerocutError::Sandbox(format!(
        "{what} failed: {url} returned {status}: {}",
        body.trim()
    )))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &'static str) -> Result<T> {
    let response = send(request, what).await?;
    response.json().await.map_err(|e| classify(e, what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_endpoint_priority() {
        assert_eq!(resolve_endpoint(None, None, Region::Us), DEFAULT_US_ENDPOINT);
        assert_eq!(resolve_endpoint(None, None, Region::Cn), DEFAULT_CN_ENDPOINT);
        assert_eq!(
            resolve_endpoint(None, Some("http://cfg:1/"), Region::Cn),
            "http://cfg:1"
        );
        assert_eq!(
            resolve_endpoint(Some("http://env:2"), Some("http://cfg:1"), Region::Us),
            "http://env:2"
        );
        assert_eq!(resolve_endpoint(None, Some("  "), Region::Us), DEFAULT_US_ENDPOINT);
    }

    #[test]
    fn test_connector_endpoint_override() {
        let connector = HttpSandboxConnector::new(Some("http://127.0.0.1:9".into())).unwrap();
        assert_eq!(connector.endpoint(Region::Cn), "http://127.0.0.1:9");

        let connector = HttpSandboxConnector::new(None).unwrap();
        assert_eq!(connector.endpoint(Region::Cn), DEFAULT_CN_ENDPOINT);
    }

    #[test]
    fn test_sandbox_url_builder() {
        let sandbox = HttpSandbox {
            client: Client::new(),
            api: "http://api".into(),
            credential: Credential::for_region("sk-1", Region::Us),
            descriptor: SandboxDescriptor {
                sandbox_id: "sbx-1".into(),
                terminal_id: "t-1".into(),
                base_url: "https://sbx-1.example/".into(),
            },
        };
        assert_eq!(
            sandbox.url("/zerocut/t-1/materials/cat.png"),
            "https://sbx-1.example/zerocut/t-1/materials/cat.png"
        );
        assert_eq!(sandbox.url("files"), "https://sbx-1.example/files");
        assert_eq!(
            sandbox.api_url("/ai/generateImage"),
            "http://api/sandboxes/sbx-1/ai/generateImage"
        );
    }
}
