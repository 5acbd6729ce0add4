//! Metadata-only existence probe for sandbox assets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ZerocutError;
use crate::session::http::http_client;
use crate::Result;

/// Response header carrying the hex SHA-256 of the stored object.
pub const CONTENT_HASH_HEADER: &str = "x-content-hash";

/// Deadline for a single probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of probing an asset URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Advertised content hash, if the header was present.
    pub content_hash: Option<String>,
}

impl ProbeResponse {
    /// The asset does not exist.
    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_hash: None,
        }
    }

    /// The asset exists with the given hash.
    pub fn found(content_hash: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_hash: Some(content_hash.into()),
        }
    }

    /// Whether the status is 404.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues HEAD-equivalent requests against asset URIs.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Probe `url` without fetching its body.
    async fn head(&self, url: &str) -> Result<ProbeResponse>;
}

#[async_trait]
impl<P: AssetProbe + ?Sized> AssetProbe for Arc<P> {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        (**self).head(url).await
    }
}

/// [`AssetProbe`] issuing real `HEAD` requests.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe with the default deadline.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            timeout: PROBE_TIMEOUT,
        })
    }

    /// Override the per-probe deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AssetProbe for HttpProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        let response = self
            .client
            .head(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ZerocutError::Timeout("material probe")
                } else {
                    ZerocutError::Http(e)
                }
            })?;

        let content_hash = response
            .headers()
            .get(CONTENT_HASH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            content_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_response_helpers() {
        let missing = ProbeResponse::not_found();
        assert!(missing.is_not_found());
        assert!(!missing.is_success());

        let found = ProbeResponse::found("abc");
        assert!(found.is_success());
        assert_eq!(found.content_hash.as_deref(), Some("abc"));

        let error = ProbeResponse {
            status: 503,
            content_hash: None,
        };
        assert!(!error.is_success());
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_with_timeout() {
        let probe = HttpProbe::new().unwrap().with_timeout(Duration::from_secs(1));
        assert_eq!(probe.timeout, Duration::from_secs(1));
    }
}
