//! Error types for zerocut.

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::Phase;

/// Main error type for zerocut operations.
#[derive(Error, Debug)]
pub enum ZerocutError {
    /// Required configuration keys are missing or blank.
    #[error("missing required configuration: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// No usable API key is configured.
    #[error("credential error: {0}")]
    Credential(String),

    /// A configuration key path could not be used.
    #[error("invalid configuration key: '{0}'")]
    InvalidKey(String),

    /// The remote sandbox API rejected or failed a request.
    #[error("sandbox error: {0}")]
    Sandbox(String),

    /// The existence probe for a material failed unexpectedly.
    #[error(
        "failed to get material url for '{asset}': {url} returned status {status}; \
         upload the materials to the sandbox first (upload-custom-materials)"
    )]
    MaterialSync {
        asset: String,
        url: String,
        status: u16,
    },

    /// A local material file could not be read.
    #[error("cannot read material {}: {source}", path.display())]
    LocalMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Command option failed validation.
    #[error("{0}")]
    InvalidArgument(String),

    /// Requested combination is not supported by the remote service.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An action needed a session but none was bound.
    #[error("no active session")]
    NoActiveSession,

    /// Invalid lifecycle phase transition.
    #[error("invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    /// A network call exceeded its deadline.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ZerocutError {
    /// Remediation hint printed under the error, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Configuration { missing } => {
                let mut hint = String::from("Configure using:");
                for key in missing {
                    let arg = if key == "apiKey" { "<key>" } else { "<dir>" };
                    hint.push_str(&format!("\n  zerocut config {key} {arg}"));
                }
                Some(hint)
            }
            Self::Credential(_) => Some("Configure using:\n  zerocut config apiKey <key>".into()),
            _ => None,
        }
    }
}

/// Convenience Result type for zerocut operations.
pub type Result<T> = std::result::Result<T, ZerocutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display_lists_keys() {
        let err = ZerocutError::Configuration {
            missing: vec!["apiKey".into(), "projectDir".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required configuration: apiKey, projectDir"
        );
    }

    #[test]
    fn test_configuration_hint() {
        let err = ZerocutError::Configuration {
            missing: vec!["apiKey".into(), "projectDir".into()],
        };
        let hint = err.hint().unwrap();
        assert!(hint.contains("zerocut config apiKey <key>"));
        assert!(hint.contains("zerocut config projectDir <dir>"));
    }

    #[test]
    fn test_material_sync_names_asset() {
        let err = ZerocutError::MaterialSync {
            asset: "cat.png".into(),
            url: "https://sb/zerocut/t1/materials/cat.png".into(),
            status: 500,
        };
        let msg = err.to_string();
        assert!(msg.contains("cat.png"));
        assert!(msg.contains("500"));
        assert!(msg.contains("upload"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ZerocutError = io_err.into();
        assert!(matches!(err, ZerocutError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.hint().is_none());
    }

    #[test]
    fn test_local_material_display() {
        let err = ZerocutError::LocalMaterial {
            path: PathBuf::from("/tmp/proj/materials/dog.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/tmp/proj/materials/dog.png"));
    }
}
