//! Content-addressed material synchronization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::future::try_join_all;
use tracing::{debug, info};

use super::digest::{digests_match, sha256_file};
use super::probe::{AssetProbe, ProbeResponse};
use super::{MATERIALS_DIR, NAMESPACE, SANDBOX_PROJECTS_ROOT};
use crate::error::ZerocutError;
use crate::session::Session;
use crate::Result;

/// What to do with a local asset after probing its remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// The remote copy is current.
    Reuse,
    /// The remote copy is missing or stale.
    Upload,
}

/// Decide from a probe result whether `local_digest` must be uploaded.
///
/// A 404 or a 2xx whose advertised hash is absent or different means
/// upload; any other status is an error for `asset`.
pub fn decide(
    probe: &ProbeResponse,
    local_digest: &str,
    asset: &str,
    url: &str,
) -> Result<SyncDecision> {
    if probe.is_not_found() {
        return Ok(SyncDecision::Upload);
    }
    if !probe.is_success() {
        return Err(ZerocutError::MaterialSync {
            asset: asset.to_string(),
            url: url.to_string(),
            status: probe.status,
        });
    }
    match probe.content_hash.as_deref() {
        Some(advertised) if digests_match(local_digest, advertised) => Ok(SyncDecision::Reuse),
        _ => Ok(SyncDecision::Upload),
    }
}

/// Whether `reference` is a remote URL used as-is.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// File name a local reference is published under.
pub fn base_name(reference: &str) -> Result<String> {
    Path::new(reference)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ZerocutError::InvalidArgument(format!("invalid material name: '{reference}'"))
        })
}

/// Sandbox URL path of an asset in a terminal's namespace.
pub fn asset_path(terminal_id: &str, base_name: &str) -> String {
    format!("/{NAMESPACE}/{terminal_id}/{MATERIALS_DIR}/{base_name}")
}

/// Sandbox storage path an asset is uploaded to.
pub fn storage_path(terminal_id: &str, base_name: &str) -> String {
    format!("{SANDBOX_PROJECTS_ROOT}/{terminal_id}/{MATERIALS_DIR}/{base_name}")
}

/// Resolves material references to sandbox URIs, uploading stale files.
#[derive(Debug, Clone)]
pub struct MaterialSynchronizer<P> {
    materials_dir: PathBuf,
    probe: P,
}

impl<P: AssetProbe> MaterialSynchronizer<P> {
    /// Create a synchronizer for files under `materials_dir`.
    pub fn new(materials_dir: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            materials_dir: materials_dir.into(),
            probe,
        }
    }

    /// Local directory holding materials.
    pub fn materials_dir(&self) -> &Path {
        &self.materials_dir
    }

    /// Resolve one reference to a URI usable inside `session`.
    pub async fn resolve(&self, session: &Session, reference: &str) -> Result<String> {
        if is_remote(reference) {
            return Ok(reference.to_string());
        }

        let local = self.materials_dir.join(reference);
        let name = base_name(reference)?;

        let digest = sha256_file(&local).await?;
        let url = session.url(&asset_path(session.terminal_id(), &name));
        let probe = self.probe.head(&url).await?;

        match decide(&probe, &digest, reference, &url)? {
            SyncDecision::Reuse => {
                debug!(asset = reference, %url, "material up to date");
            }
            SyncDecision::Upload => {
                let remote = storage_path(session.terminal_id(), &name);
                info!(asset = reference, status = probe.status, "uploading material");
                session.upload(&local, &remote).await?;
            }
        }
        Ok(url)
    }

    /// Resolve several references concurrently, keeping their order.
    ///
    /// Distinct local references sharing a base name would land on the same
    /// sandbox path, so they are rejected before anything is uploaded.
    pub async fn resolve_all(
        &self,
        session: &Session,
        references: &[String],
    ) -> Result<Vec<String>> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for reference in references.iter().filter(|r| !is_remote(r)) {
            let name = base_name(reference)?;
            if let Some(previous) = seen.insert(name.clone(), reference.as_str()) {
                if previous != reference.as_str() {
                    return Err(ZerocutError::InvalidArgument(format!(
                        "materials '{previous}' and '{reference}' share the name '{name}'"
                    )));
                }
            }
        }

        try_join_all(references.iter().map(|r| self.resolve(session, r))).await
    }
}
