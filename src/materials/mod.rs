//! Material synchronization.
//!
//! Local assets live in `<projectDir>/materials/`. Before a generation call
//! each referenced file is hashed, its sandbox copy is probed, and the file
//! is uploaded again only when the remote copy is missing or stale.

pub mod digest;
mod probe;
mod sync;

/// Subdirectory of the project holding materials, locally and remotely.
pub const MATERIALS_DIR: &str = "materials";

/// Namespace prefix of asset URIs inside the sandbox.
pub const NAMESPACE: &str = "zerocut";

/// Root of per-terminal project storage inside the sandbox.
pub const SANDBOX_PROJECTS_ROOT: &str = "/home/user/cerevox-zerocut/projects";

pub use probe::{AssetProbe, HttpProbe, ProbeResponse, CONTENT_HASH_HEADER, PROBE_TIMEOUT};
pub use sync::{
    asset_path, base_name, decide, is_remote, storage_path, MaterialSynchronizer, SyncDecision,
};
