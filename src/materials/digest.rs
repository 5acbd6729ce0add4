//! SHA-256 content digests.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::ZerocutError;
use crate::Result;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Lowercase hex SHA-256 of the file at `path`, streamed.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let local_err = |source| ZerocutError::LocalMaterial {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(local_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf).await.map_err(local_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a local digest with one advertised by the sandbox.
pub fn digests_match(local: &str, advertised: &str) -> bool {
    local.eq_ignore_ascii_case(advertised.trim())
}
