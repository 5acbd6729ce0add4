//! Saving generation results into the project.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::error::ZerocutError;
use crate::session::http::{http_client, send};
use crate::Result;

/// Deadline for downloading one result.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// First result URL: `url`, else the first entry of `urls`.
pub fn result_url(result: &Value) -> Option<&str> {
    result.get("url").and_then(Value::as_str).or_else(|| {
        result
            .get("urls")
            .and_then(Value::as_array)
            .and_then(|urls| urls.first())
            .and_then(Value::as_str)
    })
}

/// Where `--output <file>` lands.
pub fn output_path(materials_dir: &Path, file: &str) -> PathBuf {
    materials_dir.join(file)
}

/// Download the first result URL into `materials_dir/file`, record the
/// saved path under `output` and return it.
pub async fn save_output(result: &mut Value, materials_dir: &Path, file: &str) -> Result<PathBuf> {
    let url = result_url(result)
        .ok_or_else(|| ZerocutError::Sandbox("generation result has no url to download".into()))?
        .to_string();
    let target = output_path(materials_dir, file);

    let client = http_client()?;
    let response = send(client.get(&url).timeout(DOWNLOAD_TIMEOUT), "output download").await?;
    let bytes = response.bytes().await?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &bytes).await?;
    info!(%url, path = %target.display(), size = bytes.len(), "saved output");

    if let Value::Object(map) = result {
        map.insert("output".into(), Value::String(target.to_string_lossy().into_owned()));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_url() {
        assert_eq!(result_url(&json!({"url": "https://a/x.mp4"})), Some("https://a/x.mp4"));
        assert_eq!(
            result_url(&json!({"urls": ["https://a/1.png", "https://a/2.png"]})),
            Some("https://a/1.png")
        );
        assert_eq!(result_url(&json!({"urls": []})), None);
        assert_eq!(result_url(&json!({})), None);
    }

    #[test]
    fn test_output_path_nested() {
        assert_eq!(
            output_path(Path::new("/p/materials"), "out/fox.png"),
            PathBuf::from("/p/materials/out/fox.png")
        );
    }

    #[tokio::test]
    async fn test_save_output_without_url() {
        let mut result = json!({"status": "done"});
        let err = save_output(&mut result, Path::new("/nonexistent"), "x.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ZerocutError::Sandbox(_)));
        assert!(result.get("output").is_none());
    }
}
