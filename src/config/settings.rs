//! Typed view over the recognized configuration fields.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::ConfigStore;
use crate::error::ZerocutError;
use crate::Result;

/// Secret API credential.
pub const KEY_API_KEY: &str = "apiKey";
/// Absolute project directory.
pub const KEY_PROJECT_DIR: &str = "projectDir";
/// Regional endpoint selector.
pub const KEY_REGION: &str = "region";
/// Identifier of the last sandbox in use.
pub const KEY_SANDBOX_ID: &str = "sandboxId";
/// Optional sandbox API base URL.
pub const KEY_ENDPOINT: &str = "endpoint";

/// Character used to hide secrets.
pub const MASK_CHAR: char = '*';

/// Number of trailing secret characters left visible.
const VISIBLE_TAIL: usize = 4;

/// Regional endpoint a credential addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Cn,
}

impl Region {
    /// Two-letter region code.
    pub fn code(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Cn => "cn",
        }
    }

    /// Interpret a stored config value.
    ///
    /// Only the exact codes `us` and `cn` are accepted; anything else is
    /// `None` and gets rewritten during validation.
    pub fn from_value(value: Option<&Value>) -> Option<Region> {
        match value.and_then(Value::as_str)? {
            "us" => Some(Region::Us),
            "cn" => Some(Region::Cn),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = ZerocutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "cn" => Ok(Region::Cn),
            other => Err(ZerocutError::InvalidArgument(format!(
                "Invalid region: {other}. Allowed: us|cn"
            ))),
        }
    }
}

/// Mask all but the last four characters of `secret`.
///
/// Secrets of four characters or fewer are returned unchanged.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    let hidden = len.saturating_sub(VISIBLE_TAIL);
    std::iter::repeat(MASK_CHAR)
        .take(hidden)
        .chain(secret.chars().skip(hidden))
        .collect()
}

/// Copy of a config document with the secret field masked, for display.
pub fn masked_document(doc: &Value) -> Value {
    let mut masked = doc.clone();
    if let Some(Value::String(key)) = masked.get_mut(KEY_API_KEY) {
        if !key.is_empty() {
            *key = mask_secret(key);
        }
    }
    masked
}

/// Configuration required to run a sandbox-backed command.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Raw API key as stored.
    pub api_key: String,
    /// Project directory holding `materials/`.
    pub project_dir: PathBuf,
    /// Active region.
    pub region: Region,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("project_dir", &self.project_dir)
            .field("region", &self.region)
            .finish()
    }
}

impl Settings {
    /// Check the required keys and normalize the region.
    ///
    /// `apiKey` and `projectDir` must be non-blank strings. A missing or
    /// unrecognized `region` is persisted as `us`.
    pub async fn validate(store: &ConfigStore) -> Result<Settings> {
        let doc = store.load().await?;

        let non_blank = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        let api_key = non_blank(KEY_API_KEY);
        let project_dir = non_blank(KEY_PROJECT_DIR);

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push(KEY_API_KEY.to_string());
        }
        if project_dir.is_none() {
            missing.push(KEY_PROJECT_DIR.to_string());
        }
        let (Some(api_key), Some(project_dir)) = (api_key, project_dir) else {
            return Err(ZerocutError::Configuration { missing });
        };

        let region = match Region::from_value(doc.get(KEY_REGION)) {
            Some(region) => region,
            None => {
                info!("region not set or invalid, defaulting to us");
                store.set(KEY_REGION, Region::Us.code()).await?;
                Region::Us
            }
        };

        Ok(Settings {
            api_key,
            project_dir: PathBuf::from(project_dir),
            region,
        })
    }

    /// Directory holding local materials.
    pub fn materials_dir(&self) -> PathBuf {
        self.project_dir.join(crate::materials::MATERIALS_DIR)
    }
}
