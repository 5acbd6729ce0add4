//! Two-location JSON configuration store.
//!
//! Reads come from the primary (user-scoped) document when it exists and
//! from the project-local fallback otherwise; the two are never merged.
//! Writes go to the primary unless it is not writable, in which case the
//! store switches to the fallback for the rest of the process.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::keypath;
use crate::error::ZerocutError;
use crate::Result;

/// Directory holding the config document in both locations.
pub const CONFIG_DIR: &str = ".zerocut";

/// File name of the config document.
pub const CONFIG_FILE: &str = "config.json";

/// Physical locations of the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocations {
    /// User-scoped document, preferred for reads and writes.
    pub primary: PathBuf,
    /// Project-local document under the working directory.
    pub fallback: PathBuf,
}

impl ConfigLocations {
    /// Create locations from explicit paths.
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Standard locations: `~/.zerocut/config.json` and
    /// `<cwd>/.zerocut/config.json`.
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "cannot determine home directory")
        })?;
        let cwd = std::env::current_dir()?;
        Ok(Self::new(
            home.join(CONFIG_DIR).join(CONFIG_FILE),
            cwd.join(CONFIG_DIR).join(CONFIG_FILE),
        ))
    }
}

#[derive(Debug)]
struct Inner {
    locations: ConfigLocations,
    redirected: AtomicBool,
}

/// Durable key/value settings addressed by dotted paths.
///
/// Cloning is cheap and clones share the write-redirect state. The async
/// methods run the blocking implementation on tokio's blocking pool, so
/// both flavours follow the same precedence rules.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Arc<Inner>,
}

impl ConfigStore {
    /// Create a store over the given locations.
    pub fn new(locations: ConfigLocations) -> Self {
        Self {
            inner: Arc::new(Inner {
                locations,
                redirected: AtomicBool::new(false),
            }),
        }
    }

    /// Create a store over the standard locations.
    pub fn open() -> Result<Self> {
        Ok(Self::new(ConfigLocations::discover()?))
    }

    /// The configured locations.
    pub fn locations(&self) -> &ConfigLocations {
        &self.inner.locations
    }

    /// Whether writes were moved to the fallback after a permission error.
    pub fn is_redirected(&self) -> bool {
        self.inner.redirected.load(Ordering::SeqCst)
    }

    /// The document that is authoritative for reads right now, if any.
    pub fn read_location(&self) -> Option<&Path> {
        let loc = &self.inner.locations;
        if self.is_redirected() {
            return loc.fallback.exists().then_some(loc.fallback.as_path());
        }
        if loc.primary.exists() {
            Some(&loc.primary)
        } else if loc.fallback.exists() {
            Some(&loc.fallback)
        } else {
            None
        }
    }

    /// Read the whole authoritative document (empty object if none).
    pub fn load_blocking(&self) -> Value {
        match self.read_location() {
            Some(path) => read_document(path),
            None => Value::Object(Map::new()),
        }
    }

    /// Read the value at `key`.
    pub fn get_blocking(&self, key: &str) -> Option<Value> {
        let doc = self.load_blocking();
        keypath::lookup(&doc, &keypath::split(key)).cloned()
    }

    /// Read the value at `key` if it is a string.
    pub fn get_string_blocking(&self, key: &str) -> Option<String> {
        match self.get_blocking(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Store `value` at `key`, creating intermediate objects.
    pub fn set_blocking(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(key, value.into(), write_document)
    }

    /// Async flavour of [`load_blocking`](Self::load_blocking).
    pub async fn load(&self) -> Result<Value> {
        let store = self.clone();
        Ok(tokio::task::spawn_blocking(move || store.load_blocking()).await?)
    }

    /// Async flavour of [`get_blocking`](Self::get_blocking).
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let store = self.clone();
        let key = key.to_string();
        Ok(tokio::task::spawn_blocking(move || store.get_blocking(&key)).await?)
    }

    /// Async flavour of [`get_string_blocking`](Self::get_string_blocking).
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let store = self.clone();
        let key = key.to_string();
        Ok(tokio::task::spawn_blocking(move || store.get_string_blocking(&key)).await?)
    }

    /// Async flavour of [`set_blocking`](Self::set_blocking).
    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        let value = value.into();
        tokio::task::spawn_blocking(move || store.set_blocking(&key, value)).await?
    }

    fn set_with<W>(&self, key: &str, value: Value, write: W) -> Result<()>
    where
        W: Fn(&Path, &Value) -> io::Result<()>,
    {
        let segments = keypath::split(key);
        if segments.is_empty() {
            return Err(ZerocutError::InvalidKey(key.to_string()));
        }

        let mut doc = self.load_blocking();
        keypath::assign(&mut doc, &segments, value);
        self.persist(&doc, write)
    }

    fn persist<W>(&self, doc: &Value, write: W) -> Result<()>
    where
        W: Fn(&Path, &Value) -> io::Result<()>,
    {
        let loc = &self.inner.locations;
        if self.is_redirected() {
            return Ok(write(&loc.fallback, doc)?);
        }

        match write(&loc.primary, doc) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(
                    primary = %loc.primary.display(),
                    fallback = %loc.fallback.display(),
                    "config location not writable, using fallback"
                );
                self.inner.redirected.store(true, Ordering::SeqCst);
                Ok(write(&loc.fallback, doc)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn read_document(path: &Path) -> Value {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()));

    match parsed {
        Ok(doc @ Value::Object(_)) => doc,
        Ok(_) => {
            debug!(path = %path.display(), "config document is not an object, ignoring");
            Value::Object(Map::new())
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "config document unreadable, ignoring");
            Value::Object(Map::new())
        }
    }
}

fn write_document(path: &Path, doc: &Value) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    std::fs::write(path, text)
}
