//! Configuration management for zerocut.
//!
//! Settings live in a JSON document addressed by dotted key paths. The
//! document is looked up in two places, in this order:
//! 1. `~/.zerocut/config.json` (user-scoped, primary)
//! 2. `<cwd>/.zerocut/config.json` (project-local fallback)
//!
//! The first one that exists is used exclusively; see [`ConfigStore`] for
//! the write policy.

pub mod keypath;
mod settings;
mod store;

pub use settings::{
    mask_secret, masked_document, Region, Settings, KEY_API_KEY, KEY_ENDPOINT, KEY_PROJECT_DIR,
    KEY_REGION, KEY_SANDBOX_ID, MASK_CHAR,
};
pub use store::{ConfigLocations, ConfigStore, CONFIG_DIR, CONFIG_FILE};
