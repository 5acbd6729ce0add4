//! # zerocut
//!
//! Command-line client for generating images and video in a remote zerocut
//! sandbox.
//!
//! Every invocation goes through the same lifecycle: sandbox-backed
//! commands validate the stored configuration, reattach to the last
//! sandbox (or launch a new one), upload any local materials whose content
//! changed, run one generation call and release the session. Config
//! management, help and version run without a session.
//!
//! ## Modules
//!
//! - [`config`]: JSON config document with dotted keys and a fallback location
//! - [`session`]: sandbox session acquisition over the remote API
//! - [`materials`]: SHA-256 based material synchronization
//! - [`lifecycle`]: validate / bind / run / release wrapper around commands
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use zerocut::cli::{Command, ConfigCommand};
//! use zerocut::{commands, ConfigStore, HttpProbe, HttpSandboxConnector, Lifecycle};
//!
//! #[tokio::main]
//! async fn main() -> zerocut::Result<()> {
//!     zerocut::logging::try_init(None).ok();
//!
//!     let store = ConfigStore::open()?;
//!     let connector = HttpSandboxConnector::from_env(None)?;
//!     let lifecycle = Lifecycle::new(store, connector, Arc::new(HttpProbe::new()?));
//!
//!     let command = Command::Config(ConfigCommand::List);
//!     let outcome = lifecycle.run(commands::action_for(command).as_ref()).await;
//!     println!("exit status {}", outcome.status.code());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod materials;
pub mod progress;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use config::{ConfigLocations, ConfigStore, Region, Settings};
pub use error::{Result, ZerocutError};
pub use lifecycle::{Action, ExecutionContext, ExitStatus, Lifecycle, Outcome, Phase};
pub use materials::{AssetProbe, HttpProbe, MaterialSynchronizer, SyncDecision};
pub use session::{
    Credential, HttpSandboxConnector, SandboxConnector, SandboxHandle, Session, SessionManager,
    SessionOrigin,
};
