//! Sandbox session management.
//!
//! This module provides the region-keyed credential, the remote sandbox API
//! seams and the [`SessionManager`] that reconnects to or relaunches the
//! sandbox for an invocation.

mod credential;
pub mod http;
mod manager;
mod sandbox;

pub use credential::Credential;
pub use http::{HttpSandbox, HttpSandboxConnector};
pub use manager::{Session, SessionManager, SessionOrigin};
pub use sandbox::{
    LaunchOptions, Progress, SandboxConnector, SandboxHandle, LAUNCH_TIMEOUT, RECONNECT_TIMEOUT,
};
