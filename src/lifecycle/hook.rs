//! Pre/post execution wrapper around command actions.

use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ExecutionContext, Phase, PhaseTrail};
use crate::config::{ConfigStore, Settings};
use crate::error::ZerocutError;
use crate::materials::AssetProbe;
use crate::session::{SandboxConnector, SessionManager};
use crate::Result;

/// A command body run inside the lifecycle.
#[async_trait]
pub trait Action: Send + Sync {
    /// Command name used in logs.
    fn name(&self) -> &str;

    /// Whether the action needs validated settings and a live session.
    ///
    /// Help, version and config management return `false`.
    fn requires_session(&self) -> bool {
        true
    }

    /// Option checks that need neither config nor network.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Run the action.
    async fn run(&self, ctx: &ExecutionContext) -> Result<()>;
}

/// Process exit status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Action completed.
    Success,
    /// Action or session acquisition failed.
    Failure,
    /// Required configuration is missing.
    ConfigurationError,
}

impl ExitStatus {
    /// Numeric exit code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::ConfigurationError => 2,
        }
    }

    fn for_error(err: &ZerocutError) -> Self {
        match err {
            ZerocutError::Configuration { .. } => Self::ConfigurationError,
            _ => Self::Failure,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Result of one lifecycle run.
#[derive(Debug)]
pub struct Outcome {
    /// Exit status for the process.
    pub status: ExitStatus,
    /// Phases entered, in order.
    pub trail: Vec<Phase>,
    /// The error that ended the run, if any.
    pub error: Option<ZerocutError>,
}

impl Outcome {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Success
    }
}

/// Runs actions with configuration validation and session management
/// around them.
pub struct Lifecycle<C> {
    manager: SessionManager<C>,
    probe: Arc<dyn AssetProbe>,
}

impl<C: SandboxConnector> Lifecycle<C> {
    /// Create a lifecycle persisting into `store`.
    pub fn new(store: ConfigStore, connector: C, probe: Arc<dyn AssetProbe>) -> Self {
        Self {
            manager: SessionManager::new(store, connector),
            probe,
        }
    }

    /// The session manager.
    pub fn manager(&self) -> &SessionManager<C> {
        &self.manager
    }

    /// Run `action` and report how it ended.
    ///
    /// Errors and their remediation hints are written to stderr. A bound
    /// session is released exactly once whether the action succeeds or not.
    /// The process is never exited here.
    pub async fn run(&self, action: &dyn Action) -> Outcome {
        let mut trail = PhaseTrail::new();
        let result = self.drive(action, &mut trail).await;

        if let Err(e) = trail.advance(Phase::Terminated) {
            warn!(error = %e, "lifecycle did not terminate cleanly");
        }

        match result {
            Ok(()) => {
                debug!(command = action.name(), "command finished");
                Outcome {
                    status: ExitStatus::Success,
                    trail: trail.visited().to_vec(),
                    error: None,
                }
            }
            Err(err) => {
                report(&err);
                Outcome {
                    status: ExitStatus::for_error(&err),
                    trail: trail.visited().to_vec(),
                    error: Some(err),
                }
            }
        }
    }

    async fn drive(&self, action: &dyn Action, trail: &mut PhaseTrail) -> Result<()> {
        action.check()?;

        let mut ctx = ExecutionContext::new(self.manager.store().clone(), Arc::clone(&self.probe));

        if !action.requires_session() {
            trail.advance(Phase::Executing)?;
            debug!(command = action.name(), "running without session");
            return action.run(&ctx).await;
        }

        trail.advance(Phase::Validating)?;
        let settings = Settings::validate(self.manager.store()).await?;
        ctx.set_settings(settings);

        let session = self.manager.acquire().await?;
        if let Err(session) = ctx.bind(session) {
            warn!(sandbox_id = %session.sandbox_id(), "context already holds a session");
            self.manager.release(session).await;
        }

        let result: Result<()> = async {
            trail.advance(Phase::SessionBound)?;
            trail.advance(Phase::Executing)?;
            debug!(command = action.name(), "running with session");
            action.run(&ctx).await
        }
        .await;

        if let Some(session) = ctx.unbind() {
            self.manager.release(session).await;
        }
        let released = trail.advance(Phase::Released);
        result.and(released)
    }
}

fn report(err: &ZerocutError) {
    eprintln!("Error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("{hint}");
    }
}
