//! Command lifecycle.
//!
//! Every invocation walks a small state machine: sandbox-backed commands go
//! `Idle -> Validating -> SessionBound -> Executing -> Released ->
//! Terminated`, exempt commands go straight from `Idle` to `Executing`.

mod context;
mod hook;
mod phase;

pub use context::ExecutionContext;
pub use hook::{Action, ExitStatus, Lifecycle, Outcome};
pub use phase::{Phase, PhaseTrail};
