//! Invocation lifecycle state machine.

use crate::error::ZerocutError;

/// Phase of a single command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// Required configuration is being checked.
    Validating,
    /// A session is acquired and bound to the execution context.
    SessionBound,
    /// The action is running.
    Executing,
    /// The bound session has been released.
    Released,
    /// The invocation is over; no further transitions.
    Terminated,
}

impl Phase {
    /// Check if transition to target phase is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Validating (sandbox-backed command)
    /// - Idle -> Executing (exempt command)
    /// - Idle -> Terminated (option pre-check failed)
    /// - Validating -> SessionBound
    /// - Validating -> Terminated (validation or acquisition failed)
    /// - SessionBound -> Executing
    /// - Executing -> Released
    /// - Executing -> Terminated (exempt command finished)
    /// - Released -> Terminated
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (*self, target),
            (Idle, Validating)
                | (Idle, Executing)
                | (Idle, Terminated)
                | (Validating, SessionBound)
                | (Validating, Terminated)
                | (SessionBound, Executing)
                | (Executing, Released)
                | (Executing, Terminated)
                | (Released, Terminated)
        )
    }

    /// Attempt to transition to a new phase.
    pub fn transition_to(&mut self, target: Phase) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(ZerocutError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is the final phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminated)
    }
}

/// A phase plus the path taken to reach it.
#[derive(Debug, Clone, Default)]
pub struct PhaseTrail {
    current: Phase,
    visited: Vec<Phase>,
}

impl PhaseTrail {
    /// Start at [`Phase::Idle`].
    pub fn new() -> Self {
        Self {
            current: Phase::Idle,
            visited: vec![Phase::Idle],
        }
    }

    /// Current phase.
    pub fn current(&self) -> Phase {
        self.current
    }

    /// Every phase entered so far, including the current one.
    pub fn visited(&self) -> &[Phase] {
        &self.visited
    }

    /// Move to `target`, recording it.
    pub fn advance(&mut self, target: Phase) -> crate::Result<()> {
        self.current.transition_to(target)?;
        self.visited.push(target);
        Ok(())
    }
}
