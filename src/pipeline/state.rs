//! Run state machine

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Stage of a pipeline run
///
/// ```text
/// Configured -> Validating -> Collecting -> Normalizing -> Writing -> Completed
///      \____________\_____________\_____________\____________\-----> Failed
///                    \_____________\_____________\-------------------> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Configured,
    Validating,
    Collecting,
    Normalizing,
    Writing,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// No further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Configured, Validating)
            | (Validating, Collecting)
            | (Collecting, Normalizing)
            | (Normalizing, Writing)
            | (Writing, Completed) => true,
            (Validating | Collecting | Normalizing, Cancelled) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(self, next: RunState) -> Result<RunState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::Other(format!(
                "illegal run state transition {self} -> {next}"
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Validating => "validating",
            Self::Collecting => "collecting",
            Self::Normalizing => "normalizing",
            Self::Writing => "writing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
