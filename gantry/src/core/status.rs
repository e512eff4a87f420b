//! Stage outcome and run state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The recorded outcome of a stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage executed and all blocking gates passed.
    Success,
    /// The executor failed, timed out, or a blocking gate rejected the outputs.
    Failed,
    /// The stage was never scheduled because the run halted first.
    Skipped,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageOutcome {
    /// Returns true if the outcome counts toward run success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// The run has not started.
    Pending,
    /// The run is executing stages.
    Running,
    /// Every stage succeeded and no blocking gate failed.
    Succeeded,
    /// A stage failed or a blocking gate rejected its outputs.
    Failed,
    /// The run was cancelled externally.
    Aborted,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl RunState {
    /// Returns true if the state represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }

    /// Returns true if the run completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_outcome_display() {
        assert_eq!(StageOutcome::Success.to_string(), "success");
        assert_eq!(StageOutcome::Failed.to_string(), "failed");
        assert_eq!(StageOutcome::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_run_state_is_terminal() {
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(RunState::Aborted.is_terminal());
        assert!(!RunState::Pending.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }

    #[test]
    fn test_run_state_serialize() {
        let json = serde_json::to_string(&RunState::Aborted).unwrap();
        assert_eq!(json, r#""aborted""#);
    }

    #[test]
    fn test_skipped_is_not_success() {
        assert!(!StageOutcome::Skipped.is_success());
        assert!(StageOutcome::Success.is_success());
    }
}
