//! Append-only run record.
//!
//! The record is the audit trail for a single run. It is written by the
//! orchestrator and exported read-only; it is never consulted for control
//! decisions, which keeps logging and scheduling decoupled.

use crate::core::{ArtifactRef, StageOutcome};
use crate::gates::GateVerdict;
use crate::utils::iso_timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One recorded attempt at executing a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAttempt {
    /// The stage that was attempted.
    pub stage_id: String,

    /// When the attempt started (ISO 8601).
    pub started_at: String,

    /// When the attempt finished (ISO 8601).
    pub finished_at: String,

    /// The outcome of the attempt.
    pub outcome: StageOutcome,

    /// References to the artifacts the stage produced.
    #[serde(default)]
    pub produced: Vec<ArtifactRef>,

    /// Verdicts of the gates evaluated against the outputs, in declaration
    /// order.
    #[serde(default)]
    pub gate_verdicts: Vec<GateVerdict>,

    /// The failure message, for failed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageAttempt {
    /// Creates a successful attempt.
    #[must_use]
    pub fn success(
        stage_id: impl Into<String>,
        started_at: impl Into<String>,
        finished_at: impl Into<String>,
        produced: Vec<ArtifactRef>,
        gate_verdicts: Vec<GateVerdict>,
    ) -> Self {
        Self {
            stage_id: stage_id.into(),
            started_at: started_at.into(),
            finished_at: finished_at.into(),
            outcome: StageOutcome::Success,
            produced,
            gate_verdicts,
            error: None,
        }
    }

    /// Creates a failed attempt.
    #[must_use]
    pub fn failed(
        stage_id: impl Into<String>,
        started_at: impl Into<String>,
        finished_at: impl Into<String>,
        error: impl Into<String>,
        gate_verdicts: Vec<GateVerdict>,
    ) -> Self {
        Self {
            stage_id: stage_id.into(),
            started_at: started_at.into(),
            finished_at: finished_at.into(),
            outcome: StageOutcome::Failed,
            produced: Vec::new(),
            gate_verdicts,
            error: Some(error.into()),
        }
    }

    /// Creates a skipped attempt for a stage that was never scheduled.
    #[must_use]
    pub fn skipped(stage_id: impl Into<String>) -> Self {
        let now = iso_timestamp();
        Self {
            stage_id: stage_id.into(),
            started_at: now.clone(),
            finished_at: now,
            outcome: StageOutcome::Skipped,
            produced: Vec::new(),
            gate_verdicts: Vec::new(),
            error: None,
        }
    }

    /// Attaches produced artifact references.
    #[must_use]
    pub fn with_produced(mut self, produced: Vec<ArtifactRef>) -> Self {
        self.produced = produced;
        self
    }
}

/// Append-only log of stage attempts for one run.
///
/// `snapshot` is safe to call concurrently with `append`.
#[derive(Debug, Default)]
pub struct RunRecord {
    attempts: RwLock<Vec<StageAttempt>>,
}

impl RunRecord {
    /// Creates a new, empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attempt to the record.
    pub fn append(&self, attempt: StageAttempt) {
        self.attempts.write().push(attempt);
    }

    /// Returns a read-only snapshot of the attempts, in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StageAttempt> {
        self.attempts.read().clone()
    }

    /// Returns the number of recorded attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.read().len()
    }

    /// Returns whether the record is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.read().is_empty()
    }
}
