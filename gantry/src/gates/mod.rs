//! Security and quality gates.
//!
//! A gate is a pure predicate over artifacts. Evaluating the same artifact
//! sequence always yields the same verdict; gates never have side effects.
//! A blocking gate failure halts the run; an advisory failure is recorded
//! in the run record and nothing else.

mod coverage;
mod signature;
mod vulnerability;

pub use coverage::CoverageGate;
pub use signature::SignatureGate;
pub use vulnerability::{Severity, VulnerabilityGate};

use crate::core::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether a failing gate halts the run or is merely recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Failure halts the run.
    Blocking,
    /// Failure is recorded but the run continues.
    Advisory,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::Blocking
    }
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Advisory => write!(f, "advisory"),
        }
    }
}

/// The result of evaluating a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// The name of the gate that produced this verdict.
    pub gate: String,

    /// The gate's policy at evaluation time.
    pub policy: GatePolicy,

    /// Whether the gate passed.
    pub passed: bool,

    /// Human-readable explanation of the verdict.
    pub detail: String,
}

impl GateVerdict {
    /// Creates a passing verdict.
    #[must_use]
    pub fn pass(gate: impl Into<String>, policy: GatePolicy, detail: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            policy,
            passed: true,
            detail: detail.into(),
        }
    }

    /// Creates a failing verdict.
    #[must_use]
    pub fn fail(gate: impl Into<String>, policy: GatePolicy, detail: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            policy,
            passed: false,
            detail: detail.into(),
        }
    }

    /// Returns true if this verdict should halt the run.
    #[must_use]
    pub fn is_blocking_failure(&self) -> bool {
        !self.passed && self.policy == GatePolicy::Blocking
    }
}

/// Trait for gates evaluated against stage outputs.
///
/// The slice passed to [`Gate::evaluate`] holds the stage's freshly produced
/// artifacts followed by all previously stored artifacts, in production
/// order, so cross-checks (a signature over an image's hash) stay pure
/// functions of their inputs.
pub trait Gate: Send + Sync + fmt::Debug {
    /// Returns the gate's name, used in verdicts and failure reports.
    fn name(&self) -> &str;

    /// Returns the artifact kind this gate judges.
    fn applies_to(&self) -> ArtifactKind;

    /// Returns whether a failure halts the run.
    fn policy(&self) -> GatePolicy {
        GatePolicy::Blocking
    }

    /// Evaluates the gate against the available artifacts.
    fn evaluate(&self, artifacts: &[Arc<Artifact>]) -> GateVerdict;
}

/// Finds the first artifact of a kind in an evaluation pool.
pub(crate) fn find_kind(artifacts: &[Arc<Artifact>], kind: ArtifactKind) -> Option<&Arc<Artifact>> {
    artifacts.iter().find(|a| a.kind == kind)
}
