//! Coverage threshold gate.

use super::{find_kind, Gate, GatePolicy, GateVerdict};
use crate::core::{Artifact, ArtifactKind};
use std::sync::Arc;

/// Passes iff the coverage report meets a minimum percentage.
///
/// Reads `coverage_percent` from the [`ArtifactKind::CoverageReport`]
/// payload. A missing report or malformed payload fails the gate rather
/// than passing it.
#[derive(Debug, Clone)]
pub struct CoverageGate {
    threshold: u32,
    policy: GatePolicy,
}

impl CoverageGate {
    /// Creates a blocking coverage gate with the given threshold.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            policy: GatePolicy::Blocking,
        }
    }

    /// Sets the gate policy.
    #[must_use]
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Gate for CoverageGate {
    fn name(&self) -> &str {
        "coverage"
    }

    fn applies_to(&self) -> ArtifactKind {
        ArtifactKind::CoverageReport
    }

    fn policy(&self) -> GatePolicy {
        self.policy
    }

    fn evaluate(&self, artifacts: &[Arc<Artifact>]) -> GateVerdict {
        let Some(report) = find_kind(artifacts, ArtifactKind::CoverageReport) else {
            return GateVerdict::fail(self.name(), self.policy, "no coverage report available");
        };

        let Some(percent) = report.payload_f64("coverage_percent") else {
            return GateVerdict::fail(
                self.name(),
                self.policy,
                "coverage report has no 'coverage_percent' field",
            );
        };

        if percent >= f64::from(self.threshold) {
            GateVerdict::pass(
                self.name(),
                self.policy,
                format!("coverage {percent}% meets threshold {}%", self.threshold),
            )
        } else {
            GateVerdict::fail(
                self.name(),
                self.policy,
                format!("coverage {percent}% is below threshold {}%", self.threshold),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(percent: f64) -> Vec<Arc<Artifact>> {
        vec![Arc::new(Artifact::new(
            ArtifactKind::CoverageReport,
            "unit-tests",
            serde_json::json!({ "coverage_percent": percent }),
        ))]
    }

    #[test]
    fn test_passes_at_threshold() {
        let gate = CoverageGate::new(80);
        let verdict = gate.evaluate(&coverage(80.0));
        assert!(verdict.passed);
    }

    #[test]
    fn test_fails_below_threshold() {
        let gate = CoverageGate::new(80);
        let verdict = gate.evaluate(&coverage(75.0));
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("below threshold"));
    }

    #[test]
    fn test_fails_without_report() {
        let gate = CoverageGate::new(80);
        let verdict = gate.evaluate(&[]);
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("no coverage report"));
    }

    #[test]
    fn test_fails_on_malformed_payload() {
        let gate = CoverageGate::new(80);
        let artifacts = vec![Arc::new(Artifact::new(
            ArtifactKind::CoverageReport,
            "unit-tests",
            serde_json::json!({ "lines": 1200 }),
        ))];
        let verdict = gate.evaluate(&artifacts);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let gate = CoverageGate::new(80);
        let artifacts = coverage(92.5);

        let first = gate.evaluate(&artifacts);
        let second = gate.evaluate(&artifacts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_advisory_policy_carried_in_verdict() {
        let gate = CoverageGate::new(80).with_policy(GatePolicy::Advisory);
        let verdict = gate.evaluate(&coverage(10.0));
        assert!(!verdict.passed);
        assert!(!verdict.is_blocking_failure());
    }
}
