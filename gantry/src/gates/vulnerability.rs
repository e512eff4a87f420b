//! Vulnerability scan gate.

use super::{find_kind, Gate, GatePolicy, GateVerdict};
use crate::core::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational or low-impact finding.
    Low,
    /// Medium-impact finding.
    Medium,
    /// High-impact finding.
    High,
    /// Critical finding.
    Critical,
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Passes iff the scan report's critical findings stay within a limit.
///
/// Reads the `findings` array from the [`ArtifactKind::ScanReport`] payload
/// and counts entries whose `severity` is `critical`. Findings with an
/// unrecognized or missing severity count as critical; the gate fails closed
/// rather than guessing.
#[derive(Debug, Clone)]
pub struct VulnerabilityGate {
    limit: u32,
    policy: GatePolicy,
}

impl VulnerabilityGate {
    /// Creates a blocking vulnerability gate with the given critical-finding
    /// limit.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
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

impl Gate for VulnerabilityGate {
    fn name(&self) -> &str {
        "vulnerability"
    }

    fn applies_to(&self) -> ArtifactKind {
        ArtifactKind::ScanReport
    }

    fn policy(&self) -> GatePolicy {
        self.policy
    }

    fn evaluate(&self, artifacts: &[Arc<Artifact>]) -> GateVerdict {
        let Some(report) = find_kind(artifacts, ArtifactKind::ScanReport) else {
            return GateVerdict::fail(self.name(), self.policy, "no scan report available");
        };

        let Some(findings) = report.payload.get("findings").and_then(|v| v.as_array()) else {
            return GateVerdict::fail(
                self.name(),
                self.policy,
                "scan report has no 'findings' array",
            );
        };

        let critical = findings
            .iter()
            .filter(|finding| {
                finding
                    .get("severity")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|s| Severity::from_str(s).ok())
                    .map_or(true, |severity| severity >= Severity::Critical)
            })
            .count();

        if critical <= self.limit as usize {
            GateVerdict::pass(
                self.name(),
                self.policy,
                format!("{critical} critical findings (limit {})", self.limit),
            )
        } else {
            GateVerdict::fail(
                self.name(),
                self.policy,
                format!("{critical} critical findings exceed limit {}", self.limit),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(findings: serde_json::Value) -> Vec<Arc<Artifact>> {
        vec![Arc::new(Artifact::new(
            ArtifactKind::ScanReport,
            "scan-image",
            serde_json::json!({ "findings": findings }),
        ))]
    }

    #[test]
    fn test_passes_with_no_findings() {
        let gate = VulnerabilityGate::new(0);
        let verdict = gate.evaluate(&scan(serde_json::json!([])));
        assert!(verdict.passed);
    }

    #[test]
    fn test_passes_with_only_low_findings() {
        let gate = VulnerabilityGate::new(0);
        let verdict = gate.evaluate(&scan(serde_json::json!([
            {"id": "CVE-2024-0001", "severity": "low"},
            {"id": "CVE-2024-0002", "severity": "high"},
        ])));
        assert!(verdict.passed);
    }

    #[test]
    fn test_fails_on_critical_finding() {
        let gate = VulnerabilityGate::new(0);
        let verdict = gate.evaluate(&scan(serde_json::json!([
            {"id": "CVE-2024-0003", "severity": "critical"},
        ])));
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("exceed limit 0"));
    }

    #[test]
    fn test_limit_tolerates_criticals() {
        let gate = VulnerabilityGate::new(1);
        let verdict = gate.evaluate(&scan(serde_json::json!([
            {"id": "CVE-2024-0003", "severity": "critical"},
        ])));
        assert!(verdict.passed);
    }

    #[test]
    fn test_unknown_severity_counts_as_critical() {
        let gate = VulnerabilityGate::new(0);
        let verdict = gate.evaluate(&scan(serde_json::json!([
            {"id": "CVE-2024-0004", "severity": "catastrophic"},
        ])));
        assert!(!verdict.passed);
    }

    #[test]
    fn test_fails_without_scan_report() {
        let gate = VulnerabilityGate::new(0);
        let verdict = gate.evaluate(&[]);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_parsing_is_case_insensitive() {
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!("Low".parse::<Severity>(), Ok(Severity::Low));
        assert!("unknown".parse::<Severity>().is_err());
    }
}
