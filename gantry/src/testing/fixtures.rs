//! Artifact fixtures for tests.

use crate::core::{Artifact, ArtifactKind};

/// Initializes a tracing subscriber for test output.
///
/// Safe to call from multiple tests; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// A source SBOM artifact.
#[must_use]
pub fn source_sbom(stage_id: &str) -> Artifact {
    Artifact::new(
        ArtifactKind::SourceSbom,
        stage_id,
        serde_json::json!({"format": "spdx", "packages": 120}),
    )
}

/// A test report artifact.
#[must_use]
pub fn test_report(stage_id: &str, passed: u32, failed: u32) -> Artifact {
    Artifact::new(
        ArtifactKind::TestReport,
        stage_id,
        serde_json::json!({"passed": passed, "failed": failed}),
    )
}

/// A coverage report artifact.
#[must_use]
pub fn coverage_report(stage_id: &str, percent: f64) -> Artifact {
    Artifact::new(
        ArtifactKind::CoverageReport,
        stage_id,
        serde_json::json!({"coverage_percent": percent}),
    )
}

/// An image artifact.
#[must_use]
pub fn image(stage_id: &str, tag: &str) -> Artifact {
    Artifact::new(
        ArtifactKind::Image,
        stage_id,
        serde_json::json!({"tag": tag}),
    )
}

/// An image SBOM artifact.
#[must_use]
pub fn image_sbom(stage_id: &str) -> Artifact {
    Artifact::new(
        ArtifactKind::ImageSbom,
        stage_id,
        serde_json::json!({"format": "spdx", "packages": 87}),
    )
}

/// A scan report artifact with the given number of critical findings.
#[must_use]
pub fn scan_report(stage_id: &str, critical_findings: usize) -> Artifact {
    let findings: Vec<serde_json::Value> = (0..critical_findings)
        .map(|n| serde_json::json!({"id": format!("CVE-2024-{n:04}"), "severity": "critical"}))
        .collect();
    Artifact::new(
        ArtifactKind::ScanReport,
        stage_id,
        serde_json::json!({"findings": findings}),
    )
}

/// A signature artifact over the given subject hash.
#[must_use]
pub fn signature(stage_id: &str, subject_hash: &str, key_id: &str) -> Artifact {
    Artifact::new(
        ArtifactKind::Signature,
        stage_id,
        serde_json::json!({"subject_hash": subject_hash, "key_id": key_id}),
    )
}

/// A deploy result artifact.
#[must_use]
pub fn deploy_result(stage_id: &str) -> Artifact {
    Artifact::new(
        ArtifactKind::DeployResult,
        stage_id,
        serde_json::json!({"applied": true, "replicas": 3}),
    )
}
