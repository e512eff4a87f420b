//! Content-addressed pipeline artifacts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The closed set of artifact kinds a pipeline can carry.
///
/// Exactly one stage in a graph produces each kind; consumers declare the
/// kinds they require and the graph derives dependency edges from the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Software bill of materials for the source tree.
    SourceSbom,
    /// Unit/integration test results.
    TestReport,
    /// Line/branch coverage metrics.
    CoverageReport,
    /// A built container image reference.
    Image,
    /// Software bill of materials for the built image.
    ImageSbom,
    /// Vulnerability scan findings for the image.
    ScanReport,
    /// A cryptographic signature over an image.
    Signature,
    /// The result of applying the deployment to a cluster.
    DeployResult,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceSbom => write!(f, "source_sbom"),
            Self::TestReport => write!(f, "test_report"),
            Self::CoverageReport => write!(f, "coverage_report"),
            Self::Image => write!(f, "image"),
            Self::ImageSbom => write!(f, "image_sbom"),
            Self::ScanReport => write!(f, "scan_report"),
            Self::Signature => write!(f, "signature"),
            Self::DeployResult => write!(f, "deploy_result"),
        }
    }
}

/// An immutable, content-addressed output of a pipeline stage.
///
/// The hash is a pure function of the payload; artifacts are never mutated
/// after creation, only superseded by a later artifact of the same kind.
/// Construction through [`Artifact::new`] is the only way to obtain one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// The kind of artifact.
    pub kind: ArtifactKind,

    /// The id of the stage that produced this artifact.
    pub produced_by: String,

    /// Lower-hex SHA-256 of the canonical JSON serialization of the payload.
    pub content_hash: String,

    /// The opaque artifact payload.
    pub payload: serde_json::Value,

    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl Artifact {
    /// Creates a new artifact, computing its content hash from the payload.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        produced_by: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let content_hash = hash_payload(&payload);
        Self {
            kind,
            produced_by: produced_by.into(),
            content_hash,
            payload,
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the store reference for this artifact.
    #[must_use]
    pub fn reference(&self) -> ArtifactRef {
        ArtifactRef {
            kind: self.kind,
            content_hash: self.content_hash.clone(),
        }
    }

    /// Reads a string field from the payload, if present.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(serde_json::Value::as_str)
    }

    /// Reads a numeric field from the payload, if present.
    #[must_use]
    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// A reference to a stored artifact: kind plus content hash.
///
/// References over byte-identical payloads compare equal, which is what
/// makes store `put` idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// The artifact kind.
    pub kind: ArtifactKind,

    /// The artifact's content hash.
    pub content_hash: String,
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, &self.content_hash)
    }
}

/// Computes the canonical content hash of a payload.
///
/// `serde_json::Value` renders maps in sorted key order, so logically equal
/// payloads always hash identically.
#[must_use]
pub(crate) fn hash_payload(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_artifact_creation() {
        let artifact = Artifact::new(
            ArtifactKind::TestReport,
            "unit-tests",
            serde_json::json!({"passed": 42, "failed": 0}),
        );

        assert_eq!(artifact.kind, ArtifactKind::TestReport);
        assert_eq!(artifact.produced_by, "unit-tests");
        assert_eq!(artifact.content_hash.len(), 64);
    }

    #[test]
    fn test_hash_is_pure_function_of_payload() {
        let payload = serde_json::json!({"coverage_percent": 83.5});
        let a = Artifact::new(ArtifactKind::CoverageReport, "unit-tests", payload.clone());
        let b = Artifact::new(ArtifactKind::CoverageReport, "other-stage", payload);

        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_different_payloads_hash_differently() {
        let a = Artifact::new(
            ArtifactKind::Image,
            "build",
            serde_json::json!({"tag": "app:1"}),
        );
        let b = Artifact::new(
            ArtifactKind::Image,
            "build",
            serde_json::json!({"tag": "app:2"}),
        );

        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_key_order_does_not_change_hash() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();

        assert_eq!(hash_payload(&a), hash_payload(&b));
    }

    #[test]
    fn test_reference_equality() {
        let payload = serde_json::json!({"tag": "app:1"});
        let a = Artifact::new(ArtifactKind::Image, "build", payload.clone());
        let b = Artifact::new(ArtifactKind::Image, "build", payload);

        assert_eq!(a.reference(), b.reference());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ArtifactKind::SourceSbom.to_string(), "source_sbom");
        assert_eq!(ArtifactKind::ScanReport.to_string(), "scan_report");
        assert_eq!(ArtifactKind::DeployResult.to_string(), "deploy_result");
    }

    #[test]
    fn test_kind_serialize() {
        let json = serde_json::to_string(&ArtifactKind::ImageSbom).unwrap();
        assert_eq!(json, r#""image_sbom""#);

        let kind: ArtifactKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, ArtifactKind::ImageSbom);
    }

    #[test]
    fn test_artifact_serialization_round_trip() {
        let artifact = Artifact::new(
            ArtifactKind::Signature,
            "sign-image",
            serde_json::json!({"subject_hash": "abc", "key_id": "release-key"}),
        );

        let json = serde_json::to_string(&artifact).unwrap();
        let deserialized: Artifact = serde_json::from_str(&json).unwrap();

        assert_eq!(artifact.content_hash, deserialized.content_hash);
        assert_eq!(artifact.kind, deserialized.kind);
    }
}
