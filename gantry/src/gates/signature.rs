//! Image signature gate.

use super::{find_kind, Gate, GatePolicy, GateVerdict};
use crate::core::{Artifact, ArtifactKind};
use std::collections::HashSet;
use std::sync::Arc;

/// Passes iff a valid signature exists for the image artifact.
///
/// A signature is valid when its `subject_hash` equals the image's content
/// hash and its `key_id` belongs to the configured trusted set. The gate
/// cross-checks against the [`ArtifactKind::Image`] artifact in the
/// evaluation pool; both an absent signature and an invalid one yield the
/// same failed verdict.
#[derive(Debug, Clone)]
pub struct SignatureGate {
    trusted_keys: HashSet<String>,
    policy: GatePolicy,
}

impl SignatureGate {
    /// Creates a blocking signature gate trusting the given key identifiers.
    #[must_use]
    pub fn new(trusted_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            trusted_keys: trusted_keys.into_iter().map(Into::into).collect(),
            policy: GatePolicy::Blocking,
        }
    }

    /// Sets the gate policy.
    #[must_use]
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn verifies(&self, signature: &Artifact, image_hash: &str) -> bool {
        let subject_matches = signature.payload_str("subject_hash") == Some(image_hash);
        let key_trusted = signature
            .payload_str("key_id")
            .is_some_and(|key| self.trusted_keys.contains(key));
        subject_matches && key_trusted
    }
}

impl Gate for SignatureGate {
    fn name(&self) -> &str {
        "signature"
    }

    fn applies_to(&self) -> ArtifactKind {
        ArtifactKind::Signature
    }

    fn policy(&self) -> GatePolicy {
        self.policy
    }

    fn evaluate(&self, artifacts: &[Arc<Artifact>]) -> GateVerdict {
        let Some(image) = find_kind(artifacts, ArtifactKind::Image) else {
            return GateVerdict::fail(self.name(), self.policy, "no image artifact to verify");
        };

        let valid = artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Signature)
            .find(|signature| self.verifies(signature, &image.content_hash));

        match valid {
            Some(signature) => GateVerdict::pass(
                self.name(),
                self.policy,
                format!(
                    "signature by '{}' verifies image {}",
                    signature.payload_str("key_id").unwrap_or("<unknown>"),
                    image.content_hash
                ),
            ),
            None => GateVerdict::fail(
                self.name(),
                self.policy,
                format!("no valid signature for image {}", image.content_hash),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Arc<Artifact> {
        Arc::new(Artifact::new(
            ArtifactKind::Image,
            "build-image",
            serde_json::json!({"tag": "app:1.0"}),
        ))
    }

    fn signature(subject_hash: &str, key_id: &str) -> Arc<Artifact> {
        Arc::new(Artifact::new(
            ArtifactKind::Signature,
            "sign-image",
            serde_json::json!({"subject_hash": subject_hash, "key_id": key_id}),
        ))
    }

    #[test]
    fn test_passes_with_valid_signature() {
        let image = image();
        let sig = signature(&image.content_hash, "release-key");
        let gate = SignatureGate::new(["release-key"]);

        let verdict = gate.evaluate(&[sig, image]);
        assert!(verdict.passed);
        assert!(verdict.detail.contains("release-key"));
    }

    #[test]
    fn test_fails_without_signature() {
        let image = image();
        let gate = SignatureGate::new(["release-key"]);

        let verdict = gate.evaluate(&[Arc::clone(&image)]);
        assert!(!verdict.passed);
        assert_eq!(
            verdict.detail,
            format!("no valid signature for image {}", image.content_hash)
        );
    }

    #[test]
    fn test_fails_on_subject_hash_mismatch() {
        let image = image();
        let sig = signature("deadbeef", "release-key");
        let gate = SignatureGate::new(["release-key"]);

        let verdict = gate.evaluate(&[sig, image]);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_fails_on_untrusted_key() {
        let image = image();
        let sig = signature(&image.content_hash, "rogue-key");
        let gate = SignatureGate::new(["release-key"]);

        let verdict = gate.evaluate(&[sig, image]);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_fails_without_image() {
        let gate = SignatureGate::new(["release-key"]);
        let verdict = gate.evaluate(&[signature("abc", "release-key")]);
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("no image artifact"));
    }

    #[test]
    fn test_any_valid_signature_suffices() {
        let image = image();
        let bad = signature("deadbeef", "release-key");
        let good = signature(&image.content_hash, "release-key");
        let gate = SignatureGate::new(["release-key"]);

        let verdict = gate.evaluate(&[bad, good, image]);
        assert!(verdict.passed);
    }
}
