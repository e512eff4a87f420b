//! Stage specifications.

use crate::core::ArtifactKind;
use crate::gates::Gate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A stage identifier, unique within a graph.
pub type StageId = String;

/// Declaration of a single pipeline stage.
///
/// A stage names the artifact kinds it requires and produces; dependency
/// edges are derived from the match, never declared directly. The attached
/// gates run against the stage's outputs in declaration order.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique id of the stage.
    pub id: StageId,

    /// Required input kinds, in the order the executor receives them.
    pub inputs: Vec<ArtifactKind>,

    /// Output kinds the executor must produce.
    pub outputs: Vec<ArtifactKind>,

    /// Gates evaluated against the outputs, in declaration order.
    pub gates: Vec<Arc<dyn Gate>>,

    /// Configuration handed verbatim to the executor.
    pub config: HashMap<String, String>,

    /// Executor deadline override; wins over the pipeline configuration.
    pub timeout: Option<Duration>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(id: impl Into<StageId>) -> Self {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            gates: Vec::new(),
            config: HashMap::new(),
            timeout: None,
        }
    }

    /// Adds a required input kind.
    #[must_use]
    pub fn with_input(mut self, kind: ArtifactKind) -> Self {
        self.inputs.push(kind);
        self
    }

    /// Adds required input kinds.
    #[must_use]
    pub fn with_inputs(mut self, kinds: impl IntoIterator<Item = ArtifactKind>) -> Self {
        self.inputs.extend(kinds);
        self
    }

    /// Adds a produced output kind.
    #[must_use]
    pub fn with_output(mut self, kind: ArtifactKind) -> Self {
        self.outputs.push(kind);
        self
    }

    /// Adds produced output kinds.
    #[must_use]
    pub fn with_outputs(mut self, kinds: impl IntoIterator<Item = ArtifactKind>) -> Self {
        self.outputs.extend(kinds);
        self
    }

    /// Attaches a gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn Gate>) -> Self {
        self.gates.push(gate);
        self
    }

    /// Adds an executor configuration entry.
    #[must_use]
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Sets the executor deadline override.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::CoverageGate;

    #[test]
    fn test_stage_spec_builders() {
        let spec = StageSpec::new("unit-tests")
            .with_output(ArtifactKind::TestReport)
            .with_output(ArtifactKind::CoverageReport)
            .with_gate(Arc::new(CoverageGate::new(80)))
            .with_config_entry("suite", "fast")
            .with_timeout(Duration::from_secs(300));

        assert_eq!(spec.id, "unit-tests");
        assert_eq!(
            spec.outputs,
            vec![ArtifactKind::TestReport, ArtifactKind::CoverageReport]
        );
        assert_eq!(spec.gates.len(), 1);
        assert_eq!(spec.config.get("suite").map(String::as_str), Some("fast"));
        assert_eq!(spec.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_input_order_is_preserved() {
        let spec = StageSpec::new("deploy")
            .with_inputs([ArtifactKind::Image, ArtifactKind::Signature]);

        assert_eq!(spec.inputs, vec![ArtifactKind::Image, ArtifactKind::Signature]);
    }
}
