//! Pipeline graph construction and scheduling queries.
//!
//! Dependency edges are derived by matching each stage's required input
//! kinds to the unique stage producing that kind. Validation happens at
//! construction; a graph that builds is acyclic, has one producer per kind,
//! and every input reachable from a strict ancestor.

use super::spec::{StageId, StageSpec};
use crate::core::ArtifactKind;
use crate::errors::GraphError;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// A validated DAG of stages.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    stages: Vec<StageSpec>,
    index: HashMap<StageId, usize>,
    producers: HashMap<ArtifactKind, StageId>,
    dependencies: HashMap<StageId, BTreeSet<StageId>>,
    execution_order: Vec<StageId>,
}

impl PipelineGraph {
    /// Builds a graph from stage specifications.
    ///
    /// # Errors
    ///
    /// * [`GraphError::Empty`] for an empty stage set
    /// * [`GraphError::DuplicateStage`] for a repeated stage id
    /// * [`GraphError::DuplicateProducer`] when two stages declare the same
    ///   output kind
    /// * [`GraphError::DanglingInput`] when a required kind has no producer
    /// * [`GraphError::Cycle`] when the derived edges contain a cycle
    pub fn build(stages: Vec<StageSpec>) -> Result<Self, GraphError> {
        if stages.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index: HashMap<StageId, usize> = HashMap::new();
        for (pos, spec) in stages.iter().enumerate() {
            if index.insert(spec.id.clone(), pos).is_some() {
                return Err(GraphError::DuplicateStage {
                    id: spec.id.clone(),
                });
            }
        }

        let mut producers: HashMap<ArtifactKind, StageId> = HashMap::new();
        for spec in &stages {
            for kind in &spec.outputs {
                if let Some(first) = producers.get(kind) {
                    return Err(GraphError::DuplicateProducer {
                        kind: *kind,
                        first: first.clone(),
                        second: spec.id.clone(),
                    });
                }
                producers.insert(*kind, spec.id.clone());
            }
        }

        let mut dependencies: HashMap<StageId, BTreeSet<StageId>> = HashMap::new();
        for spec in &stages {
            let deps = dependencies.entry(spec.id.clone()).or_default();
            for kind in &spec.inputs {
                match producers.get(kind) {
                    Some(producer) => {
                        deps.insert(producer.clone());
                    }
                    None => {
                        return Err(GraphError::DanglingInput {
                            stage: spec.id.clone(),
                            kind: *kind,
                        });
                    }
                }
            }
        }

        // Topological validation, visiting in declaration order for a
        // deterministic execution order.
        let mut state: HashMap<StageId, Mark> = HashMap::new();
        let mut stack: Vec<StageId> = Vec::new();
        let mut execution_order: Vec<StageId> = Vec::new();
        for spec in &stages {
            visit(
                &spec.id,
                &dependencies,
                &mut state,
                &mut stack,
                &mut execution_order,
            )?;
        }

        Ok(Self {
            stages,
            index,
            producers,
            dependencies,
            execution_order,
        })
    }

    /// Returns every stage whose dependencies are all completed and which is
    /// not yet completed, in declaration order with ties broken by id.
    ///
    /// Deterministic: the same completed set always yields the identical
    /// sequence.
    #[must_use]
    pub fn ready_stages(&self, completed: &HashSet<StageId>) -> Vec<StageId> {
        let mut ready: Vec<(usize, &StageId)> = self
            .stages
            .iter()
            .enumerate()
            .filter(|(_, spec)| !completed.contains(&spec.id))
            .filter(|(_, spec)| {
                self.dependencies
                    .get(&spec.id)
                    .map_or(true, |deps| deps.iter().all(|d| completed.contains(d)))
            })
            .map(|(pos, spec)| (pos, &spec.id))
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        ready.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Returns the stage specifications, in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns a stage by id.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&StageSpec> {
        self.index.get(id).map(|&pos| &self.stages[pos])
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the stage that produces an artifact kind, if any.
    #[must_use]
    pub fn producer_of(&self, kind: ArtifactKind) -> Option<&StageId> {
        self.producers.get(&kind)
    }

    /// Returns the derived dependencies of a stage.
    #[must_use]
    pub fn dependencies_of(&self, id: &str) -> Vec<StageId> {
        self.dependencies
            .get(id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a topologically sorted execution order, for diagnostics.
    #[must_use]
    pub fn execution_order(&self) -> &[StageId] {
        &self.execution_order
    }
}

fn visit(
    id: &StageId,
    dependencies: &HashMap<StageId, BTreeSet<StageId>>,
    state: &mut HashMap<StageId, Mark>,
    stack: &mut Vec<StageId>,
    order: &mut Vec<StageId>,
) -> Result<(), GraphError> {
    match state.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Active) => {
            let start = stack.iter().position(|s| s == id).unwrap_or(0);
            let mut path: Vec<StageId> = stack[start..].to_vec();
            path.push(id.clone());
            return Err(GraphError::Cycle { path });
        }
        None => {}
    }

    state.insert(id.clone(), Mark::Active);
    stack.push(id.clone());
    if let Some(deps) = dependencies.get(id) {
        for dep in deps {
            visit(dep, dependencies, state, stack, order)?;
        }
    }
    stack.pop();
    state.insert(id.clone(), Mark::Done);
    order.push(id.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn delivery_stages() -> Vec<StageSpec> {
        vec![
            StageSpec::new("source-sbom").with_output(ArtifactKind::SourceSbom),
            StageSpec::new("unit-tests")
                .with_output(ArtifactKind::TestReport)
                .with_output(ArtifactKind::CoverageReport),
            StageSpec::new("build-image")
                .with_input(ArtifactKind::TestReport)
                .with_output(ArtifactKind::Image),
            StageSpec::new("scan-image")
                .with_input(ArtifactKind::Image)
                .with_output(ArtifactKind::ScanReport),
            StageSpec::new("sign-image")
                .with_input(ArtifactKind::Image)
                .with_output(ArtifactKind::Signature),
            StageSpec::new("deploy")
                .with_inputs([
                    ArtifactKind::Image,
                    ArtifactKind::ScanReport,
                    ArtifactKind::Signature,
                ])
                .with_output(ArtifactKind::DeployResult),
        ]
    }

    #[test]
    fn test_build_succeeds_for_acyclic_unique_producers() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        assert_eq!(graph.stage_count(), 6);
        assert_eq!(
            graph.producer_of(ArtifactKind::Image),
            Some(&"build-image".to_string())
        );
    }

    #[test]
    fn test_edges_derived_from_kinds() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        assert_eq!(graph.dependencies_of("build-image"), vec!["unit-tests"]);
        assert_eq!(
            graph.dependencies_of("deploy"),
            vec!["build-image", "scan-image", "sign-image"]
        );
        assert!(graph.dependencies_of("source-sbom").is_empty());
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert_eq!(PipelineGraph::build(Vec::new()).unwrap_err(), GraphError::Empty);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = PipelineGraph::build(vec![
            StageSpec::new("unit-tests").with_output(ArtifactKind::TestReport),
            StageSpec::new("unit-tests").with_output(ArtifactKind::CoverageReport),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateStage {
                id: "unit-tests".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_producer_rejected() {
        let err = PipelineGraph::build(vec![
            StageSpec::new("build-a").with_output(ArtifactKind::Image),
            StageSpec::new("build-b").with_output(ArtifactKind::Image),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateProducer {
                kind: ArtifactKind::Image,
                first: "build-a".to_string(),
                second: "build-b".to_string(),
            }
        );
    }

    #[test]
    fn test_dangling_input_rejected() {
        let err = PipelineGraph::build(vec![StageSpec::new("deploy")
            .with_input(ArtifactKind::Image)
            .with_output(ArtifactKind::DeployResult)])
        .unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingInput {
                stage: "deploy".to_string(),
                kind: ArtifactKind::Image,
            }
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let err = PipelineGraph::build(vec![
            StageSpec::new("a")
                .with_input(ArtifactKind::Signature)
                .with_output(ArtifactKind::Image),
            StageSpec::new("b")
                .with_input(ArtifactKind::Image)
                .with_output(ArtifactKind::Signature),
        ])
        .unwrap_err();
        let GraphError::Cycle { path } = err else {
            panic!("expected cycle error, got {err:?}");
        };
        assert_eq!(path.first(), path.last());
        assert!(path.len() >= 3);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = PipelineGraph::build(vec![StageSpec::new("a")
            .with_input(ArtifactKind::Image)
            .with_output(ArtifactKind::Image)])
        .unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn test_ready_stages_initial_batch() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        let ready = graph.ready_stages(&HashSet::new());
        assert_eq!(ready, vec!["source-sbom", "unit-tests"]);
    }

    #[test]
    fn test_ready_stages_after_progress() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        let completed: HashSet<StageId> = ["source-sbom", "unit-tests", "build-image"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let ready = graph.ready_stages(&completed);
        assert_eq!(ready, vec!["scan-image", "sign-image"]);
    }

    #[test]
    fn test_ready_stages_is_deterministic() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        let completed: HashSet<StageId> =
            ["source-sbom", "unit-tests"].iter().map(ToString::to_string).collect();

        let first = graph.ready_stages(&completed);
        for _ in 0..10 {
            assert_eq!(graph.ready_stages(&completed), first);
        }
    }

    #[test]
    fn test_execution_order_respects_dependencies() {
        let graph = PipelineGraph::build(delivery_stages()).unwrap();
        let order = graph.execution_order();

        let pos = |id: &str| order.iter().position(|s| s == id).unwrap();
        assert!(pos("unit-tests") < pos("build-image"));
        assert!(pos("build-image") < pos("scan-image"));
        assert!(pos("build-image") < pos("sign-image"));
        assert!(pos("scan-image") < pos("deploy"));
        assert!(pos("sign-image") < pos("deploy"));
    }
}
