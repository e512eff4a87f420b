//! Error types for the gantry orchestration core.
//!
//! The taxonomy separates construction-time errors (an unusable graph or
//! configuration) from execution-time errors (a capability reporting
//! failure) and store errors (an ordering bug). Gate failures are ordinary
//! verdicts, not errors; they surface through `RunOutcome`.

use crate::core::ArtifactKind;
use thiserror::Error;

/// The main error type for gantry operations.
#[derive(Debug, Error)]
pub enum GantryError {
    /// A pipeline graph could not be constructed.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// A configuration value was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An executor capability reported failure.
    #[error("{0}")]
    Execution(#[from] ExecutionError),

    /// An artifact store lookup failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while building a pipeline graph.
///
/// All of these are fatal and raised before any run starts; the graph is
/// unusable until the stage set is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The derived dependency edges contain a cycle.
    #[error("Cycle detected in pipeline: {}", path.join(" -> "))]
    Cycle {
        /// The path of stage ids forming the cycle.
        path: Vec<String>,
    },

    /// Two stages declare the same output artifact kind.
    #[error("Artifact kind '{kind}' has ambiguous producers: '{first}' and '{second}'")]
    DuplicateProducer {
        /// The contested artifact kind.
        kind: ArtifactKind,
        /// The stage that declared the kind first.
        first: String,
        /// The stage that declared it again.
        second: String,
    },

    /// A stage requires an input kind no stage produces.
    #[error("Stage '{stage}' requires input '{kind}' which no stage produces")]
    DanglingInput {
        /// The consuming stage id.
        stage: String,
        /// The unproduced artifact kind.
        kind: ArtifactKind,
    },

    /// Two stages share an id.
    #[error("Duplicate stage id '{id}'")]
    DuplicateStage {
        /// The repeated stage id.
        id: String,
    },

    /// The stage set is empty.
    #[error("Pipeline graph must contain at least one stage")]
    Empty,
}

/// Error reported by an executor capability.
///
/// Carries the external tool's message verbatim; the orchestrator records
/// it in the run record and never swallows it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// The executor's failure message.
    pub message: String,
}

impl ExecutionError {
    /// Creates a new execution error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ExecutionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ExecutionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for ExecutionError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
        }
    }
}

/// Errors raised by the artifact store.
///
/// A `NotFound` indicates a graph/ordering bug (a stage asked for an input
/// not yet produced) and is treated as fatal, distinct from expected
/// operational failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No artifact of the requested kind has been stored.
    #[error("No artifact of kind '{kind}' in store")]
    NotFound {
        /// The requested artifact kind.
        kind: ArtifactKind,
    },

    /// No artifact of the requested kind was produced by the given stage.
    #[error("No artifact of kind '{kind}' produced by stage '{stage}'")]
    NotProducedBy {
        /// The requested artifact kind.
        kind: ArtifactKind,
        /// The provenance filter that matched nothing.
        stage: String,
    },
}

/// Errors raised while parsing a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration map contained a key the core does not recognize.
    #[error("Unknown configuration key '{key}'")]
    UnknownKey {
        /// The rejected key.
        key: String,
    },

    /// A recognized key carried an unparseable value.
    #[error("Invalid value '{value}' for configuration key '{key}'")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// The rejected value.
        value: String,
    },
}
