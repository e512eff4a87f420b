//! # Gantry
//!
//! A fail-closed orchestration core for delivery pipelines.
//!
//! Gantry executes a DAG of stages that exchange typed, content-addressed
//! artifacts, with support for:
//!
//! - **Kind-derived dependencies**: edges come from declared input/output
//!   artifact kinds, not from declaration order
//! - **Fail-closed gates**: blocking security/quality gates halt the run;
//!   advisory gates are recorded only
//! - **Batch-barrier parallelism**: independent stages run concurrently,
//!   one topological level at a time
//! - **Audit trail**: every run produces an append-only record of stage
//!   attempts and gate verdicts
//! - **Cooperative cancellation**: runs abort at batch boundaries, late
//!   results are discarded
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gantry::prelude::*;
//!
//! // Declare stages by the artifact kinds they consume and produce
//! let graph = PipelineGraph::build(vec![
//!     StageSpec::new("unit-tests").with_output(ArtifactKind::CoverageReport),
//!     StageSpec::new("build-image")
//!         .with_input(ArtifactKind::CoverageReport)
//!         .with_output(ArtifactKind::Image),
//! ])?;
//!
//! // Bind executors and run
//! let outcome = Orchestrator::new()
//!     .bind("unit-tests", test_runner)
//!     .bind("build-image", image_builder)
//!     .run(&graph, RunContext::new(PipelineConfig::default()))
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executors;
pub mod gates;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::PipelineConfig;
    pub use crate::context::{RunContext, RunIdentity};
    pub use crate::core::{Artifact, ArtifactKind, ArtifactRef, RunState, StageOutcome};
    pub use crate::errors::{
        ConfigError, ExecutionError, GantryError, GraphError, StoreError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executors::{ExecutorCapability, FnExecutor, NoOpExecutor};
    pub use crate::gates::{
        CoverageGate, Gate, GatePolicy, GateVerdict, SignatureGate, VulnerabilityGate,
    };
    pub use crate::pipeline::{
        Orchestrator, PipelineGraph, RunFailure, RunOutcome, StageId, StageSpec,
    };
    pub use crate::record::{RunRecord, StageAttempt};
    pub use crate::store::ArtifactStore;
    pub use crate::utils::{iso_timestamp, now_utc, Timestamp};
}
