//! Batch-barrier orchestration of a pipeline graph.
//!
//! The orchestrator dispatches every member of the current ready batch
//! concurrently, waits for all of them to settle, then decides whether to
//! continue. Suspension points are solely the executor await and the batch
//! join. A blocking gate failure or executor error halts scheduling; the
//! run record always ends up covering every stage in the graph.

use super::graph::PipelineGraph;
use super::spec::{StageId, StageSpec};
use crate::context::RunContext;
use crate::core::{Artifact, ArtifactKind, ArtifactRef, RunState};
use crate::executors::ExecutorCapability;
use crate::gates::GateVerdict;
use crate::record::{RunRecord, StageAttempt};
use crate::utils::iso_timestamp;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// A failure that contributed to a non-successful run outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunFailure {
    /// The stage's executor reported an error.
    #[error("Stage '{stage}' executor failed: {message}")]
    ExecutorFailed {
        /// The failing stage.
        stage: StageId,
        /// The executor's message, verbatim.
        message: String,
    },

    /// The stage's executor exceeded its deadline.
    #[error("Stage '{stage}' timed out after {seconds}s")]
    TimedOut {
        /// The failing stage.
        stage: StageId,
        /// The deadline that was exceeded.
        seconds: u64,
    },

    /// The executor succeeded but a declared output kind is missing.
    #[error("Stage '{stage}' did not produce declared output '{kind}'")]
    MissingOutput {
        /// The failing stage.
        stage: StageId,
        /// The undelivered output kind.
        kind: ArtifactKind,
    },

    /// A blocking gate rejected the stage's outputs.
    #[error("Stage '{stage}' blocked by gate '{gate}': {detail}")]
    BlockingGate {
        /// The gated stage.
        stage: StageId,
        /// The gate that failed.
        gate: String,
        /// The gate's verdict detail.
        detail: String,
    },

    /// A declared input was not in the store when the stage started.
    ///
    /// Indicates a graph/ordering bug rather than an operational failure.
    #[error("Stage '{stage}' input '{kind}' unavailable: {message}")]
    InputUnavailable {
        /// The consuming stage.
        stage: StageId,
        /// The missing input kind.
        kind: ArtifactKind,
        /// The store's error message.
        message: String,
    },

    /// No executor capability was bound for a stage.
    #[error("No executor bound for stage '{stage}'")]
    MissingExecutor {
        /// The unbound stage.
        stage: StageId,
    },

    /// The run was cancelled externally.
    #[error("Run cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

/// The structured result of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The terminal run state.
    pub state: RunState,

    /// Contributing failures, in the order encountered.
    pub failures: Vec<RunFailure>,

    /// The run record snapshot: one attempt per stage.
    pub attempts: Vec<StageAttempt>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl RunOutcome {
    /// Returns true if every stage succeeded and no blocking gate failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Returns the first contributing failure, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&RunFailure> {
        self.failures.first()
    }

    /// Returns the recorded attempt for a stage, if any.
    #[must_use]
    pub fn attempt(&self, stage_id: &str) -> Option<&StageAttempt> {
        self.attempts.iter().find(|a| a.stage_id == stage_id)
    }
}

/// Walks a pipeline graph in dependency order, invoking bound executors and
/// enforcing gates after each stage.
#[derive(Default)]
pub struct Orchestrator {
    executors: HashMap<StageId, Arc<dyn ExecutorCapability>>,
}

impl Orchestrator {
    /// Creates an orchestrator with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an executor capability to a stage id.
    #[must_use]
    pub fn bind(
        mut self,
        stage_id: impl Into<StageId>,
        executor: Arc<dyn ExecutorCapability>,
    ) -> Self {
        self.executors.insert(stage_id.into(), executor);
        self
    }

    /// Runs the graph to a terminal state.
    ///
    /// Every error surfaces in the returned [`RunOutcome`]; nothing is
    /// logged-and-ignored inside the core.
    pub async fn run(&self, graph: &PipelineGraph, ctx: RunContext) -> RunOutcome {
        let start = Instant::now();
        let record = RunRecord::new();
        let mut failures: Vec<RunFailure> = Vec::new();

        // Fail closed before scheduling anything if a binding is missing.
        for spec in graph.stages() {
            if !self.executors.contains_key(&spec.id) {
                failures.push(RunFailure::MissingExecutor {
                    stage: spec.id.clone(),
                });
            }
        }
        if !failures.is_empty() {
            for spec in graph.stages() {
                record.append(StageAttempt::skipped(spec.id.clone()));
            }
            return finish(RunState::Failed, failures, &record, &ctx, start);
        }

        ctx.events().try_emit(
            "run.started",
            Some(json!({
                "run_id": ctx.identity().run_id.to_string(),
                "stages": graph.stage_count(),
            })),
        );

        let mut completed: HashSet<StageId> = HashSet::new();
        let mut attempted: HashSet<StageId> = HashSet::new();
        let mut aborted = false;

        while completed.len() < graph.stage_count() {
            if ctx.cancellation().is_cancelled() {
                failures.push(cancelled_failure(&ctx));
                aborted = true;
                break;
            }

            let batch = graph.ready_stages(&completed);
            if batch.is_empty() {
                // every remaining stage sits behind a recorded failure
                debug_assert!(
                    !failures.is_empty(),
                    "ready set starved without a recorded failure"
                );
                break;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for stage_id in &batch {
                if let (Some(spec), Some(executor)) =
                    (graph.stage(stage_id), self.executors.get(stage_id))
                {
                    handles.push(tokio::spawn(execute_stage(
                        spec.clone(),
                        Arc::clone(executor),
                        ctx.clone(),
                    )));
                }
            }
            // batch ids come from the graph and bindings were validated, so
            // the handle list pairs one-to-one with the batch
            debug_assert_eq!(handles.len(), batch.len());
            let settled = join_all(handles).await;

            if ctx.cancellation().is_cancelled() {
                // results arriving after cancellation are discarded, never stored
                failures.push(cancelled_failure(&ctx));
                aborted = true;
                break;
            }

            let mut halted = false;
            for (stage_id, joined) in batch.iter().zip(settled) {
                attempted.insert(stage_id.clone());
                let execution = joined
                    .unwrap_or_else(|e| StageExecution::panicked(&e.to_string()));
                let StageExecution {
                    started_at,
                    finished_at,
                    result,
                } = execution;

                match result {
                    Ok(outputs) => {
                        if halted {
                            // An earlier sibling in this batch failed a
                            // blocking check; this stage ran to completion
                            // but its outputs are discarded, never stored.
                            let produced: Vec<ArtifactRef> =
                                outputs.iter().map(Artifact::reference).collect();
                            record.append(StageAttempt::success(
                                stage_id.clone(),
                                started_at,
                                finished_at,
                                produced,
                                Vec::new(),
                            ));
                            continue;
                        }

                        let Some(spec) = graph.stage(stage_id) else {
                            continue;
                        };

                        if let Some(kind) = first_missing_output(spec, &outputs) {
                            failures.push(RunFailure::MissingOutput {
                                stage: stage_id.clone(),
                                kind,
                            });
                            record.append(StageAttempt::failed(
                                stage_id.clone(),
                                started_at,
                                finished_at,
                                format!("declared output '{kind}' was not produced"),
                                Vec::new(),
                            ));
                            halted = true;
                            continue;
                        }

                        // Snapshot the prior pool, then store the fresh outputs.
                        let prior = ctx.store().artifacts();
                        let fresh: Vec<Arc<Artifact>> =
                            outputs.into_iter().map(Arc::new).collect();
                        let produced: Vec<ArtifactRef> = fresh
                            .iter()
                            .map(|a| ctx.store().put_shared(Arc::clone(a)))
                            .collect();

                        // Gates see the fresh outputs first, then everything
                        // stored before this stage, in production order.
                        let mut pool = fresh;
                        pool.extend(prior);

                        let mut verdicts: Vec<GateVerdict> =
                            Vec::with_capacity(spec.gates.len());
                        let mut blocking: Option<GateVerdict> = None;
                        for gate in &spec.gates {
                            let verdict = gate.evaluate(&pool);
                            let event = if verdict.passed {
                                "gate.passed"
                            } else {
                                "gate.failed"
                            };
                            ctx.events().try_emit(
                                event,
                                Some(json!({
                                    "stage": stage_id,
                                    "gate": verdict.gate,
                                    "policy": verdict.policy.to_string(),
                                    "detail": verdict.detail,
                                })),
                            );
                            if blocking.is_none() && verdict.is_blocking_failure() {
                                blocking = Some(verdict.clone());
                            }
                            verdicts.push(verdict);
                        }

                        if let Some(verdict) = blocking {
                            failures.push(RunFailure::BlockingGate {
                                stage: stage_id.clone(),
                                gate: verdict.gate.clone(),
                                detail: verdict.detail.clone(),
                            });
                            record.append(
                                StageAttempt::failed(
                                    stage_id.clone(),
                                    started_at,
                                    finished_at,
                                    format!(
                                        "gate '{}' failed: {}",
                                        verdict.gate, verdict.detail
                                    ),
                                    verdicts,
                                )
                                .with_produced(produced),
                            );
                            halted = true;
                        } else {
                            record.append(StageAttempt::success(
                                stage_id.clone(),
                                started_at,
                                finished_at,
                                produced,
                                verdicts,
                            ));
                            completed.insert(stage_id.clone());
                        }
                    }
                    Err(fault) => {
                        let failure = fault.into_failure(stage_id.clone());
                        record.append(StageAttempt::failed(
                            stage_id.clone(),
                            started_at,
                            finished_at,
                            failure.to_string(),
                            Vec::new(),
                        ));
                        failures.push(failure);
                        halted = true;
                    }
                }
            }

            if halted {
                break;
            }
        }

        // The audit trail covers the whole graph: stages never scheduled are
        // recorded as skipped.
        if completed.len() < graph.stage_count() {
            for spec in graph.stages() {
                if !attempted.contains(&spec.id) {
                    ctx.events()
                        .try_emit("stage.skipped", Some(json!({"stage": spec.id})));
                    record.append(StageAttempt::skipped(spec.id.clone()));
                }
            }
        }

        let state = if aborted {
            RunState::Aborted
        } else if failures.is_empty() && completed.len() == graph.stage_count() {
            RunState::Succeeded
        } else {
            RunState::Failed
        };
        finish(state, failures, &record, &ctx, start)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bound: Vec<&StageId> = self.executors.keys().collect();
        bound.sort();
        f.debug_struct("Orchestrator").field("bound", &bound).finish()
    }
}

fn finish(
    state: RunState,
    failures: Vec<RunFailure>,
    record: &RunRecord,
    ctx: &RunContext,
    start: Instant,
) -> RunOutcome {
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    ctx.events().try_emit(
        "run.finished",
        Some(json!({
            "state": state.to_string(),
            "failures": failures.len(),
            "duration_ms": duration_ms,
        })),
    );
    RunOutcome {
        state,
        failures,
        attempts: record.snapshot(),
        duration_ms,
    }
}

fn cancelled_failure(ctx: &RunContext) -> RunFailure {
    let reason = ctx
        .cancellation()
        .reason()
        .unwrap_or_else(|| "cancellation requested".to_string());
    ctx.events()
        .try_emit("run.cancelled", Some(json!({"reason": reason})));
    RunFailure::Cancelled { reason }
}

fn first_missing_output(spec: &StageSpec, outputs: &[Artifact]) -> Option<ArtifactKind> {
    spec.outputs
        .iter()
        .copied()
        .find(|kind| !outputs.iter().any(|a| a.kind == *kind))
}

/// The settled result of one stage invocation.
struct StageExecution {
    started_at: String,
    finished_at: String,
    result: Result<Vec<Artifact>, StageFault>,
}

impl StageExecution {
    fn panicked(message: &str) -> Self {
        let now = iso_timestamp();
        Self {
            started_at: now.clone(),
            finished_at: now,
            result: Err(StageFault::Executor(format!(
                "executor task panicked: {message}"
            ))),
        }
    }
}

enum StageFault {
    Executor(String),
    Timeout(u64),
    Input { kind: ArtifactKind, message: String },
}

impl StageFault {
    fn describe(&self) -> String {
        match self {
            Self::Executor(message) => message.clone(),
            Self::Timeout(seconds) => format!("timed out after {seconds}s"),
            Self::Input { message, .. } => message.clone(),
        }
    }

    fn into_failure(self, stage: StageId) -> RunFailure {
        match self {
            Self::Executor(message) => RunFailure::ExecutorFailed { stage, message },
            Self::Timeout(seconds) => RunFailure::TimedOut { stage, seconds },
            Self::Input { kind, message } => RunFailure::InputUnavailable {
                stage,
                kind,
                message,
            },
        }
    }
}

async fn execute_stage(
    spec: StageSpec,
    executor: Arc<dyn ExecutorCapability>,
    ctx: RunContext,
) -> StageExecution {
    let started_at = iso_timestamp();
    ctx.events()
        .try_emit("stage.started", Some(json!({"stage": spec.id})));
    let start = Instant::now();

    // Fetch declared inputs, in declaration order.
    let mut inputs = Vec::with_capacity(spec.inputs.len());
    for kind in &spec.inputs {
        match ctx.store().get(*kind) {
            Ok(artifact) => inputs.push(artifact),
            Err(err) => {
                let fault = StageFault::Input {
                    kind: *kind,
                    message: err.to_string(),
                };
                ctx.events().try_emit(
                    "stage.failed",
                    Some(json!({"stage": spec.id, "error": fault.describe()})),
                );
                return StageExecution {
                    started_at,
                    finished_at: iso_timestamp(),
                    result: Err(fault),
                };
            }
        }
    }

    // A spec-level timeout wins over the pipeline configuration.
    let deadline = spec.timeout.or_else(|| ctx.config().stage_timeout(&spec.id));
    let invocation = executor.execute(&inputs, &spec.config);
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, invocation).await {
            Ok(outcome) => outcome.map_err(|e| StageFault::Executor(e.message)),
            Err(_) => Err(StageFault::Timeout(limit.as_secs())),
        },
        None => invocation.await.map_err(|e| StageFault::Executor(e.message)),
    };

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(outputs) => ctx.events().try_emit(
            "stage.completed",
            Some(json!({
                "stage": spec.id,
                "duration_ms": duration_ms,
                "outputs": outputs.len(),
            })),
        ),
        Err(fault) => ctx.events().try_emit(
            "stage.failed",
            Some(json!({
                "stage": spec.id,
                "error": fault.describe(),
                "duration_ms": duration_ms,
            })),
        ),
    }

    StageExecution {
        started_at,
        finished_at: iso_timestamp(),
        result,
    }
}
