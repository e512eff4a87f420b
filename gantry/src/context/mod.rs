//! Per-run context.
//!
//! All run-scoped collaborators travel in an explicit [`RunContext`] value
//! created per run and discarded at completion. There is no process-wide
//! pipeline state.

use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::events::{EventSink, NoOpEventSink};
use crate::store::ArtifactStore;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Identifies a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,

    /// When the run context was created.
    pub started_at: Timestamp,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: now_utc(),
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: now_utc(),
        }
    }
}

/// The explicit per-run context handed to every component call.
#[derive(Clone)]
pub struct RunContext {
    identity: RunIdentity,
    config: PipelineConfig,
    store: ArtifactStore,
    events: Arc<dyn EventSink>,
    cancellation: Arc<CancellationToken>,
}

impl RunContext {
    /// Creates a run context with a fresh identity, an empty artifact store,
    /// a no-op event sink, and an uncancelled token.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            identity: RunIdentity::new(),
            config,
            store: ArtifactStore::new(),
            events: Arc::new(NoOpEventSink),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Sets the artifact store.
    #[must_use]
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = store;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
