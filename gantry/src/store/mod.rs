//! Content-addressed artifact store.
//!
//! The store is shared across stages within a run. Once stored, an artifact
//! is owned by the store for the remainder of the run: nothing deletes or
//! mutates it. Sibling stages in the same batch may `put` concurrently;
//! since exactly one stage produces each kind, write-write conflicts are
//! impossible by construction.

use crate::core::{Artifact, ArtifactKind, ArtifactRef};
use crate::errors::StoreError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Content-addressed holder of pipeline outputs.
///
/// `put` of a byte-identical payload of the same kind is idempotent and
/// returns the existing reference. A later `put` of the same kind with a
/// different hash supersedes the earlier artifact: `get` returns the latest,
/// while the full production order is retained for audit.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    by_kind: Arc<DashMap<ArtifactKind, Vec<Arc<Artifact>>>>,
    order: Arc<Mutex<Vec<ArtifactRef>>>,
}

impl ArtifactStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an artifact and returns its reference.
    ///
    /// Idempotent: storing a payload whose (kind, hash) pair is already
    /// present returns the existing reference without a second copy.
    pub fn put(&self, artifact: Artifact) -> ArtifactRef {
        self.put_shared(Arc::new(artifact))
    }

    /// Stores an already-shared artifact and returns its reference.
    pub fn put_shared(&self, artifact: Arc<Artifact>) -> ArtifactRef {
        let reference = artifact.reference();
        let mut entry = self.by_kind.entry(artifact.kind).or_default();
        if entry
            .iter()
            .any(|existing| existing.content_hash == artifact.content_hash)
        {
            return reference;
        }
        entry.push(artifact);
        self.order.lock().push(reference.clone());
        reference
    }

    /// Fetches the latest artifact of a kind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no artifact of the kind has been
    /// stored; this indicates a graph/ordering bug, not an operational
    /// failure.
    pub fn get(&self, kind: ArtifactKind) -> Result<Arc<Artifact>, StoreError> {
        self.by_kind
            .get(&kind)
            .and_then(|artifacts| artifacts.last().cloned())
            .ok_or(StoreError::NotFound { kind })
    }

    /// Fetches the artifact of a kind produced by a specific stage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotProducedBy`] if the stage stored no artifact
    /// of that kind.
    pub fn get_produced_by(
        &self,
        kind: ArtifactKind,
        stage_id: &str,
    ) -> Result<Arc<Artifact>, StoreError> {
        self.by_kind
            .get(&kind)
            .and_then(|artifacts| {
                artifacts
                    .iter()
                    .rev()
                    .find(|a| a.produced_by == stage_id)
                    .cloned()
            })
            .ok_or_else(|| StoreError::NotProducedBy {
                kind,
                stage: stage_id.to_string(),
            })
    }

    /// Returns whether any artifact of the kind is stored.
    #[must_use]
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.by_kind
            .get(&kind)
            .is_some_and(|artifacts| !artifacts.is_empty())
    }

    /// Returns references to every stored artifact, in production order.
    #[must_use]
    pub fn refs(&self) -> Vec<ArtifactRef> {
        self.order.lock().clone()
    }

    /// Returns every stored artifact, in production order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Arc<Artifact>> {
        let order = self.order.lock().clone();
        order
            .iter()
            .filter_map(|r| {
                self.by_kind.get(&r.kind).and_then(|artifacts| {
                    artifacts
                        .iter()
                        .find(|a| a.content_hash == r.content_hash)
                        .cloned()
                })
            })
            .collect()
    }

    /// Returns the number of distinct stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.lock().len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.lock().is_empty()
    }
}
