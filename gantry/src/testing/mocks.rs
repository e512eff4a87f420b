//! Mock executor capabilities for testing.

use crate::core::{Artifact, ArtifactKind};
use crate::errors::ExecutionError;
use crate::executors::ExecutorCapability;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A mock executor that records calls and returns configured artifacts.
#[derive(Debug, Default)]
pub struct MockExecutor {
    outputs: Mutex<Vec<Artifact>>,
    call_count: Mutex<usize>,
    seen_inputs: Mutex<Vec<Vec<ArtifactKind>>>,
}

impl MockExecutor {
    /// Creates a mock that succeeds with no outputs.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a mock that succeeds with the given outputs.
    #[must_use]
    pub fn returning(outputs: Vec<Artifact>) -> Self {
        Self {
            outputs: Mutex::new(outputs),
            call_count: Mutex::new(0),
            seen_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Returns how many times the executor was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// Returns the input kinds seen by each invocation.
    #[must_use]
    pub fn seen_inputs(&self) -> Vec<Vec<ArtifactKind>> {
        self.seen_inputs.lock().clone()
    }
}

#[async_trait]
impl ExecutorCapability for MockExecutor {
    async fn execute(
        &self,
        inputs: &[Arc<Artifact>],
        _config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError> {
        *self.call_count.lock() += 1;
        self.seen_inputs
            .lock()
            .push(inputs.iter().map(|a| a.kind).collect());
        Ok(self.outputs.lock().clone())
    }
}

/// An executor that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingExecutor {
    message: String,
}

impl FailingExecutor {
    /// Creates a failing executor.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ExecutorCapability for FailingExecutor {
    async fn execute(
        &self,
        _inputs: &[Arc<Artifact>],
        _config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError> {
        Err(ExecutionError::new(self.message.clone()))
    }
}

/// An executor that sleeps before succeeding, for deadline tests.
#[derive(Debug, Clone)]
pub struct HangingExecutor {
    delay: Duration,
}

impl HangingExecutor {
    /// Creates an executor that sleeps for `delay` before returning.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ExecutorCapability for HangingExecutor {
    async fn execute(
        &self,
        _inputs: &[Arc<Artifact>],
        _config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
