//! Executor capability interface.
//!
//! Executors are the core's only doorway to the outside world: running
//! tests, building and pushing images, scanning, signing, applying cluster
//! manifests. One capability is bound per stage.

use crate::core::Artifact;
use crate::errors::ExecutionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for stage executor capabilities.
///
/// The orchestrator never retries a failed stage; retry policy for flaky
/// but idempotent operations (such as an upload) belongs inside the
/// capability implementation.
#[async_trait]
pub trait ExecutorCapability: Send + Sync {
    /// Executes the stage's work.
    ///
    /// # Arguments
    ///
    /// * `inputs` - The stage's declared inputs, in declaration order
    /// * `config` - The stage's executor configuration, passed verbatim
    ///
    /// # Returns
    ///
    /// The produced artifacts, or the external tool's error.
    async fn execute(
        &self,
        inputs: &[Arc<Artifact>],
        config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError>;
}

/// A simple closure-based executor.
pub struct FnExecutor<F>
where
    F: Fn(&[Arc<Artifact>], &HashMap<String, String>) -> Result<Vec<Artifact>, ExecutionError>
        + Send
        + Sync,
{
    func: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&[Arc<Artifact>], &HashMap<String, String>) -> Result<Vec<Artifact>, ExecutionError>
        + Send
        + Sync,
{
    /// Creates a new closure-based executor.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnExecutor<F>
where
    F: Fn(&[Arc<Artifact>], &HashMap<String, String>) -> Result<Vec<Artifact>, ExecutionError>
        + Send
        + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor").finish()
    }
}

#[async_trait]
impl<F> ExecutorCapability for FnExecutor<F>
where
    F: Fn(&[Arc<Artifact>], &HashMap<String, String>) -> Result<Vec<Artifact>, ExecutionError>
        + Send
        + Sync,
{
    async fn execute(
        &self,
        inputs: &[Arc<Artifact>],
        config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError> {
        (self.func)(inputs, config)
    }
}

/// An executor that succeeds with no outputs.
///
/// Useful for stages whose work is entirely external and which declare no
/// output kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpExecutor;

#[async_trait]
impl ExecutorCapability for NoOpExecutor {
    async fn execute(
        &self,
        _inputs: &[Arc<Artifact>],
        _config: &HashMap<String, String>,
    ) -> Result<Vec<Artifact>, ExecutionError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactKind;
    use mockall::mock;

    mock! {
        pub Scanner {}

        #[async_trait]
        impl ExecutorCapability for Scanner {
            async fn execute(
                &self,
                inputs: &[Arc<Artifact>],
                config: &HashMap<String, String>,
            ) -> Result<Vec<Artifact>, ExecutionError>;
        }
    }

    #[tokio::test]
    async fn test_fn_executor() {
        let executor = FnExecutor::new(|_inputs, config| {
            Ok(vec![Artifact::new(
                ArtifactKind::TestReport,
                "unit-tests",
                serde_json::json!({"suite": config.get("suite")}),
            )])
        });

        let mut config = HashMap::new();
        config.insert("suite".to_string(), "fast".to_string());

        let outputs = executor.execute(&[], &config).await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].kind, ArtifactKind::TestReport);
    }

    #[tokio::test]
    async fn test_noop_executor() {
        let outputs = NoOpExecutor.execute(&[], &HashMap::new()).await.unwrap();
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_capability_is_mockable() {
        let mut scanner = MockScanner::new();
        scanner
            .expect_execute()
            .times(1)
            .returning(|_, _| Err(ExecutionError::new("scanner exited 2")));

        let err = scanner.execute(&[], &HashMap::new()).await.unwrap_err();
        assert_eq!(err.message, "scanner exited 2");
    }
}
