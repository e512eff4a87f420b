//! Test support: mock executors and artifact fixtures.
//!
//! These helpers are used by the crate's own tests and are exported for
//! hosts writing tests against the orchestration core.

mod fixtures;
mod mocks;

pub use fixtures::{
    coverage_report, deploy_result, image, image_sbom, init_tracing, scan_report, signature,
    source_sbom, test_report,
};
pub use mocks::{FailingExecutor, HangingExecutor, MockExecutor};
