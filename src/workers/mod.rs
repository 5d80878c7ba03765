//! Analysis workers
//!
//! A worker answers one narrowed sub-question and produces a [`WorkerResult`].
//! The orchestration core treats workers as opaque, uniform capabilities: it
//! only ever calls [`Worker::analyze`] and reads the worker's name.
//!
//! - [`Worker`] - the capability trait (one required async method)
//! - [`WorkerRegistry`] - ordered name → worker mapping handed to the executor
//! - [`LlmWorker`] - configurable worker backed by an [`crate::llm::LLMClient`]

pub mod llm_worker;
pub mod registry;
pub mod result;

use crate::types::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub use llm_worker::LlmWorker;
pub use registry::WorkerRegistry;
pub use result::{AuxValue, Citation, WorkerResult, WorkerResultBuilder};

/// A named unit of analysis work.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Unique identifier, matched against plan worker names.
    fn name(&self) -> &str;

    /// Short description of the worker's specialty, shown to the planner.
    fn description(&self) -> &str {
        ""
    }

    /// Answer `sub_query`.
    async fn analyze(&self, sub_query: &str) -> Result<WorkerResult>;

    /// Answer `sub_query`, giving up after `limit`.
    ///
    /// The in-flight call is dropped on expiry and [`AppError::Timeout`] is
    /// returned.
    async fn analyze_with_timeout(&self, sub_query: &str, limit: Duration) -> Result<WorkerResult> {
        match tokio::time::timeout(limit, self.analyze(sub_query)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(timeout_message(limit))),
        }
    }

    /// Blocking form of [`Worker::analyze`] for non-async call sites.
    ///
    /// Must not be called from inside a tokio runtime.
    fn analyze_blocking(&self, sub_query: &str) -> Result<WorkerResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to start runtime: {}", e)))?;
        runtime.block_on(self.analyze(sub_query))
    }
}

/// Error message recorded when a worker exceeds its time limit.
pub fn timeout_message(limit: Duration) -> String {
    format!("timeout after {}s", limit.as_secs_f64())
}
