//! # ensemble - Parallel Analysis Orchestrator
//!
//! Coordinates several independent analysis workers, each answering a
//! narrowed sub-question derived from one user query, and merges their
//! outputs into a single report.
//!
//! ## Overview
//!
//! ensemble can be used in two ways:
//!
//! 1. **As a CLI** - Run the `ensemble` binary against an `ensemble.toml`
//! 2. **As a library** - Supply your own [`Worker`] implementations
//!
//! ## Pipeline
//!
//! ```text
//! query ─▶ Planner ─▶ Plan ─▶ ParallelExecutor ─▶ ExecutionBatch ─▶ Synthesizer ─▶ Report
//! ```
//!
//! - The [`Planner`] never fails: decomposition errors produce a fallback
//!   plan that runs every worker on the original query.
//! - The [`ParallelExecutor`] isolates workers: one failure or timeout never
//!   affects the others.
//! - The [`Synthesizer`] always returns a [`Report`], degraded if generation
//!   fails and marked unsuccessful if no worker succeeded.
//!
//! ## Library Example
//!
//! ```rust,ignore
//! use ensemble::{AnalysisPipeline, LlmDecomposer, ParallelExecutor, Planner, Synthesizer, WorkerRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let registry = WorkerRegistry::with_workers([review_worker, market_worker]);
//! let planner = Planner::new(Arc::new(LlmDecomposer::new(llm.clone())), &registry)?;
//! let pipeline = AnalysisPipeline::new(
//!     planner,
//!     ParallelExecutor::new(Duration::from_secs(60)),
//!     Synthesizer::new(llm),
//!     registry,
//! );
//!
//! let output = pipeline.run("Compare the Civic vs Corolla under $40k").await;
//! println!("{}", output.report.body);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//! | `all-llm` | All LLM providers |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and terminal output.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Planner, parallel executor, synthesizer and pipeline.
pub mod orchestrator;
/// Core error types.
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;
/// Worker capability, results and registry.
pub mod workers;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use orchestrator::{
    AnalysisPipeline, Decomposer, ExecutionBatch, ExecutionStatus, LlmDecomposer,
    ParallelExecutor, PipelineOutput, Plan, Planner, ProgressObserver, Report, Synthesizer,
};
pub use types::{AppError, Result};
pub use utils::toml_config::EnsembleConfig;
pub use workers::{Worker, WorkerRegistry, WorkerResult};
