//! Orchestration core
//!
//! A query flows through three stages:
//!
//! 1. [`Planner`] decomposes it into worker assignments ([`Plan`])
//! 2. [`ParallelExecutor`] runs the assigned workers concurrently ([`ExecutionBatch`])
//! 3. [`Synthesizer`] merges the successful results into a [`Report`]
//!
//! [`AnalysisPipeline`] chains the stages and optionally passes the report
//! through a [`RefinementLoop`].

pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod refine;
pub mod synthesizer;

pub use executor::{
    Execution, ExecutionBatch, ExecutionStatus, NoopObserver, ParallelExecutor, ProgressObserver,
    TracingObserver,
};
pub use pipeline::{AnalysisPipeline, PipelineOutput};
pub use planner::{Decomposer, LlmDecomposer, Plan, PlanDraft, Planner};
pub use refine::{RefinementIteration, RefinementLoop, RefinementOutcome, RefinementState};
pub use synthesizer::{quick_summary, Report, ReportMetadata, Synthesizer};
