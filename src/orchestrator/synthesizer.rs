//! Result aggregation and report generation
//!
//! The [`Synthesizer`] turns the successful view of an [`ExecutionBatch`]
//! into one report with a single LLM call. Two paths skip or replace that
//! call:
//!
//! - no worker succeeded: a fixed failure report, no LLM call at all
//! - the LLM call fails: a degraded report built from the raw worker output

use crate::llm::LLMClient;
use crate::orchestrator::executor::ExecutionBatch;
use crate::workers::WorkerResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Body of the report returned when no worker succeeded.
pub const NO_RESULTS_MESSAGE: &str =
    "No worker results available. All workers failed to execute.";

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a senior analyst creating a comprehensive report \
by combining insights from multiple specialist workers.";

/// Final output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub body: String,
    /// False only when no worker succeeded
    pub success: bool,
    /// True when the report body was assembled without the LLM
    pub degraded: bool,
    pub synthesis_error: Option<String>,
    /// Duration of the generation call alone
    pub synthesis_duration_ms: u64,
    pub total_pipeline_duration_ms: u64,
    pub worker_count_used: usize,
    pub failed_worker_names: Vec<String>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub workers_used: Vec<String>,
    pub original_query: String,
    pub model: String,
}

/// Combines worker results into a [`Report`].
pub struct Synthesizer {
    llm: Arc<dyn LLMClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Synthesize a report from the completed executions of `batch`.
    pub async fn combine(&self, batch: &ExecutionBatch, query: &str, guidance: &str) -> Report {
        let successful = batch.successful();
        let failed_worker_names: Vec<String> =
            batch.failed().into_iter().map(str::to_string).collect();

        let mut report = Report {
            body: String::new(),
            success: false,
            degraded: false,
            synthesis_error: None,
            synthesis_duration_ms: 0,
            total_pipeline_duration_ms: batch.total_duration_ms(),
            worker_count_used: 0,
            failed_worker_names,
            metadata: ReportMetadata {
                workers_used: Vec::new(),
                original_query: query.to_string(),
                model: self.llm.model_name().to_string(),
            },
        };

        if successful.is_empty() {
            warn!(failed = ?report.failed_worker_names, "No worker succeeded, skipping synthesis");
            report.body = NO_RESULTS_MESSAGE.to_string();
            return report;
        }

        report.success = true;
        report.worker_count_used = successful.len();
        report.metadata.workers_used = successful.keys().map(|k| k.to_string()).collect();

        let prompt = synthesis_prompt(
            &format_worker_blocks(&successful),
            query,
            guidance,
            successful.len(),
            batch.total_duration_ms(),
        );

        let start = Instant::now();
        let generated = self.llm.generate_with_system(SYNTHESIS_SYSTEM_PROMPT, &prompt).await;
        report.synthesis_duration_ms = start.elapsed().as_millis() as u64;
        report.total_pipeline_duration_ms += report.synthesis_duration_ms;

        match generated {
            Ok(body) => {
                info!(
                    workers = report.worker_count_used,
                    synthesis_duration_ms = report.synthesis_duration_ms,
                    "Report synthesized"
                );
                report.body = body;
            }
            Err(e) => {
                error!(error = %e, "Synthesis failed, returning raw worker output");
                report.degraded = true;
                report.synthesis_error = Some(e.to_string());
                report.body = degraded_body(&successful);
            }
        }

        report
    }

    /// Blocking form of [`Synthesizer::combine`]; must not be called inside a tokio runtime.
    pub fn combine_blocking(&self, batch: &ExecutionBatch, query: &str, guidance: &str) -> Report {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.combine(batch, query, guidance)),
            Err(e) => {
                let successful = batch.successful();
                Report {
                    body: if successful.is_empty() {
                        NO_RESULTS_MESSAGE.to_string()
                    } else {
                        degraded_body(&successful)
                    },
                    success: !successful.is_empty(),
                    degraded: !successful.is_empty(),
                    synthesis_error: Some(format!("Failed to start runtime: {}", e)),
                    synthesis_duration_ms: 0,
                    total_pipeline_duration_ms: batch.total_duration_ms(),
                    worker_count_used: successful.len(),
                    failed_worker_names: batch.failed().into_iter().map(str::to_string).collect(),
                    metadata: ReportMetadata {
                        workers_used: successful.keys().map(|k| k.to_string()).collect(),
                        original_query: query.to_string(),
                        model: self.llm.model_name().to_string(),
                    },
                }
            }
        }
    }
}

fn synthesis_prompt(
    blocks: &str,
    query: &str,
    guidance: &str,
    worker_count: usize,
    execution_ms: u64,
) -> String {
    format!(
        r#"=== WORKER REPORTS ===

{blocks}

======================

Original User Query: {query}

Synthesis Focus: {guidance}

Create a unified report with the following structure:

## Executive Summary
[2-3 sentence high-level summary answering the user's main question]

## Key Findings
[One subsection per worker report with its most important insights]

## Data Highlights
| Metric | Value |
|--------|-------|
[Include 3-5 key data points from across all reports]

## Recommendation
[Clear, actionable recommendation based on the combined analysis]

## Confidence Assessment
[How confident are these findings? What limitations exist?]

---
*Report generated from {worker_count} parallel worker(s) in {execution_ms}ms*

Make the report cohesive, avoid redundancy, and cross-reference workers where their findings support or contradict each other."#
    )
}

/// `snake_case` or spaced words to `Title Case`.
fn title_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_aux_data(result: &WorkerResult) -> String {
    if result.aux_data().is_empty() {
        return "No additional data".to_string();
    }

    result
        .aux_data()
        .iter()
        .map(|(key, value)| format!("- {}: {}", title_case(key), value.render()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one block per result, ordered by worker name.
pub fn format_worker_blocks(results: &BTreeMap<&str, &WorkerResult>) -> String {
    results
        .iter()
        .map(|(name, result)| {
            format!(
                "\n### {} Report\n\
                 **Query:** {}\n\
                 **Confidence:** {:.0}%\n\
                 **Execution Time:** {} ms\n\
                 \n\
                 **Analysis:**\n\
                 {}\n\
                 \n\
                 **Key Data:**\n\
                 {}\n\
                 \n\
                 **Sources:** {} source(s) consulted\n",
                title_case(name),
                result.query(),
                result.confidence() * 100.0,
                result.duration_ms(),
                result.body(),
                format_aux_data(result),
                result.citations().len(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Short per-worker overview built without an LLM.
pub fn quick_summary(results: &BTreeMap<&str, &WorkerResult>) -> String {
    if results.is_empty() {
        return "No results available.".to_string();
    }

    let mut lines = vec!["## Quick Summary\n".to_string()];
    for (name, result) in results {
        lines.push(format!("### {}", name));
        lines.push(format!("- Confidence: {:.0}%", result.confidence() * 100.0));
        lines.push(format!("- Time: {}ms", result.duration_ms()));
        lines.push(format!("- Sources: {}", result.citations().len()));
        lines.push(String::new());
    }
    lines.join("\n")
}

fn degraded_body(results: &BTreeMap<&str, &WorkerResult>) -> String {
    let raw = results
        .iter()
        .map(|(name, result)| format!("### {} Report\n\n{}", title_case(name), result.body()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    format!("{}\n{}", quick_summary(results), raw)
}
