//! Bounded review/refine loop for synthesized reports
//!
//! Each iteration moves through `Draft → Reviewed → {Accepted, Retry}`. A
//! reviewer call scores the current draft; a draft that fails review is
//! rewritten with the reviewer's feedback until it passes or the iteration
//! cap is reached.

use crate::llm::LLMClient;
use crate::orchestrator::synthesizer::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Score assumed when a review carries no readable `QUALITY_SCORE` line.
pub const DEFAULT_REVIEW_SCORE: u8 = 5;

const REVIEW_SYSTEM_PROMPT: &str =
    "You are a strict senior editor reviewing analytical reports. Score fairly but be specific.";

const REFINE_SYSTEM_PROMPT: &str =
    "You are a senior analyst revising a report to address an editor's feedback.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinementState {
    Draft,
    Reviewed,
    Accepted,
    Retry,
}

/// One reviewer verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementIteration {
    pub iteration: u32,
    pub score: u8,
    pub passed: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub report: Report,
    pub accepted: bool,
    pub iterations: Vec<RefinementIteration>,
}

pub struct RefinementLoop {
    llm: Arc<dyn LLMClient>,
    max_iterations: u32,
    pass_score: u8,
}

impl RefinementLoop {
    pub fn new(llm: Arc<dyn LLMClient>, max_iterations: u32, pass_score: u8) -> Self {
        Self {
            llm,
            max_iterations,
            pass_score,
        }
    }

    /// Review and rewrite `report` until accepted or out of iterations.
    ///
    /// Failed or degraded reports are returned untouched.
    pub async fn refine(&self, mut report: Report, query: &str) -> RefinementOutcome {
        let mut history = Vec::new();

        if !report.success || report.degraded || self.max_iterations == 0 {
            return RefinementOutcome {
                report,
                accepted: false,
                iterations: history,
            };
        }

        let mut state = RefinementState::Draft;
        let mut iteration: u32 = 0;

        loop {
            state = match state {
                RefinementState::Draft => {
                    iteration += 1;
                    let review = match self
                        .llm
                        .generate_with_system(REVIEW_SYSTEM_PROMPT, &review_prompt(query, &report.body))
                        .await
                    {
                        Ok(review) => review,
                        Err(e) => {
                            warn!(error = %e, iteration, "Review failed, keeping current draft");
                            break;
                        }
                    };

                    let (score, passed) = parse_review(&review);
                    let passed = passed && score >= self.pass_score;
                    info!(iteration, score, passed, "Report reviewed");

                    history.push(RefinementIteration {
                        iteration,
                        score,
                        passed,
                        feedback: review,
                    });
                    RefinementState::Reviewed
                }
                RefinementState::Reviewed => {
                    let passed = history.last().map(|h| h.passed).unwrap_or(false);
                    if passed {
                        RefinementState::Accepted
                    } else if iteration >= self.max_iterations {
                        info!(iteration, "Refinement limit reached");
                        break;
                    } else {
                        RefinementState::Retry
                    }
                }
                RefinementState::Retry => {
                    let feedback = history
                        .last()
                        .map(|h| h.feedback.as_str())
                        .unwrap_or_default();
                    match self
                        .llm
                        .generate_with_system(
                            REFINE_SYSTEM_PROMPT,
                            &refine_prompt(query, &report.body, feedback),
                        )
                        .await
                    {
                        Ok(body) if !body.trim().is_empty() => report.body = body,
                        Ok(_) => {
                            warn!(iteration, "Refinement returned an empty draft, keeping current");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, iteration, "Refinement failed, keeping current draft");
                            break;
                        }
                    }
                    RefinementState::Draft
                }
                RefinementState::Accepted => break,
            };
        }

        RefinementOutcome {
            report,
            accepted: state == RefinementState::Accepted,
            iterations: history,
        }
    }
}

fn review_prompt(query: &str, body: &str) -> String {
    format!(
        r#"Review this report written in answer to: {query}

REPORT:
{body}

SCORING CRITERIA:
- 9-10: Directly answers the question, well structured, data-backed, clear recommendation and caveats
- 7-8: Useful but missing structure, data or a clear recommendation
- 5-6: Partially answers the question
- Below 5: Off-topic or incoherent

Respond in this EXACT format:

QUALITY_SCORE: [1-10]
PASSED: [YES only if score >= 9, otherwise NO]

MISSING_FOR_SCORE_9:
- [Specific improvements]"#
    )
}

fn refine_prompt(query: &str, body: &str, feedback: &str) -> String {
    format!(
        r#"Original question: {query}

CURRENT REPORT:
{body}

EDITOR FEEDBACK:
{feedback}

Rewrite the report addressing every point of the feedback. Keep the same section structure. Return ONLY the revised report."#
    )
}

/// Extract `(score, passed)` from a review.
///
/// The score is the first number on the first `QUALITY_SCORE` line, capped
/// at 10; `passed` requires a literal `PASSED: YES`.
fn parse_review(review: &str) -> (u8, bool) {
    let upper = review.to_uppercase();
    let passed = upper.contains("PASSED: YES");

    let score = upper
        .lines()
        .find(|line| line.contains("QUALITY_SCORE"))
        .and_then(|line| {
            let digits: String = line
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u32>().ok()
        })
        .map(|score| score.min(10) as u8)
        .unwrap_or(DEFAULT_REVIEW_SCORE);

    (score, passed)
}
