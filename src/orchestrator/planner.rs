//! Query decomposition and worker selection
//!
//! The [`Planner`] asks a [`Decomposer`] which workers should answer a query
//! and with what sub-queries, then post-validates the answer against the
//! worker registry. Decomposition failures never escape: they produce the
//! fallback plan that runs every registered worker on the original query.

use crate::llm::LLMClient;
use crate::types::{AppError, Result};
use crate::workers::WorkerRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Guidance attached to the fallback plan.
pub const FALLBACK_GUIDANCE: &str = "Provide comprehensive analysis combining all perspectives";

/// Guidance used when a decomposition omits it.
pub const DEFAULT_GUIDANCE: &str = "Provide comprehensive analysis";

/// Validated worker assignments for one query.
///
/// Every selected worker is known to the registry it was validated against
/// and has a sub-query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    workers: Vec<String>,
    sub_queries: BTreeMap<String, String>,
    synthesis_guidance: String,
    priority_worker: Option<String>,
    fallback: bool,
}

impl Plan {
    /// Build a plan from ordered `(worker, sub_query)` assignments.
    ///
    /// A worker listed twice keeps its first sub-query.
    pub fn new<W, Q, I>(assignments: I, synthesis_guidance: impl Into<String>) -> Self
    where
        W: Into<String>,
        Q: Into<String>,
        I: IntoIterator<Item = (W, Q)>,
    {
        let mut workers = Vec::new();
        let mut sub_queries = BTreeMap::new();
        for (worker, sub_query) in assignments {
            let worker = worker.into();
            if sub_queries.contains_key(&worker) {
                continue;
            }
            sub_queries.insert(worker.clone(), sub_query.into());
            workers.push(worker);
        }

        Self {
            workers,
            sub_queries,
            synthesis_guidance: synthesis_guidance.into(),
            priority_worker: None,
            fallback: false,
        }
    }

    /// Mark one selected worker as the most relevant; ignored if not selected.
    pub fn with_priority(mut self, worker: &str) -> Self {
        if self.sub_queries.contains_key(worker) {
            self.priority_worker = Some(worker.to_string());
        }
        self
    }

    /// Selected workers, in dispatch order.
    pub fn workers(&self) -> &[String] {
        &self.workers
    }

    pub fn sub_queries(&self) -> &BTreeMap<String, String> {
        &self.sub_queries
    }

    pub fn sub_query(&self, worker: &str) -> Option<&str> {
        self.sub_queries.get(worker).map(String::as_str)
    }

    pub fn synthesis_guidance(&self) -> &str {
        &self.synthesis_guidance
    }

    /// Advisory only; the executor does not treat it specially.
    pub fn priority_worker(&self) -> Option<&str> {
        self.priority_worker.as_deref()
    }

    /// Whether this plan came from the decomposition-failure path.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Raw, unvalidated decomposition output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    #[serde(default, alias = "analysts")]
    pub workers: Vec<String>,
    #[serde(default)]
    pub sub_queries: HashMap<String, String>,
    #[serde(default, alias = "synthesis_focus")]
    pub synthesis_guidance: String,
    #[serde(default, alias = "priority_analyst")]
    pub priority_worker: Option<String>,
}

/// Turns a query into a [`PlanDraft`], e.g. with an LLM or a rule engine.
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(&self, query: &str, instructions: &str) -> Result<PlanDraft>;
}

/// Decomposer that asks an LLM for a JSON plan.
pub struct LlmDecomposer {
    llm: Arc<dyn LLMClient>,
}

impl LlmDecomposer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Decomposer for LlmDecomposer {
    async fn decompose(&self, query: &str, instructions: &str) -> Result<PlanDraft> {
        let prompt = format!("User Query: {}", query);
        let response = self.llm.generate_with_system(instructions, &prompt).await?;

        let json = extract_json_object(&response).ok_or_else(|| {
            AppError::InvalidInput("Decomposition reply contained no JSON object".to_string())
        })?;

        Ok(serde_json::from_str(json)?)
    }
}

/// Slice from the first `{` to the last `}`, skipping code fences and prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Maps queries to validated [`Plan`]s.
pub struct Planner {
    decomposer: Arc<dyn Decomposer>,
    known: Vec<(String, String)>,
    default_worker: String,
}

impl Planner {
    /// Create a planner over the workers in `registry`.
    ///
    /// The default worker is the first registered one.
    pub fn new(decomposer: Arc<dyn Decomposer>, registry: &WorkerRegistry) -> Result<Self> {
        let known = registry.descriptions();
        let default_worker = known
            .first()
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                AppError::InvalidInput("Planner needs at least one registered worker".to_string())
            })?;

        Ok(Self {
            decomposer,
            known,
            default_worker,
        })
    }

    /// Choose the worker used when a decomposition selects no known worker.
    pub fn with_default_worker(mut self, name: &str) -> Result<Self> {
        if !self.is_known(name) {
            return Err(AppError::NotFound(format!(
                "Default worker '{}' is not registered",
                name
            )));
        }
        self.default_worker = name.to_string();
        Ok(self)
    }

    pub fn default_worker(&self) -> &str {
        &self.default_worker
    }

    fn is_known(&self, name: &str) -> bool {
        self.known.iter().any(|(known, _)| known == name)
    }

    /// Instruction text handed to the decomposer.
    pub fn instructions(&self) -> String {
        let catalog = self
            .known
            .iter()
            .enumerate()
            .map(|(i, (name, description))| {
                if description.is_empty() {
                    format!("{}. {}", i + 1, name)
                } else {
                    format!("{}. {}: {}", i + 1, name, description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You coordinate a team of specialist workers. Decide which workers should answer the user's query and give each one a focused sub-query.

Available workers:
{catalog}

Rules for worker selection:
- Select 1 worker for simple, single-topic queries
- Select 2-3 workers for comparison queries
- Select every worker when asked to analyze everything about a subject
- Always include the budget or purchase-oriented worker if price or budget is mentioned
- Always include the review-oriented worker if reliability, issues or owner experiences are mentioned
- Always include the market-oriented worker if news, trends or market conditions are mentioned
- Only use worker names from the list above

Respond with ONLY a JSON object of this shape:
{{
  "workers": ["<worker name>", ...],
  "sub_queries": {{"<worker name>": "<focused sub-query>"}},
  "synthesis_guidance": "<one sentence on how to combine the results>",
  "priority_worker": "<most important worker name>"
}}"#
        )
    }

    /// Produce a validated plan for `query`. Never fails.
    pub async fn plan(&self, query: &str) -> Plan {
        let instructions = self.instructions();

        match self.decomposer.decompose(query, &instructions).await {
            Ok(draft) => {
                let plan = self.validate(draft, query);
                info!(
                    workers = ?plan.workers(),
                    priority = ?plan.priority_worker(),
                    "Query decomposed"
                );
                plan
            }
            Err(e) => {
                warn!(error = %e, "Decomposition failed, using fallback plan");
                self.fallback_plan(query)
            }
        }
    }

    /// Blocking form of [`Planner::plan`]; must not be called inside a tokio runtime.
    pub fn plan_blocking(&self, query: &str) -> Plan {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.plan(query)),
            Err(e) => {
                warn!(error = %e, "Failed to start runtime, using fallback plan");
                self.fallback_plan(query)
            }
        }
    }

    /// Apply the registry constraints to a raw draft.
    pub fn validate(&self, draft: PlanDraft, query: &str) -> Plan {
        let PlanDraft {
            workers,
            mut sub_queries,
            synthesis_guidance,
            priority_worker,
        } = draft;

        let mut selected: Vec<String> = Vec::new();
        for worker in workers {
            if !self.is_known(&worker) {
                debug!(worker = %worker, "Dropping unknown worker from plan");
                continue;
            }
            if !selected.contains(&worker) {
                selected.push(worker);
            }
        }

        let guidance = if synthesis_guidance.trim().is_empty() {
            DEFAULT_GUIDANCE.to_string()
        } else {
            synthesis_guidance
        };

        if selected.is_empty() {
            warn!(
                default = %self.default_worker,
                "Decomposition selected no known worker, using default"
            );
            return Plan::new([(self.default_worker.clone(), query.to_string())], guidance);
        }

        let assignments = selected.into_iter().map(|worker| {
            let sub_query = sub_queries
                .remove(&worker)
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| query.to_string());
            (worker, sub_query)
        });

        let plan = Plan::new(assignments, guidance);
        match priority_worker {
            Some(priority) => plan.with_priority(&priority),
            None => plan,
        }
    }

    /// Every registered worker on the verbatim query.
    pub fn fallback_plan(&self, query: &str) -> Plan {
        let mut plan = Plan::new(
            self.known
                .iter()
                .map(|(name, _)| (name.clone(), query.to_string())),
            FALLBACK_GUIDANCE,
        )
        .with_priority(&self.default_worker);
        plan.fallback = true;
        plan
    }
}
