//! Configurable LLM-backed worker
//!
//! A generic worker whose specialty comes entirely from configuration: a
//! name, a description for the planner, and a system prompt steering the
//! model. Each `[workers.<name>]` table in `ensemble.toml` becomes one of these.

use crate::llm::LLMClient;
use crate::types::{AppError, Result};
use crate::utils::toml_config::WorkerConfig;
use crate::workers::{Worker, WorkerResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

/// A worker that answers its sub-query with a single LLM call
pub struct LlmWorker {
    name: String,
    description: String,
    system_prompt: String,
    llm: Arc<dyn LLMClient>,
    confidence: f64,
}

impl LlmWorker {
    /// Create a worker with an explicit system prompt and confidence
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LLMClient>,
        confidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            llm,
            confidence,
        }
    }

    /// Create a worker from its `[workers.<name>]` table
    ///
    /// # Arguments
    ///
    /// * `name` - The worker name (table key)
    /// * `config` - The worker configuration from ensemble.toml
    /// * `llm` - The LLM client (already created from the model config)
    pub fn from_config(name: &str, config: &WorkerConfig, llm: Arc<dyn LLMClient>) -> Self {
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| Self::default_system_prompt(name, &config.description));

        Self::new(
            name,
            config.description.clone(),
            system_prompt,
            llm,
            config.confidence,
        )
    }

    fn default_system_prompt(name: &str, description: &str) -> String {
        if description.is_empty() {
            format!(
                "You are the {} analyst. Answer the question thoroughly and factually.",
                name
            )
        } else {
            format!(
                "You are the {} analyst. Your specialty: {}.\n\
                 Answer the question thoroughly and factually, citing concrete data where possible.",
                name, description
            )
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl Worker for LlmWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
        let start = Instant::now();

        let body = self
            .llm
            .generate_with_system(&self.system_prompt, sub_query)
            .await?;
        let body = body.trim();

        if body.is_empty() {
            return Err(AppError::Worker(format!(
                "{} returned an empty answer",
                self.name
            )));
        }

        Ok(WorkerResult::builder(&self.name, sub_query, body)
            .aux("model", self.llm.model_name())
            .aux("body_chars", body.chars().count())
            .confidence(self.confidence)
            .citation([
                ("source", "llm"),
                ("model", self.llm.model_name()),
                ("worker", self.name.as_str()),
            ])
            .duration(start.elapsed())
            .build())
    }
}
