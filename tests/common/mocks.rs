//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, workers and observers that can be
//! used across different test files without duplication.

use async_trait::async_trait;
use ensemble::llm::LLMClient;
use ensemble::orchestrator::ProgressObserver;
use ensemble::types::{AppError, Result};
use ensemble::workers::{Worker, WorkerResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Mock LLM client with a fixed reply and a call counter.
///
/// # Examples
///
/// ```ignore
/// // Create a client that returns a simple response
/// let client = MockLLMClient::new("Hello, world!");
///
/// // Create a client that always fails
/// let client = MockLLMClient::failing();
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Number of generate calls made so far (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn respond(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.respond(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Worker that answers with a fixed body after an optional delay.
pub struct StaticWorker {
    name: String,
    description: String,
    body: String,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticWorker {
    pub fn new(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("{} specialist", name),
            body: body.to_string(),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared handle to the call counter, usable after the worker is registered.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared handle to the received sub-queries.
    pub fn queries(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl Worker for StaticWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
        let start = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(sub_query.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(WorkerResult::builder(&self.name, sub_query, &self.body)
            .aux("worker", self.name.as_str())
            .confidence(0.8)
            .citation([("source", "static")])
            .duration(start.elapsed())
            .build())
    }
}

/// Worker that always fails with a worker error.
pub struct FailingWorker {
    name: String,
}

impl FailingWorker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Worker for FailingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, _sub_query: &str) -> Result<WorkerResult> {
        Err(AppError::Worker(format!("{} backend unavailable", self.name)))
    }
}

/// Worker that sleeps for a fixed time before answering.
pub struct SlowWorker {
    name: String,
    delay: Duration,
}

impl SlowWorker {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl Worker for SlowWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
        tokio::time::sleep(self.delay).await;
        Ok(WorkerResult::builder(&self.name, sub_query, "finally done")
            .confidence(0.5)
            .duration(self.delay)
            .build())
    }
}

/// Observer that records every event as a string.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_start(&self, worker: &str) {
        self.events.lock().push(format!("start:{}", worker));
    }

    fn on_complete(&self, worker: &str, _result: &WorkerResult) {
        self.events.lock().push(format!("complete:{}", worker));
    }

    fn on_error(&self, worker: &str, error: &str) {
        self.events.lock().push(format!("error:{}:{}", worker, error));
    }
}

/// Plan JSON as an LLM decomposer would return it.
pub fn plan_json(assignments: &[(&str, &str)], guidance: &str) -> String {
    let workers: Vec<&str> = assignments.iter().map(|(w, _)| *w).collect();
    let sub_queries: serde_json::Map<String, serde_json::Value> = assignments
        .iter()
        .map(|(w, q)| (w.to_string(), serde_json::Value::String(q.to_string())))
        .collect();
    serde_json::json!({
        "workers": workers,
        "sub_queries": sub_queries,
        "synthesis_guidance": guidance,
        "priority_worker": workers.first(),
    })
    .to_string()
}
