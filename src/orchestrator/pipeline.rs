//! End-to-end query pipeline: plan → execute → synthesize (→ refine).

use crate::llm::LLMClient;
use crate::orchestrator::executor::{ExecutionBatch, ParallelExecutor, ProgressObserver};
use crate::orchestrator::planner::{LlmDecomposer, Plan, Planner};
use crate::orchestrator::refine::{RefinementIteration, RefinementLoop};
use crate::orchestrator::synthesizer::{Report, Synthesizer};
use crate::types::{AppError, Result};
use crate::utils::toml_config::EnsembleConfig;
use crate::workers::{LlmWorker, Worker, WorkerRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Everything produced for one query.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub plan: Plan,
    pub batch: ExecutionBatch,
    pub report: Report,
    /// Review history, empty when refinement is disabled or skipped
    pub refinement: Vec<RefinementIteration>,
}

pub struct AnalysisPipeline {
    planner: Planner,
    executor: ParallelExecutor,
    synthesizer: Synthesizer,
    registry: WorkerRegistry,
    refinement: Option<RefinementLoop>,
}

impl AnalysisPipeline {
    pub fn new(
        planner: Planner,
        executor: ParallelExecutor,
        synthesizer: Synthesizer,
        registry: WorkerRegistry,
    ) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
            registry,
            refinement: None,
        }
    }

    pub fn with_refinement(mut self, refinement: RefinementLoop) -> Self {
        self.refinement = Some(refinement);
        self
    }

    /// Assemble a pipeline from configuration.
    ///
    /// `make_client` turns a `[models]` name into a client; each model name is
    /// resolved once and shared by every stage and worker that uses it.
    pub fn from_config<F>(
        config: &EnsembleConfig,
        observer: Arc<dyn ProgressObserver>,
        make_client: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Result<Arc<dyn LLMClient>>,
    {
        let mut clients: HashMap<String, Arc<dyn LLMClient>> = HashMap::new();
        let mut client_for = |model: &str| -> Result<Arc<dyn LLMClient>> {
            if let Some(client) = clients.get(model) {
                return Ok(Arc::clone(client));
            }
            let client = make_client(model)?;
            clients.insert(model.to_string(), Arc::clone(&client));
            Ok(client)
        };

        let mut registry = WorkerRegistry::new();
        for (name, worker_config) in config.enabled_workers() {
            let llm = client_for(&worker_config.model)?;
            let worker: Arc<dyn Worker> =
                Arc::new(LlmWorker::from_config(name, worker_config, llm));
            registry.register(worker);
        }

        let decomposer = Arc::new(LlmDecomposer::new(client_for(&config.planner.model)?));
        let mut planner = Planner::new(decomposer, &registry)?;
        if let Some(default) = config.default_worker() {
            planner = planner.with_default_worker(default)?;
        }

        let synthesis_llm = client_for(&config.synthesizer.model)?;
        let executor = ParallelExecutor::new(config.worker_timeout()?).with_observer(observer);

        let mut pipeline = Self::new(
            planner,
            executor,
            Synthesizer::new(Arc::clone(&synthesis_llm)),
            registry,
        );

        if config.orchestrator.max_refinement_iterations > 0 {
            pipeline = pipeline.with_refinement(RefinementLoop::new(
                synthesis_llm,
                config.orchestrator.max_refinement_iterations,
                config.orchestrator.refinement_pass_score,
            ));
        }

        Ok(pipeline)
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Answer `query`. Worker, planning and synthesis failures are reflected
    /// in the output, never returned as errors.
    pub async fn run(&self, query: &str) -> PipelineOutput {
        info!(query, "Planning");
        let plan = self.planner.plan(query).await;

        info!(workers = ?plan.workers(), fallback = plan.is_fallback(), "Executing plan");
        let batch = self.executor.run(&plan, &self.registry).await;

        info!(succeeded = batch.succeeded_count(), "Synthesizing report");
        let mut report = self
            .synthesizer
            .combine(&batch, query, plan.synthesis_guidance())
            .await;

        let mut refinement = Vec::new();
        if let Some(ref refiner) = self.refinement {
            let outcome = refiner.refine(report, query).await;
            info!(
                accepted = outcome.accepted,
                iterations = outcome.iterations.len(),
                "Refinement finished"
            );
            report = outcome.report;
            refinement = outcome.iterations;
        }

        PipelineOutput {
            plan,
            batch,
            report,
            refinement,
        }
    }

    /// Blocking form of [`AnalysisPipeline::run`]; must not be called inside a tokio runtime.
    pub fn run_blocking(&self, query: &str) -> Result<PipelineOutput> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to start runtime: {}", e)))?;
        Ok(runtime.block_on(self.run(query)))
    }
}
