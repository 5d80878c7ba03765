//! Concurrent worker execution
//!
//! [`ParallelExecutor::run`] fans a [`Plan`] out over a [`WorkerRegistry`]:
//! every selected worker runs in its own task under its own time limit, and
//! the call returns only once every launched worker has reached a terminal
//! state. A failing, slow or panicking worker is recorded in its
//! [`Execution`] and never affects its siblings.

use crate::orchestrator::planner::Plan;
use crate::workers::{Worker, WorkerRegistry, WorkerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle of one worker invocation.
///
/// `Pending → Running → {Completed | Failed}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Runtime record of one worker within a batch.
///
/// `result` is present iff the status is `Completed`, `error_message` iff it
/// is `Failed`, and `end_time` iff the status is terminal.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    worker_name: String,
    status: ExecutionStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration_ms: Option<u64>,
    result: Option<WorkerResult>,
    error_message: Option<String>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl Execution {
    fn pending(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            status: ExecutionStatus::Pending,
            start_time: None,
            end_time: None,
            duration_ms: None,
            result: None,
            error_message: None,
            started: None,
        }
    }

    /// Terminal record for a result obtained outside an executor run.
    pub fn completed(result: WorkerResult) -> Self {
        let mut execution = Self::pending(result.worker_name());
        execution.start();
        execution.complete(result);
        execution
    }

    /// Terminal record for a failure obtained outside an executor run.
    pub fn failed(worker_name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut execution = Self::pending(worker_name);
        execution.start();
        execution.fail(message);
        execution
    }

    fn start(&mut self) {
        if self.status == ExecutionStatus::Pending {
            self.status = ExecutionStatus::Running;
            self.start_time = Some(Utc::now());
            self.started = Some(Instant::now());
        }
    }

    fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
        self.duration_ms = Some(
            self.started
                .map(|started| started.elapsed().as_millis() as u64)
                .unwrap_or(0),
        );
    }

    fn complete(&mut self, result: WorkerResult) {
        if self.status.is_terminal() {
            return;
        }
        self.result = Some(result);
        self.finish(ExecutionStatus::Completed);
    }

    fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.error_message = Some(message.into());
        self.finish(ExecutionStatus::Failed);
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Time from dispatch to terminal transition.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn result(&self) -> Option<&WorkerResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Outcome of one [`ParallelExecutor::run`] call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionBatch {
    batch_id: Uuid,
    started_at: DateTime<Utc>,
    total_duration_ms: u64,
    executions: BTreeMap<String, Execution>,
}

impl ExecutionBatch {
    /// Assemble a batch from terminal executions.
    pub fn from_executions<I>(executions: I, total_duration: Duration) -> Self
    where
        I: IntoIterator<Item = Execution>,
    {
        Self {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            total_duration_ms: total_duration.as_millis() as u64,
            executions: executions
                .into_iter()
                .map(|e| (e.worker_name.clone(), e))
                .collect(),
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time from first dispatch to last terminal transition.
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    pub fn executions(&self) -> &BTreeMap<String, Execution> {
        &self.executions
    }

    pub fn get(&self, worker: &str) -> Option<&Execution> {
        self.executions.get(worker)
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Results of completed executions, keyed by worker name.
    pub fn successful(&self) -> BTreeMap<&str, &WorkerResult> {
        self.executions
            .iter()
            .filter_map(|(name, e)| e.result().map(|r| (name.as_str(), r)))
            .collect()
    }

    /// Names of failed executions, sorted.
    pub fn failed(&self) -> Vec<&str> {
        self.executions
            .iter()
            .filter(|(_, e)| e.status == ExecutionStatus::Failed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn succeeded_count(&self) -> usize {
        self.executions
            .values()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .count()
    }

    pub fn all_completed(&self) -> bool {
        self.executions
            .values()
            .all(|e| e.status == ExecutionStatus::Completed)
    }
}

/// Progress notifications emitted by the executor.
///
/// Callbacks are best-effort: a panicking callback is logged and ignored.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _worker: &str) {}

    fn on_complete(&self, _worker: &str, _result: &WorkerResult) {}

    fn on_error(&self, _worker: &str, _error: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Observer that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_start(&self, worker: &str) {
        debug!(worker, "Worker started");
    }

    fn on_complete(&self, worker: &str, result: &WorkerResult) {
        info!(
            worker,
            duration_ms = result.duration_ms(),
            confidence = result.confidence(),
            "Worker completed"
        );
    }

    fn on_error(&self, worker: &str, error: &str) {
        warn!(worker, error, "Worker failed");
    }
}

fn notify(worker: &str, event: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!(worker, event, "Progress observer panicked, ignoring");
    }
}

/// Runs the workers of a plan concurrently with per-worker time limits.
#[derive(Clone)]
pub struct ParallelExecutor {
    timeout: Duration,
    observer: Arc<dyn ProgressObserver>,
}

impl ParallelExecutor {
    /// Create an executor reporting progress through [`TracingObserver`].
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every planned worker known to `registry` and wait for all of them.
    pub async fn run(&self, plan: &Plan, registry: &WorkerRegistry) -> ExecutionBatch {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut executions: BTreeMap<String, Execution> = BTreeMap::new();
        let mut set = JoinSet::new();

        for name in plan.workers() {
            let Some(worker) = registry.get(name) else {
                warn!(worker = %name, "Planned worker is not registered, skipping");
                continue;
            };
            let sub_query = plan.sub_query(name).unwrap_or_default().to_string();

            executions.insert(name.clone(), Execution::pending(name.clone()));
            set.spawn(execute_one(
                Execution::pending(name.clone()),
                worker,
                sub_query,
                self.timeout,
                Arc::clone(&self.observer),
            ));
        }

        debug!(count = executions.len(), "Dispatched workers");

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(execution) => {
                    executions.insert(execution.worker_name.clone(), execution);
                }
                Err(e) => warn!(error = %e, "Worker task did not return"),
            }
        }

        // A task that never returned leaves its record non-terminal.
        for execution in executions.values_mut() {
            if !execution.status.is_terminal() {
                execution.start();
                execution.fail("worker task aborted");
            }
        }

        let batch = ExecutionBatch {
            batch_id: Uuid::new_v4(),
            started_at,
            total_duration_ms: started.elapsed().as_millis() as u64,
            executions,
        };

        info!(
            batch_id = %batch.batch_id,
            succeeded = batch.succeeded_count(),
            failed = batch.failed().len(),
            total_duration_ms = batch.total_duration_ms,
            "Batch finished"
        );

        batch
    }

    /// Blocking form of [`ParallelExecutor::run`]; must not be called inside a tokio runtime.
    pub fn run_blocking(&self, plan: &Plan, registry: &WorkerRegistry) -> ExecutionBatch {
        match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run(plan, registry)),
            Err(e) => {
                let message = format!("Failed to start runtime: {}", e);
                ExecutionBatch::from_executions(
                    plan.workers()
                        .iter()
                        .filter(|name| registry.contains(name))
                        .map(|name| Execution::failed(name.clone(), message.clone())),
                    Duration::ZERO,
                )
            }
        }
    }
}

async fn execute_one(
    mut execution: Execution,
    worker: Arc<dyn Worker>,
    sub_query: String,
    limit: Duration,
    observer: Arc<dyn ProgressObserver>,
) -> Execution {
    let name = execution.worker_name.clone();

    execution.start();
    notify(&name, "start", || observer.on_start(&name));

    // The inner task turns a worker panic into a JoinError instead of losing the record.
    let mut call = AbortOnDrop(tokio::spawn(async move {
        worker.analyze_with_timeout(&sub_query, limit).await
    }));

    match (&mut call.0).await {
        Ok(Ok(result)) if result.worker_name() != name => {
            let message = format!(
                "worker returned a result for '{}' instead of '{}'",
                result.worker_name(),
                name
            );
            warn!(worker = %name, returned = result.worker_name(), "Result names another worker");
            notify(&name, "error", || observer.on_error(&name, &message));
            execution.fail(message);
        }
        Ok(Ok(result)) => {
            notify(&name, "complete", || observer.on_complete(&name, &result));
            execution.complete(result);
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            notify(&name, "error", || observer.on_error(&name, &message));
            execution.fail(message);
        }
        Err(e) => {
            let message = if e.is_panic() {
                format!("worker panicked: {}", panic_message(e.into_panic()))
            } else {
                format!("worker cancelled: {}", e)
            };
            notify(&name, "error", || observer.on_error(&name, &message));
            execution.fail(message);
        }
    }

    execution
}

/// Aborts the wrapped task when dropped, so cancelling a run cancels its workers.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Timed {
        name: &'static str,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl Worker for Timed {
        fn name(&self) -> &str {
            self.name
        }

        async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AppError::Worker("upstream unavailable".to_string()));
            }
            Ok(WorkerResult::builder(self.name, sub_query, format!("{} says hi", self.name))
                .confidence(0.9)
                .duration(self.delay)
                .build())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Worker for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn analyze(&self, _sub_query: &str) -> Result<WorkerResult> {
            panic!("boom");
        }
    }

    fn timed(name: &'static str, millis: u64, fail: bool) -> Arc<dyn Worker> {
        Arc::new(Timed {
            name,
            delay: Duration::from_millis(millis),
            fail,
        })
    }

    fn plan_for(names: &[&str]) -> Plan {
        Plan::new(names.iter().map(|n| (*n, format!("{} question", n))), "g")
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_entries_terminal_and_isolated() {
        let registry = WorkerRegistry::with_workers([
            timed("review", 100, false),
            timed("market", 200, true),
            timed("purchase", 300, false),
        ]);
        let executor = ParallelExecutor::new(Duration::from_secs(5));

        let batch = executor
            .run(&plan_for(&["review", "market", "purchase"]), &registry)
            .await;

        assert_eq!(batch.len(), 3);
        assert!(batch.executions().values().all(|e| e.status().is_terminal()));
        assert_eq!(batch.failed(), vec!["market"]);
        assert_eq!(batch.succeeded_count(), 2);
        assert!(!batch.all_completed());

        let review = batch.get("review").unwrap();
        assert_eq!(review.status(), ExecutionStatus::Completed);
        assert_eq!(review.result().unwrap().query(), "review question");
        assert!(review.end_time().is_some());
        assert!(review.error_message().is_none());

        let market = batch.get("market").unwrap();
        assert_eq!(
            market.error_message(),
            Some("Worker error: upstream unavailable")
        );
        assert!(market.result().is_none());

        // concurrent: max of the delays, not their sum
        assert!(batch.total_duration_ms() >= 300);
        assert!(batch.total_duration_ms() < 600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_boundary() {
        let registry = WorkerRegistry::with_workers([
            timed("under", 999, false),
            timed("over", 1001, false),
        ]);
        let executor = ParallelExecutor::new(Duration::from_secs(1));

        let batch = executor.run(&plan_for(&["under", "over"]), &registry).await;

        assert_eq!(batch.get("under").unwrap().status(), ExecutionStatus::Completed);
        let over = batch.get("over").unwrap();
        assert_eq!(over.status(), ExecutionStatus::Failed);
        assert_eq!(over.error_message(), Some("timeout after 1s"));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded_as_failed() {
        let registry = WorkerRegistry::with_workers([
            Arc::new(Panicky) as Arc<dyn Worker>,
            timed("review", 1, false),
        ]);
        let executor =
            ParallelExecutor::new(Duration::from_secs(5)).with_observer(Arc::new(NoopObserver));

        let batch = executor.run(&plan_for(&["panicky", "review"]), &registry).await;

        let panicky = batch.get("panicky").unwrap();
        assert_eq!(panicky.status(), ExecutionStatus::Failed);
        assert!(panicky.error_message().unwrap().contains("boom"));
        assert_eq!(batch.get("review").unwrap().status(), ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_unregistered_workers_are_skipped() {
        let registry = WorkerRegistry::with_workers([timed("review", 1, false)]);
        let executor = ParallelExecutor::new(Duration::from_secs(5));

        let batch = executor.run(&plan_for(&["review", "ghost"]), &registry).await;
        assert_eq!(batch.len(), 1);
        assert!(batch.get("ghost").is_none());
        assert!(batch.all_completed());
    }

    struct PanickingObserver {
        calls: AtomicUsize,
    }

    impl ProgressObserver for PanickingObserver {
        fn on_start(&self, _worker: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("observer exploded");
        }

        fn on_complete(&self, _worker: &str, _result: &WorkerResult) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("observer exploded");
        }

        fn on_error(&self, _worker: &str, _error: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("observer exploded");
        }
    }

    #[tokio::test]
    async fn test_observer_panics_do_not_affect_batch() {
        let registry = WorkerRegistry::with_workers([
            timed("review", 1, false),
            timed("market", 1, false),
            timed("purchase", 1, true),
        ]);
        let observer = Arc::new(PanickingObserver {
            calls: AtomicUsize::new(0),
        });
        let executor =
            ParallelExecutor::new(Duration::from_secs(5)).with_observer(observer.clone());

        let batch = executor
            .run(&plan_for(&["review", "market", "purchase"]), &registry)
            .await;

        assert_eq!(batch.succeeded_count(), 2);
        assert_eq!(batch.failed(), vec!["purchase"]);
        assert_eq!(
            batch.get("purchase").unwrap().error_message(),
            Some("Worker error: upstream unavailable")
        );
        // three starts, two completions, one error
        assert_eq!(observer.calls.load(Ordering::SeqCst), 6);
    }

    struct Misnamed;

    #[async_trait]
    impl Worker for Misnamed {
        fn name(&self) -> &str {
            "review"
        }

        async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
            Ok(WorkerResult::builder("market", sub_query, "wrong label").build())
        }
    }

    #[tokio::test]
    async fn test_result_for_another_worker_is_rejected() {
        let registry = WorkerRegistry::with_workers([Arc::new(Misnamed) as Arc<dyn Worker>]);
        let executor =
            ParallelExecutor::new(Duration::from_secs(5)).with_observer(Arc::new(NoopObserver));

        let batch = executor.run(&plan_for(&["review"]), &registry).await;

        let review = batch.get("review").unwrap();
        assert_eq!(review.status(), ExecutionStatus::Failed);
        assert!(review.result().is_none());
        assert_eq!(
            review.error_message(),
            Some("worker returned a result for 'market' instead of 'review'")
        );
    }

    struct Finisher {
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for Finisher {
        fn name(&self) -> &str {
            "finisher"
        }

        async fn analyze(&self, sub_query: &str) -> Result<WorkerResult> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(WorkerResult::builder("finisher", sub_query, "done").build())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_run_cancels_workers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let registry = WorkerRegistry::with_workers([Arc::new(Finisher {
            finished: Arc::clone(&finished),
        }) as Arc<dyn Worker>]);
        let executor = ParallelExecutor::new(Duration::from_secs(30));
        let plan = plan_for(&["finisher"]);

        let cut_short =
            tokio::time::timeout(Duration::from_secs(1), executor.run(&plan, &registry)).await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_blocking() {
        let registry =
            WorkerRegistry::with_workers([timed("review", 5, false), timed("market", 5, true)]);
        let executor = ParallelExecutor::new(Duration::from_secs(5));

        let batch = executor.run_blocking(&plan_for(&["review", "market"]), &registry);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.successful().len(), 1);
        assert_eq!(batch.failed(), vec!["market"]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let execution = Execution::failed("market", "nope");
        let json = serde_json::to_value(&execution).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_message"], "nope");
        assert!(json.get("started").is_none());
    }

    #[test]
    fn test_terminal_state_is_final() {
        let mut execution = Execution::failed("market", "first");
        execution.complete(WorkerResult::builder("market", "q", "late").build());
        assert_eq!(execution.status(), ExecutionStatus::Failed);
        assert!(execution.result().is_none());
        assert_eq!(execution.error_message(), Some("first"));
    }
}
