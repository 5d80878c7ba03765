//! Worker Registry
//!
//! Ordered mapping from worker name to worker instance. Registration order is
//! preserved: it decides the order of the planner's fallback plan and of the
//! worker list shown to the decomposition step.

use crate::workers::Worker;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of the workers available to a pipeline.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
    order: Vec<String>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from workers, in iteration order.
    pub fn with_workers<I>(workers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Worker>>,
    {
        let mut registry = Self::new();
        for worker in workers {
            registry.register(worker);
        }
        registry
    }

    /// Register a worker. A worker with the same name is replaced in place.
    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        let name = worker.name().to_string();
        if self.workers.insert(name.clone(), worker).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    /// Worker names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// `(name, description)` pairs in registration order.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.workers
                    .get(name)
                    .map(|w| (name.clone(), w.description().to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.order)
            .finish()
    }
}
