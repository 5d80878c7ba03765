//! TOML-based configuration for ensemble
//!
//! This module provides declarative configuration for providers, models,
//! workers and the orchestration stages via a TOML file (`ensemble.toml`).
//!
//! Secrets are never stored in the file. Providers name the environment
//! variable holding their key (`api_key_env`) and only the hosting layer
//! resolves it, through [`EnsembleConfig::resolve_provider`].

use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from ensemble.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Model used for query decomposition
    pub planner: StageConfig,

    /// Model used for report synthesis (and refinement)
    pub synthesizer: StageConfig,

    /// Worker configurations, registered in name order
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerConfig>,
}

// ============= Orchestrator Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-worker time limit in seconds
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: f64,

    /// Worker selected when planning yields no known worker
    #[serde(default)]
    pub default_worker: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Review/refine rounds applied to the final report (0 disables)
    #[serde(default)]
    pub max_refinement_iterations: u32,

    /// Minimum review score (out of 10) for a report to be accepted
    #[serde(default = "default_refinement_pass_score")]
    pub refinement_pass_score: u8,
}

fn default_worker_timeout_secs() -> f64 {
    60.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_refinement_pass_score() -> u8 {
    9
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_timeout_secs: default_worker_timeout_secs(),
            default_worker: None,
            log_level: default_log_level(),
            max_refinement_iterations: 0,
            refinement_pass_score: default_refinement_pass_score(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,
}

// ============= Stage Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Reference to a model name defined in [models]
    pub model: String,
}

// ============= Worker Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Reference to a model name defined in [models]
    pub model: String,

    /// Specialty description shown to the planner
    #[serde(default)]
    pub description: String,

    /// System prompt for the worker
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Confidence reported on every successful answer
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_confidence() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    UnusedProvider,
    UnusedModel,
    DisabledWorker,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by '{1}' does not exist")]
    MissingModel(String, String),

    #[error("Default worker '{0}' is not an enabled worker")]
    MissingWorker(String),
}

impl EnsembleConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        // Validate model -> provider references
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        self.validate_model_ref(&self.planner.model, "planner")?;
        self.validate_model_ref(&self.synthesizer.model, "synthesizer")?;

        for (worker_name, worker) in &self.workers {
            self.validate_model_ref(&worker.model, &format!("worker '{}'", worker_name))?;

            if !(0.0..=1.0).contains(&worker.confidence) {
                return Err(ConfigError::ValidationError(format!(
                    "Worker '{}' confidence {} is outside [0.0, 1.0]",
                    worker_name, worker.confidence
                )));
            }
        }

        if self.enabled_workers().next().is_none() {
            return Err(ConfigError::ValidationError(
                "At least one enabled worker must be configured".to_string(),
            ));
        }

        if let Some(ref default) = self.orchestrator.default_worker {
            let enabled = self.workers.get(default).map(|w| w.enabled).unwrap_or(false);
            if !enabled {
                return Err(ConfigError::MissingWorker(default.clone()));
            }
        }

        self.worker_timeout()?;

        if self.orchestrator.refinement_pass_score > 10 {
            return Err(ConfigError::ValidationError(format!(
                "refinement_pass_score must be between 0 and 10, got {}",
                self.orchestrator.refinement_pass_score
            )));
        }

        Ok(())
    }

    fn validate_model_ref(&self, model: &str, referrer: &str) -> Result<(), ConfigError> {
        if self.models.contains_key(model) {
            Ok(())
        } else {
            Err(ConfigError::MissingModel(
                model.to_string(),
                referrer.to_string(),
            ))
        }
    }

    /// Validate configuration with warnings for unused items
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unused_providers());
        warnings.extend(self.check_unused_models());
        warnings.extend(self.check_disabled_workers());

        Ok(warnings)
    }

    /// Check for providers that aren't referenced by any model
    fn check_unused_providers(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<_> = self.models.values().map(|m| m.provider.as_str()).collect();

        let mut names: Vec<_> = self
            .providers
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .collect();
        names.sort();

        names
            .into_iter()
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedProvider,
                message: format!(
                    "Provider '{}' is defined but not referenced by any model",
                    name
                ),
            })
            .collect()
    }

    /// Check for models that aren't referenced by a stage or an enabled worker
    fn check_unused_models(&self) -> Vec<ConfigWarning> {
        let mut referenced: HashSet<&str> = self
            .enabled_workers()
            .map(|(_, w)| w.model.as_str())
            .collect();
        referenced.insert(self.planner.model.as_str());
        referenced.insert(self.synthesizer.model.as_str());

        let mut names: Vec<_> = self
            .models
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .collect();
        names.sort();

        names
            .into_iter()
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedModel,
                message: format!("Model '{}' is defined but not used", name),
            })
            .collect()
    }

    fn check_disabled_workers(&self) -> Vec<ConfigWarning> {
        self.workers
            .iter()
            .filter(|(_, w)| !w.enabled)
            .map(|(name, _)| ConfigWarning {
                kind: ConfigWarningKind::DisabledWorker,
                message: format!("Worker '{}' is disabled", name),
            })
            .collect()
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Resolve a model name into a concrete [`Provider`], reading its API key
    /// from the environment when the provider needs one.
    pub fn resolve_provider(&self, model_name: &str) -> Result<Provider, ConfigError> {
        let model = self
            .get_model(model_name)
            .ok_or_else(|| ConfigError::MissingModel(model_name.to_string(), "lookup".to_string()))?;
        let provider = self.get_provider(&model.provider).ok_or_else(|| {
            ConfigError::MissingProvider(model.provider.clone(), model_name.to_string())
        })?;

        Ok(match provider {
            ProviderConfig::Ollama { base_url } => Provider::Ollama {
                base_url: base_url.clone(),
                model: model.model.clone(),
            },
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => Provider::OpenAI {
                api_key: std::env::var(api_key_env)
                    .map_err(|_| ConfigError::MissingEnvVar(api_key_env.clone()))?,
                api_base: api_base.clone(),
                model: model.model.clone(),
            },
        })
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Enabled workers in registration (name) order
    pub fn enabled_workers(&self) -> impl Iterator<Item = (&String, &WorkerConfig)> {
        self.workers.iter().filter(|(_, w)| w.enabled)
    }

    /// Configured default worker, else the first enabled worker
    pub fn default_worker(&self) -> Option<&str> {
        self.orchestrator
            .default_worker
            .as_deref()
            .or_else(|| self.enabled_workers().next().map(|(name, _)| name.as_str()))
    }

    /// Per-worker time limit
    ///
    /// Fails unless `worker_timeout_secs` is positive and fits in a [`Duration`].
    pub fn worker_timeout(&self) -> Result<Duration, ConfigError> {
        let secs = self.orchestrator.worker_timeout_secs;
        match Duration::try_from_secs_f64(secs) {
            Ok(limit) if !limit.is_zero() => Ok(limit),
            _ => Err(ConfigError::ValidationError(format!(
                "worker_timeout_secs must be a positive number of seconds, got {}",
                secs
            ))),
        }
    }
}
