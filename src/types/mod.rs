// ============= Error Types =============

/// Crate-wide error type.
///
/// Worker, decomposition and synthesis failures are all carried by this enum,
/// but the orchestration core absorbs them: callers of the pipeline only ever
/// see them reflected in a plan's fallback flag, an execution's error message
/// or a report's `success`/`degraded` flags.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::utils::toml_config::ConfigError> for AppError {
    fn from(err: crate::utils::toml_config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
