//! Configuration utilities.

/// TOML configuration (`ensemble.toml`) loading and validation.
pub mod toml_config;

pub use toml_config::{ConfigError, ConfigWarning, ConfigWarningKind, EnsembleConfig};
