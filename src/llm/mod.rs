//! LLM Provider Clients and Abstractions
//!
//! The orchestration core talks to text-generation backends only through the
//! [`LLMClient`] trait. The planner's decomposition step, the synthesizer's
//! report generation and [`crate::workers::LlmWorker`] all take an
//! `Arc<dyn LLMClient>`, so tests substitute in-process doubles and the
//! hosting layer picks a concrete provider.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use ensemble::llm::Provider;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()?;
//!
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
