//! Provider adapters for textgen-rs
//!
//! This crate adapts heterogeneous text-generation backends to one uniform
//! contract. It includes:
//!
//! - The [`TextProvider`] trait every adapter implements
//! - A cloud adapter for the Gemini generative-language API
//! - An HTTP adapter for Ollama-style chat-completion endpoints
//! - Configuration types for selecting a provider at startup
//!
//! Generation failures never surface as errors: adapters fold transport,
//! decode, and backend failures into results carrying
//! `FinishReason::Error`, so callers discriminate on the finish reason
//! alone. Only construction and configuration can fail with
//! [`ProviderError`].

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

mod wire;

// Re-export main types
pub use config::{ProviderConfig, ProviderKind, build_provider};
pub use error::{ProviderError, Result};
pub use provider::TextProvider;
pub use providers::{GeminiProvider, OllamaProvider};
