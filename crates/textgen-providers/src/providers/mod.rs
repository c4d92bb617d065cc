//! Concrete provider implementations
//!
//! This module contains implementations of the TextProvider trait for
//! the supported generation backends.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
