//! Environment-backed settings
//!
//! Deployment surface: `LLM_PROVIDER`, `PRIMARY_MODEL`, `BASE_URL`, and
//! `LLM_API_KEY` / `GEMINI_API_KEY` select and credential the active
//! provider. These are read once at startup and passed down explicitly.

use serde::{Deserialize, Serialize};

/// Provider selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Active provider name ("gemini" or "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Base URL for HTTP providers
    pub base_url: String,

    /// API credential, when the backend requires one
    pub api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults
    ///
    /// The literal credential value `NOT_REQUIRED` is treated as unset,
    /// so deployments can pin the variable without sending a bearer
    /// header.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            provider: std::env::var("LLM_PROVIDER").unwrap_or(default.provider),
            model: std::env::var("PRIMARY_MODEL").unwrap_or(default.model),
            base_url: std::env::var("BASE_URL").unwrap_or(default.base_url),
            api_key: std::env::var("LLM_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .filter(|key| key != "NOT_REQUIRED"),
        }
    }
}
