//! Provider selection and construction
//!
//! The active provider is chosen once at startup from an explicit
//! configuration value; there is no ambient or global provider state.

use crate::providers::ollama::DEFAULT_OLLAMA_BASE_URL;
use crate::{GeminiProvider, OllamaProvider, ProviderError, Result, TextProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Which backend adapter to instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Cloud generative-language API
    Gemini,
    /// Self-hosted chat-completion endpoint
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Configuration for constructing the active provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Backend to use
    pub kind: ProviderKind,

    /// Model identifier
    pub model: String,

    /// Base URL for HTTP backends; ignored by the cloud backend
    pub base_url: Option<String>,

    /// API credential; required by Gemini, optional for Ollama
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Config for a Gemini provider
    pub fn gemini(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Gemini,
            model: model.into(),
            base_url: None,
            api_key: Some(api_key.into()),
        }
    }

    /// Config for an Ollama provider against the default local endpoint
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Ollama,
            model: model.into(),
            base_url: None,
            api_key: None,
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the API credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Build the configured provider
///
/// Returns the adapter behind the uniform trait object; callers invoke it
/// without knowing which backend is active.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn TextProvider>> {
    info!(kind = ?config.kind, model = %config.model, "Building text provider");

    match config.kind {
        ProviderKind::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::Configuration("Gemini provider requires an API key".to_string())
            })?;
            Ok(Arc::new(GeminiProvider::new(&config.model, api_key)?))
        }
        ProviderKind::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
            Ok(Arc::new(OllamaProvider::new(
                &config.model,
                base_url,
                config.api_key.clone(),
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("gemini".parse::<ProviderKind>().ok(), Some(ProviderKind::Gemini));
        assert_eq!("Ollama".parse::<ProviderKind>().ok(), Some(ProviderKind::Ollama));

        let result = "openai".parse::<ProviderKind>();
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }

    #[test]
    fn test_build_gemini() {
        let config = ProviderConfig::gemini("gemini-2.5-pro", "test-key");
        let provider = build_provider(&config).expect("builds");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_build_gemini_without_key_fails() {
        let config = ProviderConfig {
            kind: ProviderKind::Gemini,
            model: "gemini-2.5-pro".to_string(),
            base_url: None,
            api_key: None,
        };
        let result = build_provider(&config);
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_build_ollama_with_defaults() {
        let config = ProviderConfig::ollama("llama3");
        let provider = build_provider(&config).expect("builds");
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3");
    }

    #[test]
    fn test_build_ollama_with_overrides() {
        let config = ProviderConfig::ollama("llama3")
            .with_base_url("http://10.0.0.5:11434")
            .with_api_key("secret");
        let provider = build_provider(&config).expect("builds");
        assert_eq!(provider.name(), "ollama");
    }
}
