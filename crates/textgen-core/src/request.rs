//! Generation request types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default sampling temperature when none is configured
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Request for text generation, shared by every provider
///
/// A request is constructed once per call via [`GenerationRequestBuilder`]
/// and never mutated afterwards. Provider-specific options that have no
/// uniform field (e.g. safety settings) travel in the `extra` bag and are
/// interpreted by the provider that understands them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature (0.0-1.0)
    pub temperature: f32,

    /// Nucleus sampling threshold (providers default to 0.95 when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling cutoff (providers default to 40 when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sequences that stop generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Provider-specific extension options
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GenerationRequest {
    /// Create a builder for generation requests
    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(prompt)
    }
}

/// Builder for GenerationRequest
pub struct GenerationRequestBuilder {
    prompt: String,
    system_prompt: Option<String>,
    temperature: f32,
    top_p: Option<f32>,
    top_k: Option<u32>,
    max_tokens: Option<u32>,
    stop_sequences: Option<Vec<String>>,
    extra: BTreeMap<String, serde_json::Value>,
}

impl GenerationRequestBuilder {
    /// Create a new builder
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: None,
            top_k: None,
            max_tokens: None,
            stop_sequences: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the nucleus sampling threshold
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the top-k sampling cutoff
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set the maximum tokens to generate
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set stop sequences
    pub fn stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(sequences);
        self
    }

    /// Attach a provider-specific extension option
    pub fn extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Build the generation request
    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_tokens: self.max_tokens,
            stop_sequences: self.stop_sequences,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let request = GenerationRequest::builder("Hello").build();

        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.system_prompt, None);
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.top_p, None);
        assert_eq!(request.top_k, None);
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.stop_sequences, None);
        assert!(request.extra.is_empty());
    }

    #[test]
    fn test_builder_full() {
        let request = GenerationRequest::builder("What is the capital of France?")
            .system_prompt("Keep it short.")
            .temperature(0.2)
            .top_p(0.9)
            .top_k(20)
            .max_tokens(128)
            .stop_sequences(vec!["\n\n".to_string()])
            .extension("safety_settings", json!([{"category": "HARM_CATEGORY_HARASSMENT"}]))
            .build();

        assert_eq!(request.system_prompt.as_deref(), Some("Keep it short."));
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.top_k, Some(20));
        assert_eq!(request.max_tokens, Some(128));
        assert_eq!(request.stop_sequences, Some(vec!["\n\n".to_string()]));
        assert!(request.extra.contains_key("safety_settings"));
    }

    #[test]
    fn test_optional_fields_omitted_in_json() {
        let request = GenerationRequest::builder("hi").build();
        let json = serde_json::to_value(&request).expect("serializes");

        assert!(json.get("max_tokens").is_none());
        assert!(json.get("stop_sequences").is_none());
        assert!(json.get("extra").is_none());
    }
}
