//! Gemini provider implementation
//!
//! This module implements the TextProvider trait for Google's Gemini
//! models through the generative-language API. Unary calls are one POST;
//! streaming uses the API's server-sent-event wire format, where each
//! `data:` frame carries one native response chunk.
//! See: https://ai.google.dev/api/generate-content

use crate::error::GenerationFailure;
use crate::wire;
use crate::{ProviderError, Result, TextProvider};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use textgen_core::{
    GenerationRequest, GenerationResult, GenerationStream, StreamChunk, TokenEstimator,
    UsageRecord,
};
use tracing::{debug, error, instrument};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_TOP_K: u32 = 40;

/// Gemini provider
///
/// Supports Gemini models including:
/// - gemini-2.5-pro
/// - gemini-2.5-flash
/// - gemini-2.0-flash
pub struct GeminiProvider {
    client: Client,
    model: String,
    api_base: String,
    api_key: String,
    estimator: TokenEstimator,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Arguments
    ///
    /// * `model` - The Gemini model to use (e.g. "gemini-2.5-pro")
    /// * `api_key` - The Google API key
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            model: model.into(),
            api_base: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            estimator: TokenEstimator::new(),
        })
    }

    /// Create a provider from environment variable
    ///
    /// Reads the API key from the `GEMINI_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            ProviderError::Configuration(
                "GEMINI_API_KEY environment variable not set".to_string(),
            )
        })?;
        Self::new(model, api_key)
    }

    /// Override the API base URL (e.g. for a regional endpoint or a test double)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        )
    }

    async fn generate_once(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationResult, GenerationFailure> {
        let payload = build_native_request(request);

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationFailure::Decode(e.to_string()))?;
        let text = body.text().ok_or_else(|| {
            GenerationFailure::Backend("no candidates in response".to_string())
        })?;

        let prompt_tokens = self
            .estimator
            .prompt_tokens(request.system_prompt.as_deref(), &request.prompt);
        let completion_tokens = self.estimator.estimate(&text);

        debug!(
            "Received response - tokens (estimated): {}/{}",
            prompt_tokens, completion_tokens
        );

        // The API reports no finish reason worth mapping on the unary
        // path; success is "stop" by contract.
        Ok(GenerationResult::completed(
            text,
            &self.model,
            UsageRecord::estimated(prompt_tokens, completion_tokens),
        ))
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        debug!("Sending request to Gemini API");

        match self.generate_once(&request).await {
            Ok(result) => result,
            Err(failure) => {
                error!("Error generating content with Gemini: {failure}");
                GenerationResult::error(
                    &self.model,
                    format!("Error generating content: {failure}"),
                )
            }
        }
    }

    fn generate_stream(&self, request: GenerationRequest) -> GenerationStream {
        let model = self.model.clone();
        let estimator = self.estimator;
        let prompt_tokens = estimator.prompt_tokens(request.system_prompt.as_deref(), &request.prompt);
        let builder = self
            .client
            .post(self.stream_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_native_request(&request));

        Box::pin(stream! {
            let response = match builder.send().await.and_then(reqwest::Response::error_for_status) {
                Ok(response) => response,
                Err(err) => {
                    error!("Error generating streaming content with Gemini: {err}");
                    yield StreamChunk::error(&model, format!("Error generating content: {err}"));
                    return;
                }
            };

            let mut lines = Box::pin(wire::lines(response.bytes_stream()));
            let mut accumulated = String::new();

            while let Some(next) = lines.next().await {
                let line = match next {
                    Ok(line) => line,
                    Err(err) => {
                        error!("Error processing Gemini stream chunk: {err}");
                        yield StreamChunk::error(&model, String::new());
                        return;
                    }
                };

                // SSE framing: chunks arrive as "data: {json}" frames;
                // everything else (blank separators, comments) is skipped.
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim_start();
                if data.is_empty() {
                    continue;
                }

                let chunk: GenerateContentResponse = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        error!("Error processing Gemini stream chunk: {err}");
                        yield StreamChunk::error(&model, String::new());
                        return;
                    }
                };

                let fragment = chunk.text().unwrap_or_default();
                if fragment.is_empty() {
                    continue;
                }

                accumulated.push_str(&fragment);
                let usage = UsageRecord::estimated(prompt_tokens, estimator.estimate(&accumulated));
                yield StreamChunk::fragment(fragment, &model, usage);
            }

            // Native stream exhausted: final chunk with complete counts.
            let usage = UsageRecord::estimated(prompt_tokens, estimator.estimate(&accumulated));
            yield StreamChunk::stopped(&model, usage);
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Gemini-specific request/response types
// These match the generative-language API format exactly

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_settings: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect(),
        )
    }
}

/// Map the uniform request onto the provider-native shape
fn build_native_request(request: &GenerationRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: request.prompt.clone(),
            }],
        }],
        system_instruction: request.system_prompt.as_ref().map(|system| Content {
            role: None,
            parts: vec![Part {
                text: system.clone(),
            }],
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
            top_k: request.top_k.unwrap_or(DEFAULT_TOP_K),
            max_output_tokens: request.max_tokens,
            stop_sequences: request.stop_sequences.clone(),
        },
        safety_settings: request.extra.get("safety_settings").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use textgen_core::FinishReason;

    fn provider(api_base: &str) -> GeminiProvider {
        GeminiProvider::new("gemini-2.5-pro", "test-key")
            .expect("provider builds")
            .with_api_base(api_base)
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("gemini-2.5-pro", "test-key").expect("builds");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-pro");
        assert!(provider.generate_url().ends_with("/models/gemini-2.5-pro:generateContent"));
        assert!(provider.stream_url().ends_with(":streamGenerateContent?alt=sse"));
    }

    #[test]
    fn test_from_env_without_key() {
        // SAFETY: test-only env mutation, no concurrent reader of this var
        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
        }
        let result = GeminiProvider::from_env("gemini-2.5-pro");
        assert!(result.is_err());
    }

    #[test]
    fn test_native_request_defaults() {
        let request = GenerationRequest::builder("Hello").build();
        let payload = serde_json::to_value(build_native_request(&request)).expect("serializes");

        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(payload["generationConfig"]["temperature"], 0.7);
        assert_eq!(payload["generationConfig"]["topP"], 0.95);
        assert_eq!(payload["generationConfig"]["topK"], 40);
        assert!(payload.get("systemInstruction").is_none());
        assert!(payload["generationConfig"].get("maxOutputTokens").is_none());
        assert!(payload["generationConfig"].get("stopSequences").is_none());
        assert!(payload.get("safetySettings").is_none());
    }

    #[test]
    fn test_native_request_full() {
        let request = GenerationRequest::builder("Hello")
            .system_prompt("Keep it short.")
            .temperature(0.3)
            .top_p(0.8)
            .top_k(10)
            .max_tokens(256)
            .stop_sequences(vec!["END".to_string()])
            .extension("safety_settings", json!([{"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"}]))
            .build();
        let payload = serde_json::to_value(build_native_request(&request)).expect("serializes");

        assert_eq!(payload["systemInstruction"]["parts"][0]["text"], "Keep it short.");
        assert_eq!(payload["generationConfig"]["temperature"], 0.3);
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(payload["generationConfig"]["stopSequences"][0], "END");
        assert_eq!(
            payload["safetySettings"][0]["category"],
            "HARM_CATEGORY_HARASSMENT"
        );
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Par"}, {"text": "is."}]}
            }]
        }))
        .expect("deserializes");
        assert_eq!(body.text().as_deref(), Some("Paris."));

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).expect("deserializes");
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-pro:generateContent")
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Paris."}]},"finishReason":"STOP"}]}"#,
            )
            .create_async()
            .await;

        let provider = provider(&server.url());
        let request = GenerationRequest::builder("What is the capital of France?")
            .system_prompt("Keep it short.")
            .build();
        let result = provider.generate(request).await;

        mock.assert_async().await;
        assert_eq!(result.text, "Paris.");
        assert_eq!(result.finish_reason, Some(FinishReason::Stop));
        assert!(result.usage.total_tokens > 0);
        assert_eq!(
            result.usage.total_tokens,
            result.usage.prompt_tokens + result.usage.completion_tokens
        );
    }

    #[tokio::test]
    async fn test_generate_no_candidates_is_error_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let provider = provider(&server.url());
        let result = provider
            .generate(GenerationRequest::builder("hi").build())
            .await;

        assert_eq!(result.finish_reason, Some(FinishReason::Error));
        assert!(result.text.contains("no candidates"));
        assert!(result.usage.is_empty());
    }

    #[tokio::test]
    async fn test_generate_connection_refused_is_error_result() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("binds");
            listener.local_addr().expect("has addr").port()
        };

        let provider = provider(&format!("http://127.0.0.1:{port}"));
        let result = provider
            .generate(GenerationRequest::builder("hi").build())
            .await;

        assert_eq!(result.finish_reason, Some(FinishReason::Error));
        assert!(result.text.starts_with("Error generating content:"));
        assert!(result.usage.is_empty());
    }

    #[tokio::test]
    async fn test_stream_chunks_and_terminal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-pro:streamGenerateContent?alt=sse")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Par\"}]}}]}\n\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"is.\"}]}}]}\n\n",
            ))
            .create_async()
            .await;

        let provider = provider(&server.url());
        let chunks: Vec<_> = provider
            .generate_stream(GenerationRequest::builder("capital of France?").build())
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "Par");
        assert_eq!(chunks[1].text, "is.");
        assert_eq!(chunks[2].text, "");
        assert_eq!(chunks[2].finish_reason, Some(FinishReason::Stop));

        let full: String = chunks
            .iter()
            .filter(|c| !c.is_terminal())
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(full, "Paris.");

        let counts: Vec<_> = chunks.iter().map(|c| c.usage.completion_tokens).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_stream_malformed_frame_ends_with_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-pro:streamGenerateContent?alt=sse")
            .with_status(200)
            .with_body(concat!(
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
                "data: {broken\n\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"never\"}]}}]}\n\n",
            ))
            .create_async()
            .await;

        let provider = provider(&server.url());
        let chunks: Vec<_> = provider
            .generate_stream(GenerationRequest::builder("hi").build())
            .collect()
            .await;

        // One fragment, then the error chunk; nothing after, no stop
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Hel");
        assert_eq!(chunks[1].finish_reason, Some(FinishReason::Error));
        assert_eq!(chunks[1].text, "");
        assert!(chunks[1].usage.is_empty());
    }

    #[tokio::test]
    async fn test_stream_connection_refused_single_error_chunk() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("binds");
            listener.local_addr().expect("has addr").port()
        };

        let provider = provider(&format!("http://127.0.0.1:{port}"));
        let chunks: Vec<_> = provider
            .generate_stream(GenerationRequest::builder("hi").build())
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].finish_reason, Some(FinishReason::Error));
        assert!(chunks[0].text.starts_with("Error generating content:"));
    }
}
