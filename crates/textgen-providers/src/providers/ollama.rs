//! Ollama provider implementation
//!
//! This module implements the TextProvider trait against an Ollama-style
//! chat-completion endpoint. Both paths are hand-rolled HTTP/JSON: one
//! POST for unary generation, and newline-delimited JSON objects read
//! incrementally from a chunked response body for streaming.
//! See: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::error::GenerationFailure;
use crate::wire;
use crate::{Result, TextProvider};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use textgen_core::{
    GenerationRequest, GenerationResult, GenerationStream, StreamChunk, TokenEstimator,
    UsageRecord,
};
use tracing::{debug, error, instrument, warn};

/// Default endpoint of a local Ollama daemon
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

const CHAT_PATH: &str = "/api/chat";
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_TOP_K: u32 = 40;

/// Unary requests get a tighter deadline than streams, which stay open
/// for the whole generation.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama provider
///
/// Talks to any endpoint implementing the Ollama chat API, typically a
/// locally hosted daemon serving open-weight models. A bearer credential
/// is attached only when one is configured; stock Ollama does not require
/// one.
pub struct OllamaProvider {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
    estimator: TokenEstimator,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Arguments
    ///
    /// * `model` - Model name known to the backend (e.g. "llama3")
    /// * `base_url` - Endpoint base URL (e.g. "http://localhost:11434")
    /// * `api_key` - Optional bearer credential
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        // Timeouts are set per request: streams need a longer deadline
        // than unary calls, so a client-wide timeout would be wrong for
        // one of the two paths.
        let client = Client::builder().build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            model: model.into(),
            base_url,
            api_key,
            estimator: TokenEstimator::new(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}{CHAT_PATH}", self.base_url)
    }

    fn build_payload(&self, request: &GenerationRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            options: ChatOptions {
                temperature: request.temperature,
                top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
                top_k: request.top_k.unwrap_or(DEFAULT_TOP_K),
                num_predict: request.max_tokens,
                stop: request.stop_sequences.clone(),
            },
        }
    }

    fn post_chat(&self, payload: &ChatRequest, timeout: Duration) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(self.chat_url())
            .timeout(timeout)
            .json(payload);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        builder
    }

    async fn chat_once(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationResult, GenerationFailure> {
        let payload = self.build_payload(request, false);

        let response = self
            .post_chat(&payload, REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationFailure::Decode(e.to_string()))?;

        debug!(
            "Received response - {} bytes of text, eval_count: {}",
            body.message.content.len(),
            body.eval_count
        );

        let prompt_tokens = self
            .estimator
            .prompt_tokens(request.system_prompt.as_deref(), &request.prompt);
        let completion_tokens = self.estimator.estimate(&body.message.content);
        let usage = UsageRecord::estimated(prompt_tokens, completion_tokens)
            .with_metric("eval_count", body.eval_count)
            .with_metric("eval_duration", body.eval_duration)
            .with_metric("total_duration", body.total_duration);

        Ok(GenerationResult::completed(
            body.message.content,
            &self.model,
            usage,
        ))
    }
}

#[async_trait]
impl TextProvider for OllamaProvider {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        debug!("Sending request to Ollama API at {}", self.base_url);

        match self.chat_once(&request).await {
            Ok(result) => result,
            Err(failure) => {
                error!("Error generating content with Ollama: {failure}");
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
        let builder = self.post_chat(&self.build_payload(&request, true), STREAM_TIMEOUT);

        Box::pin(stream! {
            let response = match builder.send().await.and_then(reqwest::Response::error_for_status) {
                Ok(response) => response,
                Err(err) => {
                    error!("Error generating streaming content with Ollama: {err}");
                    yield StreamChunk::error(&model, format!("Error generating content: {err}"));
                    return;
                }
            };

            let mut lines = Box::pin(wire::lines(response.bytes_stream()));
            let mut accumulated = String::new();
            let mut finished = false;

            while let Some(next) = lines.next().await {
                let line = match next {
                    Ok(line) => line,
                    Err(err) => {
                        error!("Error reading Ollama stream: {err}");
                        yield StreamChunk::error(&model, format!("Error generating content: {err}"));
                        return;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let chunk: ChatChunk = match serde_json::from_str(trimmed) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        // One corrupt line must not abort the stream.
                        warn!("Error decoding JSON from Ollama stream: {err}");
                        continue;
                    }
                };

                if !chunk.message.content.is_empty() {
                    accumulated.push_str(&chunk.message.content);
                    let usage =
                        UsageRecord::estimated(prompt_tokens, estimator.estimate(&accumulated));
                    yield StreamChunk::fragment(chunk.message.content, &model, usage);
                }

                // A done line may also carry trailing text, handled above.
                if chunk.done {
                    let usage =
                        UsageRecord::estimated(prompt_tokens, estimator.estimate(&accumulated))
                            .with_metric("eval_count", chunk.eval_count)
                            .with_metric("eval_duration", chunk.eval_duration)
                            .with_metric("total_duration", chunk.total_duration);
                    yield StreamChunk::stopped(&model, usage);
                    finished = true;
                    break;
                }
            }

            if !finished {
                // Backend closed the stream without a done marker.
                let usage = UsageRecord::estimated(prompt_tokens, estimator.estimate(&accumulated))
                    .with_metric("eval_count", 0)
                    .with_metric("eval_duration", 0)
                    .with_metric("total_duration", 0);
                yield StreamChunk::stopped(&model, usage);
            }
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Ollama-specific request/response types
// These match the Ollama chat API format exactly

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ResponseMessage,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    eval_duration: u64,
    #[serde(default)]
    total_duration: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// One line of the newline-delimited streaming response
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: ResponseMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    eval_duration: u64,
    #[serde(default)]
    total_duration: u64,
}
