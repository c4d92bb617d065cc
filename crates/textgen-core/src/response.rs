//! Generation result and stream chunk types

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;

/// Terminal status of a generation result
///
/// Intermediate stream chunks carry no finish reason (`None` on
/// [`GenerationResult::finish_reason`]); the single terminal chunk of a
/// stream, and every non-streaming result, carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Generation completed normally
    Stop,

    /// Generation failed; the result text carries the error message
    Error,
}

/// Approximate token accounting for one generation
///
/// Counts are produced by [`crate::TokenEstimator`] and are estimates, not
/// provider-billed token counts. `metrics` carries backend-reported extras
/// (e.g. evaluation counts and durations) verbatim and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Estimated tokens in the system and user prompts
    pub prompt_tokens: usize,

    /// Estimated tokens in the generated text so far
    pub completion_tokens: usize,

    /// Invariant: prompt_tokens + completion_tokens
    pub total_tokens: usize,

    /// Backend-reported metrics, keyed by the backend's own field names
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, u64>,
}

impl UsageRecord {
    /// The empty record returned on every error path
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a record from estimated prompt and completion counts
    pub fn estimated(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            metrics: BTreeMap::new(),
        }
    }

    /// Attach a backend-reported metric
    pub fn with_metric(mut self, name: impl Into<String>, value: u64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// True for the empty record produced on error paths
    pub fn is_empty(&self) -> bool {
        self.prompt_tokens == 0
            && self.completion_tokens == 0
            && self.total_tokens == 0
            && self.metrics.is_empty()
    }
}

/// One generation outcome: a complete response or a single stream chunk
///
/// Failures are in-band: a provider never returns an error for a
/// generation, it returns a result with [`FinishReason::Error`] and the
/// error message in `text`. Callers discriminate on `finish_reason`, never
/// on a wrapping `Result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated text; a fragment when this is an intermediate chunk
    pub text: String,

    /// Model identifier that produced this result
    pub model: String,

    /// None while a stream is in progress, Some on terminal results
    pub finish_reason: Option<FinishReason>,

    /// Token accounting; cumulative across chunks within one stream
    pub usage: UsageRecord,
}

impl GenerationResult {
    /// A completed response
    pub fn completed(text: impl Into<String>, model: impl Into<String>, usage: UsageRecord) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            finish_reason: Some(FinishReason::Stop),
            usage,
        }
    }

    /// An intermediate stream chunk carrying a new text fragment
    pub fn fragment(text: impl Into<String>, model: impl Into<String>, usage: UsageRecord) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            finish_reason: None,
            usage,
        }
    }

    /// The terminal chunk of a successful stream (empty text, final usage)
    pub fn stopped(model: impl Into<String>, usage: UsageRecord) -> Self {
        Self {
            text: String::new(),
            model: model.into(),
            finish_reason: Some(FinishReason::Stop),
            usage,
        }
    }

    /// An in-band failure result; `text` carries the message (may be empty)
    pub fn error(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            finish_reason: Some(FinishReason::Error),
            usage: UsageRecord::empty(),
        }
    }

    /// True once a finish reason is present (last chunk of a stream)
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// True when this result reports a failure
    pub fn is_error(&self) -> bool {
        self.finish_reason == Some(FinishReason::Error)
    }
}

/// One fragment of an in-progress streamed generation
///
/// Structurally a [`GenerationResult`]: `text` is the new fragment only,
/// `finish_reason` is None except on the last chunk, and
/// `usage.completion_tokens` is a running total over all text emitted so
/// far within the stream.
pub type StreamChunk = GenerationResult;

/// A lazy, single-pass sequence of stream chunks
///
/// Terminated exactly once by a chunk with a finish reason; no chunk
/// follows the terminal one. Dropping the stream before its terminal chunk
/// releases the underlying connection.
pub type GenerationStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;
