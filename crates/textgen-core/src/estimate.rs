//! Approximate token estimation
//!
//! Provides a single estimator used identically by every provider so that
//! usage records are comparable across backends.

/// Average characters per token for English prose
const CHARS_PER_TOKEN: f32 = 4.0;

/// Deterministic, tokenizer-free token estimator
///
/// Uses a character-count heuristic (~4 characters per token plus a 10%
/// buffer for special tokens) as a stand-in for provider-specific
/// tokenization. Counts are estimates by contract: they must not be
/// assumed to match provider-billed token counts. The estimate is
/// monotone non-decreasing in input length, which streaming relies on for
/// cumulative usage accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    /// Create a new estimator
    pub const fn new() -> Self {
        Self
    }

    /// Estimate the token count of `text`
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let base = (text.len() as f32 / CHARS_PER_TOKEN).ceil() as usize;
        base + base / 10
    }

    /// Estimate prompt tokens: system prompt (when present) plus user prompt
    pub fn prompt_tokens(&self, system_prompt: Option<&str>, prompt: &str) -> usize {
        let mut tokens = self.estimate(prompt);
        if let Some(system) = system_prompt {
            tokens += self.estimate(system);
        }
        tokens
    }
}
