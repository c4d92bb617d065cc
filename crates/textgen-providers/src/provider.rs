//! Text-generation provider trait definition

use async_trait::async_trait;
use textgen_core::{GenerationRequest, GenerationResult, GenerationStream};

/// Trait for text-generation providers
///
/// Implementations of this trait adapt one backend's native protocol
/// (e.g. Gemini, Ollama) to the uniform generation contract. A provider
/// holds only its fixed connection configuration; each call is
/// independent, and providers are safe for concurrent invocation.
///
/// Failures are in-band: `generate` always returns a
/// [`GenerationResult`], with `FinishReason::Error` and the error message
/// in `text` when the backend or transport fails. `generate_stream`
/// likewise ends with a terminal error chunk instead of failing the
/// stream. Callers never need error handling beyond checking the finish
/// reason.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate one complete response
    async fn generate(&self, request: GenerationRequest) -> GenerationResult;

    /// Generate a lazy stream of incremental chunks
    ///
    /// The connection is established on first poll, chunks are produced
    /// only as the consumer pulls them, and dropping the stream before
    /// its terminal chunk releases the underlying connection.
    fn generate_stream(&self, request: GenerationRequest) -> GenerationStream;

    /// Get the provider name (e.g. "gemini", "ollama")
    fn name(&self) -> &str;

    /// Get the model identifier this provider was constructed with
    fn model(&self) -> &str;
}
