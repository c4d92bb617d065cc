//! Error types for provider construction and selection
//!
//! Generation-time failures are not represented here: providers report
//! them in-band through `FinishReason::Error` results. These errors cover
//! the construction surface only.

use thiserror::Error;

/// Result type for provider construction
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while constructing or selecting a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider name not recognized by the factory
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// Classification of generation-time failures
///
/// Never crosses the public API: every variant is folded into an in-band
/// result carrying `FinishReason::Error`, with this Display output as the
/// embedded message.
#[derive(Error, Debug)]
pub(crate) enum GenerationFailure {
    /// Connection refused, timeout, or non-2xx status
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed JSON or unexpected response shape
    #[error("{0}")]
    Decode(String),

    /// Backend reported an explicit failure
    #[error("{0}")]
    Backend(String),
}
