//! Core types for textgen-rs
//!
//! This crate defines the provider-agnostic data model shared by every
//! text-generation backend:
//!
//! - Generation request types with a builder for sampling parameters
//! - Result and stream-chunk types with in-band finish reasons
//! - Usage records with approximate token accounting
//! - A deterministic token estimator

pub mod estimate;
pub mod request;
pub mod response;

// Re-export main types
pub use estimate::TokenEstimator;
pub use request::{GenerationRequest, GenerationRequestBuilder};
pub use response::{FinishReason, GenerationResult, GenerationStream, StreamChunk, UsageRecord};
