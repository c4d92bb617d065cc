//! Agent entry point for textgen-rs
//!
//! This crate is the seam between an agent framework and the provider
//! layer: a deterministic bundle of dependencies plus a query string goes
//! in, and whatever the active provider produces comes back out. It adds
//! no behavior of its own - no retries, no response shaping.

pub mod agent;

// Re-export key types
pub use agent::{AgentDeps, run_agent, run_agent_stream};
