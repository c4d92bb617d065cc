//! Shared utilities for textgen-rs
//!
//! This crate provides common functionality used across the textgen-rs
//! workspace: logging setup and environment-backed settings.

pub mod config;
pub mod logging;

pub use config::Settings;
pub use logging::init_tracing;
