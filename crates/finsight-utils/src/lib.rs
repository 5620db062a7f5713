//! Shared utilities for finsight
//!
//! This crate provides the process-level plumbing used by the finsight
//! binaries: tracing subscriber setup and configuration loaded from the
//! environment. Library crates only emit `tracing` events; installing a
//! subscriber is left to whoever owns `main`.

pub mod config;
pub mod logging;

pub use config::{ConfigError, LogConfig, LogFormat, ServerConfig};
pub use logging::{init_tracing, init_tracing_with};
