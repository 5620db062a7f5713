//! HTTP server exposing the analysis pipeline

pub mod api;

pub use api::{AnalyzeRequest, ApiError, AppState, create_router, serve};
