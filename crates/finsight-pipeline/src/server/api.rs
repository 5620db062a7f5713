//! HTTP/JSON API for the analysis pipeline

use crate::engine::{AnalysisPipeline, AnalysisRequest, AnalysisResult, RequestError};
use crate::error::AnalysisError;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<AnalysisPipeline>,
    request_timeout: Duration,
}

impl AppState {
    /// Serve `pipeline` with its configured request timeout
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        let request_timeout = pipeline.config().request_timeout;
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout,
        }
    }

    /// Override the per-request deadline
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Create the Axum router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");
    info!("  GET  /");
    info!("  GET  /health");
    info!("  POST /analyze");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Liveness endpoint
async fn root() -> Json<Value> {
    Json(json!({ "message": "Financial Analysis API is running" }))
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Body of `POST /analyze`
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub ticker: String,
    /// ISO date, `YYYY-MM-DD`
    pub start_date: String,
    /// ISO date, today when omitted
    #[serde(default)]
    pub end_date: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request =
        AnalysisRequest::parse(&body.ticker, &body.start_date, body.end_date.as_deref())?;

    info!(
        ticker = request.ticker(),
        start_date = %request.start_date(),
        end_date = %request.end_date(),
        "analysis requested"
    );

    match tokio::time::timeout(state.request_timeout, state.pipeline.run_analysis(&request)).await
    {
        Ok(outcome) => Ok(Json(outcome?)),
        Err(_) => Err(ApiError::Timeout {
            ticker: request.ticker().to_string(),
            after: state.request_timeout,
        }),
    }
}

/// Failure returned by the API, always rendered as `{"detail": "..."}`
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be parsed or validated
    BadRequest(String),

    /// A pipeline stage failed
    Analysis(AnalysisError),

    /// The run did not finish within the request deadline
    Timeout { ticker: String, after: Duration },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Analysis(_) | Self::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Analysis(err) => err.to_string(),
            Self::Timeout { ticker, after } => format!(
                "analysis failed for {ticker}: timed out after {}s",
                after.as_secs_f64()
            ),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self::Analysis(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        match &self {
            Self::BadRequest(_) => warn!(%detail, "rejected request"),
            Self::Analysis(err) => {
                error!(kind = ?err.kind(), stage = %err.stage(), %detail, "analysis failed");
            }
            Self::Timeout { .. } => error!(%detail, "analysis timed out"),
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
