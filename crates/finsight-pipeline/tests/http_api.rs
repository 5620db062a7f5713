//! HTTP API behavior against an offline pipeline

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use common::{SlowForecaster, StubNarrator, offline_pipeline, offline_pipeline_with};
use finsight_pipeline::server::{AppState, create_router};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn analyze(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_analyze_success_shape() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(AppState::new(offline_pipeline(
        250,
        StubNarrator::new(),
        dir.path(),
    )));

    let response = app
        .oneshot(analyze(
            r#"{"ticker": "AAPL", "start_date": "2023-01-01", "end_date": "2023-12-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["ticker"], "AAPL");
    assert!(!json["market_insights"].as_str().unwrap().is_empty());
    assert_eq!(json["prediction_results"]["forecast"].as_array().unwrap().len(), 7);
    assert_eq!(
        json["prediction_results"]["confidence_interval"]
            .as_array()
            .unwrap()
            .len(),
        7
    );
    assert_eq!(json["visualization_paths"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_analyze_without_end_date_defaults_to_today() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(AppState::new(offline_pipeline(
        250,
        StubNarrator::new(),
        dir.path(),
    )));

    let response = app
        .oneshot(analyze(r#"{"ticker": "AAPL", "start_date": "2023-01-01"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_insufficient_history_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(AppState::new(offline_pipeline(
        1,
        StubNarrator::new(),
        dir.path(),
    )));

    let response = app
        .oneshot(analyze(
            r#"{"ticker": "AAPL", "start_date": "2023-01-02", "end_date": "2023-01-02"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("AAPL"));
    assert!(detail.contains("feature derivation"));
}

#[tokio::test]
async fn test_slow_run_times_out_as_500() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(offline_pipeline(
        250,
        StubNarrator::slow(Duration::from_secs(5)),
        dir.path(),
    ))
    .with_timeout(Duration::from_millis(50));
    let app = create_router(state);

    let response = app
        .oneshot(analyze(
            r#"{"ticker": "AAPL", "start_date": "2023-01-01", "end_date": "2023-12-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("AAPL"));
    assert!(detail.contains("timed out"));
}

#[tokio::test]
async fn test_deadline_interrupts_blocking_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(offline_pipeline_with(
        250,
        StubNarrator::new(),
        Arc::new(SlowForecaster::new(Duration::from_secs(2))),
        dir.path(),
    ))
    .with_timeout(Duration::from_millis(100));
    let app = create_router(state);

    let started = Instant::now();
    let response = app
        .oneshot(analyze(
            r#"{"ticker": "AAPL", "start_date": "2023-01-01", "end_date": "2023-12-31"}"#,
        ))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    let json = json_body(response).await;
    assert!(json["detail"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_bad_date_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(AppState::new(offline_pipeline(
        250,
        StubNarrator::new(),
        dir.path(),
    )));

    let response = app
        .oneshot(analyze(r#"{"ticker": "AAPL", "start_date": "01/02/2023"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"].is_string());
}
