//! Structured run events
//!
//! The pipeline reports progress through an injected [`PipelineObserver`]
//! instead of logging directly, so embedders decide where events go.

use crate::error::{ErrorKind, Stage};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One thing that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        ticker: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    StageStarted {
        run_id: Uuid,
        stage: Stage,
    },
    StageCompleted {
        run_id: Uuid,
        stage: Stage,
        elapsed: Duration,
    },
    StageFailed {
        run_id: Uuid,
        stage: Stage,
        elapsed: Duration,
        error: String,
    },
    RunCompleted {
        run_id: Uuid,
        ticker: String,
        elapsed: Duration,
    },
    RunFailed {
        run_id: Uuid,
        ticker: String,
        kind: ErrorKind,
        stage: Stage,
        elapsed: Duration,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::StageFailed { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Receives pipeline events
pub trait PipelineObserver: Send + Sync {
    fn record(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted {
                run_id,
                ticker,
                start_date,
                end_date,
            } => info!(%run_id, %ticker, %start_date, %end_date, "analysis started"),
            PipelineEvent::StageStarted { run_id, stage } => {
                info!(%run_id, %stage, "stage started");
            }
            PipelineEvent::StageCompleted {
                run_id,
                stage,
                elapsed,
            } => info!(%run_id, %stage, elapsed_ms = elapsed.as_millis() as u64, "stage completed"),
            PipelineEvent::StageFailed {
                run_id,
                stage,
                elapsed,
                error,
            } => warn!(%run_id, %stage, elapsed_ms = elapsed.as_millis() as u64, %error, "stage failed"),
            PipelineEvent::RunCompleted {
                run_id,
                ticker,
                elapsed,
            } => info!(%run_id, %ticker, elapsed_ms = elapsed.as_millis() as u64, "analysis completed"),
            PipelineEvent::RunFailed {
                run_id,
                ticker,
                kind,
                stage,
                elapsed,
            } => error!(
                %run_id,
                %ticker,
                ?kind,
                %stage,
                elapsed_ms = elapsed.as_millis() as u64,
                "analysis failed"
            ),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn record(&self, _event: &PipelineEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Stages that started, in order
    pub fn started_stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::StageStarted { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    /// Stages that completed, in order
    pub fn completed_stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::StageCompleted { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl PipelineObserver for RecordingObserver {
    fn record(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
