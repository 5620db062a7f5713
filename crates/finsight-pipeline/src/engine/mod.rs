//! Orchestration of an analysis run

pub mod observer;
pub mod pipeline;
pub mod request;
pub mod result;

pub use observer::{
    NoopObserver, PipelineEvent, PipelineObserver, RecordingObserver, TracingObserver,
};
pub use pipeline::{AnalysisPipeline, AnalysisPipelineBuilder, RunError};
pub use request::{AnalysisRequest, RequestError};
pub use result::AnalysisResult;
