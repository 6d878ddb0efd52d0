//! Core domain model types for stagewatch.
//!
//! This module contains the value types shared by the monitor and the error
//! handler:
//! - status, severity and level enums
//! - pipeline errors and warnings
//! - stage, pipeline, resource and quality metrics
//! - stage and pipeline state records
//! - lifecycle events

mod error;
mod event;
mod metrics;
mod pipeline;
mod stage;
mod status;

pub use error::{PipelineError, PipelineWarning};
pub use event::{PipelineEvent, PipelineEventType};
pub use metrics::{
    PipelineMetrics, QualityMetrics, ResourceUsage, StageMetrics, StageMetricsUpdate,
};
pub use pipeline::{PipelineLog, PipelineStatus};
pub use stage::{PipelineStage, StageDefinition};
pub use status::{Impact, LogLevel, PipelineState, Severity, StageStatus, WarningType};
