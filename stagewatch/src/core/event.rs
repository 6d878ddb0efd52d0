//! Pipeline lifecycle events delivered through the event bus.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of event types the monitor publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventType {
    /// A stage entered `running`.
    StageStarted,
    /// A stage reached `completed`.
    StageCompleted,
    /// A stage reached `failed`.
    StageFailed,
    /// Stage progress or pipeline aggregates changed.
    ProgressUpdated,
    /// An error was recorded.
    ErrorOccurred,
    /// A warning was recorded.
    WarningIssued,
    /// A resource threshold was exceeded.
    ResourceAlert,
    /// A quality threshold was breached.
    QualityAlert,
    /// The pipeline completed.
    PipelineCompleted,
    /// The pipeline failed.
    PipelineFailed,
}

impl PipelineEventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::StageStarted,
        Self::StageCompleted,
        Self::StageFailed,
        Self::ProgressUpdated,
        Self::ErrorOccurred,
        Self::WarningIssued,
        Self::ResourceAlert,
        Self::QualityAlert,
        Self::PipelineCompleted,
        Self::PipelineFailed,
    ];

    /// Returns the wire name of this event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StageStarted => "stage_started",
            Self::StageCompleted => "stage_completed",
            Self::StageFailed => "stage_failed",
            Self::ProgressUpdated => "progress_updated",
            Self::ErrorOccurred => "error_occurred",
            Self::WarningIssued => "warning_issued",
            Self::ResourceAlert => "resource_alert",
            Self::QualityAlert => "quality_alert",
            Self::PipelineCompleted => "pipeline_completed",
            Self::PipelineFailed => "pipeline_failed",
        }
    }

    /// Returns true for threshold alerts.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::ResourceAlert | Self::QualityAlert)
    }
}

impl fmt::Display for PipelineEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event emitted by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type.
    #[serde(rename = "type")]
    pub event_type: PipelineEventType,
    /// When the event was created.
    pub timestamp: Timestamp,
    /// Pipeline the event belongs to.
    pub pipeline_id: String,
    /// Stage the event belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PipelineEvent {
    /// Creates a pipeline-level event with an empty payload.
    #[must_use]
    pub fn new(event_type: PipelineEventType, pipeline_id: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: now_utc(),
            pipeline_id: pipeline_id.into(),
            stage_id: None,
            data: serde_json::Value::Null,
        }
    }

    /// Attaches a stage id.
    #[must_use]
    pub fn for_stage(mut self, stage_id: impl Into<String>) -> Self {
        self.stage_id = Some(stage_id.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(PipelineEventType::StageStarted.to_string(), "stage_started");
        assert_eq!(PipelineEventType::ResourceAlert.as_str(), "resource_alert");
        let json = serde_json::to_string(&PipelineEventType::PipelineFailed).unwrap();
        assert_eq!(json, r#""pipeline_failed""#);
    }

    #[test]
    fn test_all_covers_every_type_once() {
        let unique: std::collections::HashSet<_> = PipelineEventType::ALL.iter().collect();
        assert_eq!(unique.len(), PipelineEventType::ALL.len());
    }

    #[test]
    fn test_event_builder() {
        let event = PipelineEvent::new(PipelineEventType::StageStarted, "p1")
            .for_stage("decode")
            .with_data(serde_json::json!({"progress": 0}));

        assert_eq!(event.pipeline_id, "p1");
        assert_eq!(event.stage_id.as_deref(), Some("decode"));
        assert_eq!(event.data["progress"], 0);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = PipelineEvent::new(PipelineEventType::PipelineCompleted, "p1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pipeline_completed");
        assert!(json.get("stage_id").is_none());
    }
}
