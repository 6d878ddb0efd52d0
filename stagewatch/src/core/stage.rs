//! Stage declarations and the per-stage state record.

use super::error::{PipelineError, PipelineWarning};
use super::metrics::StageMetrics;
use super::status::StageStatus;
use crate::utils::{duration_between, now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// Declaration of a stage when a pipeline is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage id, unique within the pipeline.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Expected duration in milliseconds, used for the initial ETA.
    #[serde(default)]
    pub estimated_duration_ms: u64,
    /// Ids of stages that must complete (or be skipped) first.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl StageDefinition {
    /// Creates a stage definition without dependencies.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            estimated_duration_ms: 0,
            dependencies: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the estimated duration.
    #[must_use]
    pub fn with_estimated_duration_ms(mut self, ms: u64) -> Self {
        self.estimated_duration_ms = ms;
        self
    }

    /// Adds a single dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Adds multiple dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Runtime state of one stage inside a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    /// Stage id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: StageStatus,
    /// Progress in percent, 0..=100.
    pub progress: f64,
    /// When the stage entered `running`.
    pub start_time: Option<Timestamp>,
    /// When the stage left `running`.
    pub end_time: Option<Timestamp>,
    /// Wall time between start and end, in milliseconds.
    pub duration_ms: Option<u64>,
    /// Expected duration in milliseconds.
    pub estimated_duration_ms: u64,
    /// Declared dependencies.
    pub dependencies: Vec<String>,
    /// Output artefacts reported on completion.
    pub outputs: Vec<String>,
    /// Resource and throughput counters.
    pub metrics: StageMetrics,
    /// Errors attached to this stage.
    pub errors: Vec<PipelineError>,
    /// Warnings attached to this stage.
    pub warnings: Vec<PipelineWarning>,
}

impl From<StageDefinition> for PipelineStage {
    fn from(def: StageDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name,
            description: def.description,
            status: StageStatus::Pending,
            progress: 0.0,
            start_time: None,
            end_time: None,
            duration_ms: None,
            estimated_duration_ms: def.estimated_duration_ms,
            dependencies: def.dependencies,
            outputs: Vec::new(),
            metrics: StageMetrics::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl PipelineStage {
    /// Marks the stage running and stamps its start time.
    pub fn mark_running(&mut self) {
        self.status = StageStatus::Running;
        self.start_time = Some(now_utc());
        self.end_time = None;
        self.duration_ms = None;
    }

    /// Marks the stage completed, forcing progress to 100.
    pub fn mark_completed(&mut self, outputs: Option<Vec<String>>) {
        self.status = StageStatus::Completed;
        self.progress = 100.0;
        if let Some(outputs) = outputs {
            self.outputs = outputs;
        }
        self.stamp_end();
    }

    /// Marks the stage failed.
    pub fn mark_failed(&mut self) {
        self.status = StageStatus::Failed;
        self.stamp_end();
    }

    /// Marks the stage skipped.
    pub fn mark_skipped(&mut self) {
        self.status = StageStatus::Skipped;
        self.stamp_end();
    }

    /// Returns a failed stage to `pending`, keeping its error history.
    pub fn reset(&mut self) {
        self.status = StageStatus::Pending;
        self.progress = 0.0;
        self.start_time = None;
        self.end_time = None;
        self.duration_ms = None;
    }

    fn stamp_end(&mut self) {
        let end = now_utc();
        let start = *self.start_time.get_or_insert(end);
        self.end_time = Some(end);
        self.duration_ms = Some(u64::try_from(duration_between(start, end).as_millis()).unwrap_or(u64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> PipelineStage {
        StageDefinition::new("encode", "Encode")
            .with_dependency("decode")
            .with_estimated_duration_ms(5_000)
            .into()
    }

    #[test]
    fn test_stage_from_definition() {
        let stage = stage();
        assert_eq!(stage.status, StageStatus::Pending);
        assert_eq!(stage.dependencies, vec!["decode".to_string()]);
        assert_eq!(stage.estimated_duration_ms, 5_000);
        assert!(stage.start_time.is_none());
    }

    #[test]
    fn test_completion_forces_progress() {
        let mut stage = stage();
        stage.mark_running();
        stage.progress = 42.0;
        stage.mark_completed(Some(vec!["out.mp4".to_string()]));

        assert_eq!(stage.status, StageStatus::Completed);
        assert!((stage.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(stage.outputs, vec!["out.mp4".to_string()]);
        assert!(stage.end_time.is_some());
        assert!(stage.duration_ms.is_some());
    }

    #[test]
    fn test_completion_without_start_has_zero_duration() {
        let mut stage = stage();
        stage.mark_completed(None);
        assert_eq!(stage.duration_ms, Some(0));
        assert_eq!(stage.start_time, stage.end_time);
    }

    #[test]
    fn test_reset_keeps_errors() {
        let mut stage = stage();
        stage.mark_running();
        stage.errors.push(PipelineError::new("encode", "E", "boom"));
        stage.mark_failed();
        stage.reset();

        assert_eq!(stage.status, StageStatus::Pending);
        assert!(stage.start_time.is_none());
        assert_eq!(stage.errors.len(), 1);
    }
}
