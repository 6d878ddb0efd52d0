//! The pipeline aggregate: stages, aggregates, errors and the log buffer.

use super::error::{PipelineError, PipelineWarning};
use super::metrics::{PipelineMetrics, QualityMetrics, ResourceUsage};
use super::stage::PipelineStage;
use super::status::{LogLevel, PipelineState, StageStatus};
use crate::utils::{duration_between, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// One entry in a pipeline's log ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineLog {
    /// Severity level.
    pub level: LogLevel,
    /// Stage the entry refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Message text.
    pub message: String,
    /// When the entry was written.
    pub timestamp: Timestamp,
    /// Structured context.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl PipelineLog {
    /// Creates a log entry without context.
    #[must_use]
    pub fn new(level: LogLevel, stage: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level,
            stage: stage.map(str::to_string),
            message: message.into(),
            timestamp: now_utc(),
            context: HashMap::new(),
        }
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Full state of a monitored pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Pipeline id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: PipelineState,
    /// Mean of stage progresses, 0..=100.
    pub overall_progress: f64,
    /// The most recently started stage.
    pub current_stage: Option<String>,
    /// Stages in declaration order.
    pub stages: Vec<PipelineStage>,
    /// When the pipeline was created.
    pub start_time: Timestamp,
    /// When the pipeline became terminal.
    pub end_time: Option<Timestamp>,
    /// Aggregate counters.
    pub metrics: PipelineMetrics,
    /// Latest resource snapshot.
    pub resource_usage: ResourceUsage,
    /// Latest quality indicators.
    pub quality_metrics: QualityMetrics,
    /// Every error recorded on any stage.
    pub errors: Vec<PipelineError>,
    /// Every warning recorded on any stage.
    pub warnings: Vec<PipelineWarning>,
    /// Bounded log; oldest entries are dropped first.
    pub logs: VecDeque<PipelineLog>,
}

impl PipelineStatus {
    /// Creates a pipeline in `initializing` with the given stages.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, stages: Vec<PipelineStage>) -> Self {
        let mut status = Self {
            id: id.into(),
            name: name.into(),
            status: PipelineState::Initializing,
            overall_progress: 0.0,
            current_stage: None,
            stages,
            start_time: now_utc(),
            end_time: None,
            metrics: PipelineMetrics::default(),
            resource_usage: ResourceUsage::default(),
            quality_metrics: QualityMetrics::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
            logs: VecDeque::new(),
        };
        status.refresh_metrics();
        status
    }

    /// Returns a stage by id.
    #[must_use]
    pub fn stage(&self, stage_id: &str) -> Option<&PipelineStage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    /// Returns a mutable stage by id.
    pub fn stage_mut(&mut self, stage_id: &str) -> Option<&mut PipelineStage> {
        self.stages.iter_mut().find(|s| s.id == stage_id)
    }

    /// Returns true if every dependency of `stage_id` is completed or skipped.
    ///
    /// Unknown stages never have their dependencies satisfied.
    #[must_use]
    pub fn dependencies_satisfied(&self, stage_id: &str) -> bool {
        self.stage(stage_id).is_some_and(|stage| {
            stage.dependencies.iter().all(|dep| {
                self.stage(dep)
                    .is_some_and(|d| d.status.satisfies_dependency())
            })
        })
    }

    /// First pending stage, in declaration order, whose dependencies are met.
    #[must_use]
    pub fn next_eligible_stage(&self) -> Option<String> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Pending && self.dependencies_satisfied(&s.id))
            .map(|s| s.id.clone())
    }

    /// Returns true if every stage is completed or skipped.
    #[must_use]
    pub fn all_stages_finished(&self) -> bool {
        self.stages.iter().all(|s| s.status.satisfies_dependency())
    }

    /// Appends a log entry, evicting the oldest when `capacity` is reached.
    pub fn push_log(&mut self, entry: PipelineLog, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.logs.len() >= capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// Marks the pipeline terminal and stamps its end time.
    pub fn finish(&mut self, state: PipelineState) {
        self.status = state;
        self.end_time = Some(now_utc());
        if state == PipelineState::Completed {
            self.overall_progress = 100.0;
        }
        self.refresh_metrics();
    }

    /// Recomputes overall progress as the unweighted mean of stage progress.
    pub fn refresh_progress(&mut self) {
        if self.status == PipelineState::Completed {
            self.overall_progress = 100.0;
            return;
        }
        if self.stages.is_empty() {
            self.overall_progress = 0.0;
            return;
        }
        let total: f64 = self.stages.iter().map(|s| s.progress).sum();
        self.overall_progress = total / self.stages.len() as f64;
    }

    /// Recomputes `PipelineMetrics` and `QualityMetrics` from the stages.
    pub fn refresh_metrics(&mut self) {
        let now = self.end_time.unwrap_or_else(now_utc);
        let elapsed = duration_between(self.start_time, now);
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let count = |status: StageStatus| self.stages.iter().filter(|s| s.status == status).count();
        let completed = count(StageStatus::Completed);
        let failed = count(StageStatus::Failed);
        let skipped = count(StageStatus::Skipped);
        let remaining: Vec<&PipelineStage> = self
            .stages
            .iter()
            .filter(|s| !s.status.satisfies_dependency())
            .collect();

        let eta_ms = if remaining.is_empty() {
            0
        } else if completed == 0 {
            remaining.iter().map(|s| s.estimated_duration_ms).sum()
        } else {
            elapsed_ms / completed as u64 * remaining.len() as u64
        };

        let minutes = elapsed.as_secs_f64() / 60.0;
        let throughput = if minutes > 0.0 { completed as f64 / minutes } else { 0.0 };
        let finished = completed + failed;
        let efficiency = if finished == 0 {
            100.0
        } else {
            completed as f64 / finished as f64 * 100.0
        };

        self.metrics = PipelineMetrics {
            total_duration_ms: elapsed_ms,
            estimated_time_remaining_ms: eta_ms,
            stages_total: self.stages.len(),
            stages_completed: completed,
            stages_failed: failed,
            stages_skipped: skipped,
            error_count: self.errors.len(),
            warning_count: self.warnings.len(),
            throughput,
            efficiency,
        };

        let stages_with_errors = self.stages.iter().filter(|s| !s.errors.is_empty()).count();
        let error_rate = if self.stages.is_empty() {
            0.0
        } else {
            stages_with_errors as f64 / self.stages.len() as f64 * 100.0
        };
        self.quality_metrics = QualityMetrics {
            error_rate,
            processing_speed: throughput,
            success_rate: efficiency,
        };
    }
}
