//! Ready-made pipelines and errors for tests.

use std::sync::Arc;

use crate::core::{PipelineError, Severity, StageDefinition};
use crate::events::CollectingListener;
use crate::monitor::{MonitorConfig, PipelineMonitor};

/// `extract -> transform`, the smallest pipeline with a dependency.
#[must_use]
pub fn two_stage_pipeline() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("extract", "Extract").with_estimated_duration_ms(1_000),
        StageDefinition::new("transform", "Transform")
            .with_dependency("extract")
            .with_estimated_duration_ms(1_000),
    ]
}

/// `stage-0 -> stage-1 -> ... -> stage-{n-1}`.
#[must_use]
pub fn linear_pipeline(n: usize) -> Vec<StageDefinition> {
    (0..n)
        .map(|i| {
            let def = StageDefinition::new(format!("stage-{i}"), format!("Stage {i}"));
            if i == 0 {
                def
            } else {
                def.with_dependency(format!("stage-{}", i - 1))
            }
        })
        .collect()
}

/// A recoverable `NETWORK_ERROR` raised by `stage`.
#[must_use]
pub fn network_error(stage: &str) -> PipelineError {
    PipelineError::new(stage, "NETWORK_ERROR", "Connection reset by peer")
}

/// A critical error raised by `stage`.
#[must_use]
pub fn critical_error(stage: &str) -> PipelineError {
    PipelineError::new(stage, "INTERNAL_ERROR", "Invariant violated").with_severity(Severity::Critical)
}

/// A monitor holding one pipeline, plus a listener subscribed to every event.
///
/// Resource sampling is disabled so alerts come only from the tests.
#[derive(Debug)]
pub struct TestFixture {
    /// The monitor.
    pub monitor: PipelineMonitor,
    /// Receives every event the monitor emits.
    pub events: Arc<CollectingListener>,
    /// Id of the registered pipeline.
    pub pipeline_id: String,
}

impl TestFixture {
    /// Registers `stages` as pipeline `"test-pipeline"`.
    ///
    /// # Panics
    ///
    /// Panics if the definitions are invalid.
    #[must_use]
    pub fn new(stages: Vec<StageDefinition>) -> Self {
        Self::with_config(MonitorConfig::default().with_resource_monitoring(false), stages)
    }

    /// Same as [`TestFixture::new`] with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if the definitions are invalid.
    #[must_use]
    pub fn with_config(config: MonitorConfig, stages: Vec<StageDefinition>) -> Self {
        let monitor = PipelineMonitor::new(config);
        let events = Arc::new(CollectingListener::new());
        monitor.add_global_listener(events.clone());
        let pipeline_id = "test-pipeline".to_string();
        if let Err(e) = monitor.create_pipeline(&pipeline_id, "Test pipeline", stages) {
            panic!("fixture pipeline rejected: {e}");
        }
        Self {
            monitor,
            events,
            pipeline_id,
        }
    }

    /// Starts `stage`.
    pub fn start(&self, stage: &str) -> bool {
        self.monitor.start_stage(&self.pipeline_id, stage)
    }

    /// Completes `stage`.
    pub fn complete(&self, stage: &str) -> bool {
        self.monitor.complete_stage(&self.pipeline_id, stage, None)
    }

    /// Reports progress for `stage`.
    pub fn progress(&self, stage: &str, progress: f64) -> bool {
        self.monitor
            .update_stage_progress(&self.pipeline_id, stage, progress, None)
    }

    /// Current snapshot of the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline has been destroyed.
    #[must_use]
    pub fn status(&self) -> crate::core::PipelineStatus {
        match self.monitor.get_pipeline_status(&self.pipeline_id) {
            Some(status) => status,
            None => panic!("pipeline '{}' is gone", self.pipeline_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_pipeline_chains_dependencies() {
        let defs = linear_pipeline(3);
        assert!(defs[0].dependencies.is_empty());
        assert_eq!(defs[2].dependencies, vec!["stage-1".to_string()]);
    }

    #[test]
    fn test_fixture_records_creation() {
        let fixture = TestFixture::new(two_stage_pipeline());
        assert_eq!(fixture.status().stages.len(), 2);
        assert!(fixture.events.is_empty());
    }
}
