//! Glue between the monitor and the error handler.
//!
//! A [`Supervisor`] takes a stage failure, lets the [`ErrorHandler`] try to
//! recover, and applies the outcome to the [`PipelineMonitor`].

use crate::core::{Impact, LogLevel, PipelineError, PipelineWarning, WarningType};
use crate::monitor::PipelineMonitor;
use crate::recovery::{ErrorHandler, ErrorHandlingResult, FinalAction};
use std::sync::Arc;
use tracing::{info, instrument};

/// Routes stage failures through recovery and records the result.
#[derive(Debug, Clone)]
pub struct Supervisor {
    monitor: PipelineMonitor,
    handler: Arc<ErrorHandler>,
}

impl Supervisor {
    /// Creates a supervisor over a monitor and a handler.
    #[must_use]
    pub fn new(monitor: PipelineMonitor, handler: Arc<ErrorHandler>) -> Self {
        Self { monitor, handler }
    }

    /// The supervised monitor.
    #[must_use]
    pub fn monitor(&self) -> &PipelineMonitor {
        &self.monitor
    }

    /// The error handler.
    #[must_use]
    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }

    /// Handles a failure reported by a running stage.
    ///
    /// | outcome | effect on the monitor |
    /// |---|---|
    /// | recovered | info log, stage keeps running |
    /// | `skip` | error recorded, stage skipped, dependents may start |
    /// | `abort` | stage failed with a non-recoverable copy of the error |
    /// | `alternative` / `manual` | stage failed, warning with the follow-up |
    #[instrument(skip(self, error, stage_data), fields(code = %error.code))]
    pub async fn report_failure(
        &self,
        pipeline_id: &str,
        stage_id: &str,
        error: PipelineError,
        stage_data: Option<serde_json::Value>,
    ) -> ErrorHandlingResult {
        let pipeline_data = self
            .monitor
            .get_pipeline_status(pipeline_id)
            .and_then(|s| serde_json::to_value(&s.metrics).ok());
        let result = self
            .handler
            .handle_error(&error, pipeline_id, stage_id, stage_data, pipeline_data)
            .await;

        match result.final_action {
            FinalAction::Continue => {
                let message = format!(
                    "Recovered from {} after {} attempt(s)",
                    error.code, result.attempts_made
                );
                self.monitor.add_log(pipeline_id, LogLevel::Info, Some(stage_id), &message);
            }
            FinalAction::Skip => {
                let reason = format!("recovery fallback after {}", error.code);
                self.monitor.fail_stage(pipeline_id, stage_id, error);
                self.monitor.skip_stage(pipeline_id, stage_id, &reason);
            }
            FinalAction::Abort => {
                self.monitor
                    .fail_stage(pipeline_id, stage_id, error.with_recoverable(false));
            }
            FinalAction::Alternative | FinalAction::Manual => {
                let follow_up = if result.final_action == FinalAction::Alternative {
                    format!("Stage '{stage_id}' needs an alternative implementation")
                } else {
                    format!("Stage '{stage_id}' needs manual intervention")
                };
                self.monitor.fail_stage(pipeline_id, stage_id, error);
                let mut warning = PipelineWarning::new(stage_id, WarningType::Quality, follow_up)
                    .with_impact(Impact::High);
                if let Some(first) = result.recommendations.first() {
                    warning = warning.with_suggestion(first.clone());
                }
                self.monitor.add_warning(pipeline_id, warning);
            }
        }

        info!(
            pipeline_id,
            stage_id,
            final_action = %result.final_action,
            "Failure report applied"
        );
        result
    }
}
