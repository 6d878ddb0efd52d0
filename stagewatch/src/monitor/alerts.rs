//! Threshold checks run on each sampler tick.
//!
//! Alerts are signals only. They never change stage or pipeline state, and
//! a breach that persists fires again on every tick.

use super::config::AlertThresholds;
use crate::core::{PipelineEvent, PipelineEventType, PipelineStatus};
use serde::{Deserialize, Serialize};

/// One threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// `ResourceAlert` or `QualityAlert`.
    pub kind: PipelineEventType,
    /// Name of the breached metric.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Configured threshold.
    pub threshold: f64,
    /// Human-readable description.
    pub message: String,
}

impl Alert {
    fn above(kind: PipelineEventType, metric: &str, value: f64, threshold: f64) -> Self {
        Self {
            kind,
            metric: metric.to_string(),
            value,
            threshold,
            message: format!("{metric} at {value:.1} exceeds threshold {threshold:.1}"),
        }
    }

    fn below(kind: PipelineEventType, metric: &str, value: f64, threshold: f64) -> Self {
        Self {
            kind,
            metric: metric.to_string(),
            value,
            threshold,
            message: format!("{metric} at {value:.2} is below threshold {threshold:.2}"),
        }
    }

    /// Converts the alert into a bus event for `pipeline_id`.
    #[must_use]
    pub fn into_event(self, pipeline_id: &str) -> PipelineEvent {
        PipelineEvent::new(self.kind, pipeline_id).with_data(serde_json::json!({
            "metric": self.metric,
            "value": self.value,
            "threshold": self.threshold,
            "message": self.message,
        }))
    }
}

/// Compares the latest snapshot of `status` against `thresholds`.
#[must_use]
pub fn check_thresholds(
    status: &PipelineStatus,
    thresholds: &AlertThresholds,
    check_resources: bool,
    check_quality: bool,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if check_resources {
        let usage = &status.resource_usage;
        let resource = PipelineEventType::ResourceAlert;
        if usage.memory_percent > thresholds.memory_usage {
            alerts.push(Alert::above(resource, "memory_usage", usage.memory_percent, thresholds.memory_usage));
        }
        if usage.cpu_percent > thresholds.cpu_usage {
            alerts.push(Alert::above(resource, "cpu_usage", usage.cpu_percent, thresholds.cpu_usage));
        }
        if usage.disk_percent > thresholds.disk_usage {
            alerts.push(Alert::above(resource, "disk_usage", usage.disk_percent, thresholds.disk_usage));
        }
    }

    if check_quality {
        let quality = &status.quality_metrics;
        let kind = PipelineEventType::QualityAlert;
        if quality.error_rate > thresholds.error_rate {
            alerts.push(Alert::above(kind, "error_rate", quality.error_rate, thresholds.error_rate));
        }
        // Speed is meaningless before anything has finished.
        if status.metrics.stages_completed > 0 && quality.processing_speed < thresholds.processing_speed {
            alerts.push(Alert::below(
                kind,
                "processing_speed",
                quality.processing_speed,
                thresholds.processing_speed,
            ));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineError, ResourceUsage, StageDefinition};

    fn status() -> PipelineStatus {
        PipelineStatus::new(
            "p1",
            "P",
            vec![StageDefinition::new("a", "A").into(), StageDefinition::new("b", "B").into()],
        )
    }

    #[test]
    fn test_no_alerts_under_thresholds() {
        let alerts = check_thresholds(&status(), &AlertThresholds::default(), true, true);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_resource_alerts() {
        let mut s = status();
        s.resource_usage = ResourceUsage {
            memory_percent: 95.0,
            cpu_percent: 99.0,
            disk_percent: 10.0,
            ..ResourceUsage::default()
        };
        let alerts = check_thresholds(&s, &AlertThresholds::default(), true, true);
        let metrics: Vec<_> = alerts.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(metrics, vec!["memory_usage", "cpu_usage"]);
        assert!(alerts.iter().all(|a| a.kind == PipelineEventType::ResourceAlert));
    }

    #[test]
    fn test_resource_checks_can_be_disabled() {
        let mut s = status();
        s.resource_usage.cpu_percent = 100.0;
        assert!(check_thresholds(&s, &AlertThresholds::default(), false, true).is_empty());
    }

    #[test]
    fn test_error_rate_quality_alert() {
        let mut s = status();
        s.stages[0].errors.push(PipelineError::new("a", "E", "boom"));
        s.refresh_metrics();
        let alerts = check_thresholds(&s, &AlertThresholds::default(), false, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, PipelineEventType::QualityAlert);
        assert_eq!(alerts[0].metric, "error_rate");
    }

    #[test]
    fn test_alert_event_payload() {
        let alert = Alert::above(PipelineEventType::ResourceAlert, "cpu_usage", 97.0, 90.0);
        let event = alert.into_event("p1");
        assert_eq!(event.event_type, PipelineEventType::ResourceAlert);
        assert_eq!(event.data["metric"], "cpu_usage");
        assert_eq!(event.data["threshold"], 90.0);
    }
}
