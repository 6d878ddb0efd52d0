//! Monitor configuration.

use crate::core::LogLevel;
use crate::errors::StagewatchError;
use crate::notify::NotificationSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds that trigger resource and quality alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Memory usage percent above which a resource alert fires.
    #[serde(default = "default_memory_threshold")]
    pub memory_usage: f64,
    /// CPU usage percent above which a resource alert fires.
    #[serde(default = "default_cpu_threshold")]
    pub cpu_usage: f64,
    /// Disk usage percent above which a resource alert fires.
    #[serde(default = "default_disk_threshold")]
    pub disk_usage: f64,
    /// Error rate percent above which a quality alert fires.
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate: f64,
    /// Stages per minute below which a quality alert fires.
    #[serde(default = "default_processing_speed_threshold")]
    pub processing_speed: f64,
}

fn default_memory_threshold() -> f64 {
    85.0
}

fn default_cpu_threshold() -> f64 {
    90.0
}

fn default_disk_threshold() -> f64 {
    90.0
}

fn default_error_rate_threshold() -> f64 {
    10.0
}

fn default_processing_speed_threshold() -> f64 {
    0.1
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            memory_usage: default_memory_threshold(),
            cpu_usage: default_cpu_threshold(),
            disk_usage: default_disk_threshold(),
            error_rate: default_error_rate_threshold(),
            processing_speed: default_processing_speed_threshold(),
        }
    }
}

/// Construction-time configuration of a [`PipelineMonitor`](super::PipelineMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampler period in milliseconds.
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,
    /// Minimum level recorded in pipeline logs.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Recompute aggregate metrics on each tick.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    /// Sample resource usage on each tick.
    #[serde(default = "default_true")]
    pub enable_resource_monitoring: bool,
    /// Recompute quality metrics and check quality thresholds on each tick.
    #[serde(default = "default_true")]
    pub enable_quality_monitoring: bool,
    /// Capacity of each pipeline's log ring buffer.
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
    /// Alert thresholds.
    #[serde(default)]
    pub alert_thresholds: AlertThresholds,
    /// Notification channels.
    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_update_interval() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_max_log_entries() -> usize {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval(),
            log_level: LogLevel::default(),
            enable_metrics: true,
            enable_resource_monitoring: true,
            enable_quality_monitoring: true,
            max_log_entries: default_max_log_entries(),
            alert_thresholds: AlertThresholds::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a (possibly partial) JSON document and validates it.
    pub fn from_json(json: &str) -> Result<Self, StagewatchError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), StagewatchError> {
        if self.update_interval_ms == 0 {
            return Err(StagewatchError::Config(
                "update_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_log_entries == 0 {
            return Err(StagewatchError::Config(
                "max_log_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the sampler period.
    #[must_use]
    pub fn with_update_interval_ms(mut self, ms: u64) -> Self {
        self.update_interval_ms = ms;
        self
    }

    /// Sets the minimum log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the log buffer capacity.
    #[must_use]
    pub fn with_max_log_entries(mut self, entries: usize) -> Self {
        self.max_log_entries = entries;
        self
    }

    /// Sets the alert thresholds.
    #[must_use]
    pub fn with_alert_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }

    /// Sets the notification channels.
    #[must_use]
    pub fn with_notifications(mut self, notifications: NotificationSettings) -> Self {
        self.notifications = notifications;
        self
    }

    /// Enables or disables resource sampling.
    #[must_use]
    pub fn with_resource_monitoring(mut self, enabled: bool) -> Self {
        self.enable_resource_monitoring = enabled;
        self
    }

    /// Enables or disables quality monitoring.
    #[must_use]
    pub fn with_quality_monitoring(mut self, enabled: bool) -> Self {
        self.enable_quality_monitoring = enabled;
        self
    }

    /// Returns the sampler period as a `Duration`.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.update_interval(), Duration::from_secs(1));
        assert_eq!(config.max_log_entries, 1000);
        assert!(config.enable_resource_monitoring);
        assert!(!config.notifications.any_enabled());
    }

    #[test]
    fn test_from_partial_json() {
        let config = MonitorConfig::from_json(
            r#"{"update_interval_ms": 250, "alert_thresholds": {"cpu_usage": 50}, "log_level": "warn"}"#,
        )
        .unwrap();
        assert_eq!(config.update_interval_ms, 250);
        assert!((config.alert_thresholds.cpu_usage - 50.0).abs() < f64::EPSILON);
        assert!((config.alert_thresholds.memory_usage - 85.0).abs() < f64::EPSILON);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = MonitorConfig::from_json(r#"{"update_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, StagewatchError::Config(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = MonitorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, StagewatchError::Serialization(_)));
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::new()
            .with_update_interval_ms(10)
            .with_max_log_entries(5)
            .with_resource_monitoring(false);
        assert_eq!(config.update_interval_ms, 10);
        assert_eq!(config.max_log_entries, 5);
        assert!(!config.enable_resource_monitoring);
    }
}
