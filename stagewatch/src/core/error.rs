//! Operational error and warning records.

use super::status::{Impact, Severity, WarningType};
use crate::utils::{generate_id, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A failure reported by, or synthesized for, a pipeline stage.
///
/// Values are treated as immutable once handed to the monitor or the error
/// handler. The handler works on its own clone when it bumps `retry_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineError {
    /// Unique id.
    pub id: String,
    /// Stage id the error belongs to.
    pub stage: String,
    /// Machine-readable code, e.g. `NETWORK_ERROR`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// When the error was created.
    pub timestamp: Timestamp,
    /// How serious the error is.
    pub severity: Severity,
    /// Whether recovery may be attempted.
    pub recoverable: bool,
    /// Retries already spent on this error.
    pub retry_count: u32,
    /// Retry budget; `retry_count` never exceeds it.
    pub max_retries: u32,
    /// Free-form context supplied by the reporter.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl PipelineError {
    /// Default retry budget for new errors.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Creates a recoverable, medium-severity error.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id("err"),
            stage: stage.into(),
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: now_utc(),
            severity: Severity::Medium,
            recoverable: true,
            retry_count: 0,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            context: HashMap::new(),
        }
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets whether the error is recoverable.
    #[must_use]
    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Sets the details text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sets the retry budget, clamping the current count to it.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self.retry_count = self.retry_count.min(max_retries);
        self
    }

    /// Sets the retry count, clamped to `max_retries`.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.min(self.max_retries);
        self
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Returns true if this error should take the whole pipeline down.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Critical || !self.recoverable
    }

    /// Returns true if the retry budget is spent.
    #[must_use]
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({}): {}", self.severity, self.code, self.stage, self.message)
    }
}

/// A non-blocking degradation notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineWarning {
    /// Unique id.
    pub id: String,
    /// Stage id the warning belongs to.
    pub stage: String,
    /// Human-readable message.
    pub message: String,
    /// When the warning was created.
    pub timestamp: Timestamp,
    /// Warning category.
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    /// Expected impact.
    pub impact: Impact,
    /// Optional remediation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl PipelineWarning {
    /// Creates a low-impact warning.
    #[must_use]
    pub fn new(stage: impl Into<String>, warning_type: WarningType, message: impl Into<String>) -> Self {
        Self {
            id: generate_id("warn"),
            stage: stage.into(),
            message: message.into(),
            timestamp: now_utc(),
            warning_type,
            impact: Impact::Low,
            suggestion: None,
        }
    }

    /// Sets the impact.
    #[must_use]
    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    /// Sets the suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_defaults() {
        let err = PipelineError::new("render", "NETWORK_ERROR", "socket closed");
        assert!(err.id.starts_with("err_"));
        assert_eq!(err.severity, Severity::Medium);
        assert!(err.recoverable);
        assert_eq!(err.retry_count, 0);
        assert_eq!(err.max_retries, PipelineError::DEFAULT_MAX_RETRIES);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_retry_count_clamped() {
        let err = PipelineError::new("s", "E", "m")
            .with_max_retries(2)
            .with_retry_count(9);
        assert_eq!(err.retry_count, 2);
        assert!(err.retries_exhausted());

        let lowered = err.with_max_retries(1);
        assert_eq!(lowered.retry_count, 1);
    }

    #[test]
    fn test_fatal_conditions() {
        let critical = PipelineError::new("s", "E", "m").with_severity(Severity::Critical);
        assert!(critical.is_fatal());

        let unrecoverable = PipelineError::new("s", "E", "m").with_recoverable(false);
        assert!(unrecoverable.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::new("encode", "DISK_FULL", "no space left");
        assert_eq!(err.to_string(), "[medium] DISK_FULL (encode): no space left");
    }

    #[test]
    fn test_warning_serializes_type_field() {
        let warning = PipelineWarning::new("encode", WarningType::Performance, "slow")
            .with_impact(Impact::Medium)
            .with_suggestion("lower the bitrate");
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "performance");
        assert_eq!(json["impact"], "medium");
        assert_eq!(json["suggestion"], "lower the bitrate");
    }
}
