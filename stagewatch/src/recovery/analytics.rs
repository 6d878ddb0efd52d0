//! Running counters over handled errors and recovery outcomes.

use crate::core::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Aggregate error and recovery statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalytics {
    /// Errors handled.
    pub total_errors: u64,
    /// Distinct error fingerprints seen.
    pub unique_errors: u64,
    /// Errors per code.
    pub errors_by_code: HashMap<String, u64>,
    /// Errors per stage.
    pub errors_by_stage: HashMap<String, u64>,
    /// Errors per severity.
    pub errors_by_severity: HashMap<String, u64>,
    /// Handling calls that tried at least one strategy.
    pub recovery_attempts: u64,
    /// Handling calls that recovered.
    pub successful_recoveries: u64,
    /// Handling calls that tried and failed to recover.
    pub failed_recoveries: u64,
    /// `successful / attempts * 100`, or 0 before any attempt.
    pub recovery_success_rate: f64,
    /// Mean handling time of attempted recoveries.
    pub average_recovery_time_ms: f64,
    #[serde(skip)]
    fingerprints: HashSet<String>,
    #[serde(skip)]
    total_recovery_time_ms: u64,
}

impl ErrorAnalytics {
    /// Counts one handled error.
    pub fn record_error(&mut self, error: &PipelineError, fingerprint: &str) {
        self.total_errors += 1;
        *self.errors_by_code.entry(error.code.clone()).or_default() += 1;
        *self.errors_by_stage.entry(error.stage.clone()).or_default() += 1;
        *self
            .errors_by_severity
            .entry(error.severity.to_string())
            .or_default() += 1;
        if self.fingerprints.insert(fingerprint.to_string()) {
            self.unique_errors += 1;
        }
    }

    /// Counts one recovery outcome.
    pub fn record_recovery(&mut self, success: bool, duration_ms: u64) {
        self.recovery_attempts += 1;
        if success {
            self.successful_recoveries += 1;
        } else {
            self.failed_recoveries += 1;
        }
        self.total_recovery_time_ms = self.total_recovery_time_ms.saturating_add(duration_ms);
        self.recovery_success_rate =
            self.successful_recoveries as f64 / self.recovery_attempts as f64 * 100.0;
        self.average_recovery_time_ms =
            self.total_recovery_time_ms as f64 / self.recovery_attempts as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    #[test]
    fn test_record_error_counts() {
        let mut analytics = ErrorAnalytics::default();
        let a = PipelineError::new("fetch", "NETWORK_ERROR", "x");
        let b = PipelineError::new("parse", "PARSE_ERROR", "y").with_severity(Severity::High);
        analytics.record_error(&a, "fa");
        analytics.record_error(&a, "fa");
        analytics.record_error(&b, "fb");

        assert_eq!(analytics.total_errors, 3);
        assert_eq!(analytics.unique_errors, 2);
        assert_eq!(analytics.errors_by_code["NETWORK_ERROR"], 2);
        assert_eq!(analytics.errors_by_stage["parse"], 1);
        assert_eq!(analytics.errors_by_severity["high"], 1);
        assert_eq!(analytics.errors_by_severity["medium"], 2);
    }

    #[test]
    fn test_recovery_rates() {
        let mut analytics = ErrorAnalytics::default();
        analytics.record_recovery(true, 100);
        analytics.record_recovery(false, 300);
        assert_eq!(analytics.recovery_success_rate, 50.0);
        assert_eq!(analytics.average_recovery_time_ms, 200.0);
    }

    #[test]
    fn test_serialization_hides_internal_sets() {
        let mut analytics = ErrorAnalytics::default();
        analytics.record_error(&PipelineError::new("s", "E", "m"), "f");
        let json = serde_json::to_value(&analytics).unwrap();
        assert!(json.get("fingerprints").is_none());
        assert_eq!(json["unique_errors"], 1);
    }
}
