//! Stage, pipeline, resource and quality metrics.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// Resource and throughput counters for a single stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Current memory usage in MB.
    pub memory_usage_mb: f64,
    /// Current CPU usage in percent.
    pub cpu_usage: f64,
    /// Disk usage in MB.
    pub disk_usage_mb: f64,
    /// Network usage in KB/s.
    pub network_usage_kbps: f64,
    /// Items per second.
    pub throughput: f64,
    /// Failed items in percent.
    pub error_rate: f64,
    /// Successful items in percent.
    pub success_rate: f64,
    /// Average time per item in milliseconds.
    pub avg_processing_time_ms: f64,
    /// Highest memory usage seen, in MB.
    pub peak_memory_mb: f64,
    /// Items processed so far.
    pub items_processed: u64,
}

/// A partial metrics report; only `Some` fields overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageMetricsUpdate {
    /// Current memory usage in MB.
    pub memory_usage_mb: Option<f64>,
    /// Current CPU usage in percent.
    pub cpu_usage: Option<f64>,
    /// Disk usage in MB.
    pub disk_usage_mb: Option<f64>,
    /// Network usage in KB/s.
    pub network_usage_kbps: Option<f64>,
    /// Items per second.
    pub throughput: Option<f64>,
    /// Failed items in percent.
    pub error_rate: Option<f64>,
    /// Successful items in percent.
    pub success_rate: Option<f64>,
    /// Average time per item in milliseconds.
    pub avg_processing_time_ms: Option<f64>,
    /// Highest memory usage seen, in MB.
    pub peak_memory_mb: Option<f64>,
    /// Items processed so far.
    pub items_processed: Option<u64>,
}

impl StageMetricsUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets memory usage.
    #[must_use]
    pub fn with_memory_mb(mut self, value: f64) -> Self {
        self.memory_usage_mb = Some(value);
        self
    }

    /// Sets CPU usage.
    #[must_use]
    pub fn with_cpu(mut self, value: f64) -> Self {
        self.cpu_usage = Some(value);
        self
    }

    /// Sets throughput.
    #[must_use]
    pub fn with_throughput(mut self, value: f64) -> Self {
        self.throughput = Some(value);
        self
    }

    /// Sets items processed.
    #[must_use]
    pub fn with_items_processed(mut self, value: u64) -> Self {
        self.items_processed = Some(value);
        self
    }
}

impl StageMetrics {
    /// Merges a partial update into these metrics.
    ///
    /// Peak memory follows the maximum of the reported peak and the current
    /// memory usage.
    pub fn merge(&mut self, update: &StageMetricsUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = update.$field { self.$field = v; })*
            };
        }
        take!(
            memory_usage_mb,
            cpu_usage,
            disk_usage_mb,
            network_usage_kbps,
            throughput,
            error_rate,
            success_rate,
            avg_processing_time_ms,
            peak_memory_mb,
            items_processed
        );
        self.peak_memory_mb = self.peak_memory_mb.max(self.memory_usage_mb);
    }
}

/// Aggregate counters for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Wall time since the pipeline was created, in milliseconds.
    pub total_duration_ms: u64,
    /// Naive linear ETA in milliseconds.
    pub estimated_time_remaining_ms: u64,
    /// Number of declared stages.
    pub stages_total: usize,
    /// Stages in `completed`.
    pub stages_completed: usize,
    /// Stages in `failed`.
    pub stages_failed: usize,
    /// Stages in `skipped`.
    pub stages_skipped: usize,
    /// Errors recorded on the pipeline.
    pub error_count: usize,
    /// Warnings recorded on the pipeline.
    pub warning_count: usize,
    /// Completed stages per minute.
    pub throughput: f64,
    /// Completed stages as a percentage of finished stages.
    pub efficiency: f64,
}

/// A snapshot of host resource consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Memory in use, MB.
    pub memory_used_mb: f64,
    /// Total memory, MB.
    pub memory_total_mb: f64,
    /// Memory in use, percent.
    pub memory_percent: f64,
    /// CPU usage, percent.
    pub cpu_percent: f64,
    /// Disk in use, GB.
    pub disk_used_gb: f64,
    /// Total disk, GB.
    pub disk_total_gb: f64,
    /// Disk in use, percent.
    pub disk_percent: f64,
    /// Inbound network, KB/s.
    pub network_in_kbps: f64,
    /// Outbound network, KB/s.
    pub network_out_kbps: f64,
    /// When the snapshot was taken.
    pub sampled_at: Timestamp,
}

impl Default for ResourceUsage {
    fn default() -> Self {
        Self {
            memory_used_mb: 0.0,
            memory_total_mb: 0.0,
            memory_percent: 0.0,
            cpu_percent: 0.0,
            disk_used_gb: 0.0,
            disk_total_gb: 0.0,
            disk_percent: 0.0,
            network_in_kbps: 0.0,
            network_out_kbps: 0.0,
            sampled_at: now_utc(),
        }
    }
}

/// Derived quality indicators for a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Percentage of stages that recorded at least one error.
    pub error_rate: f64,
    /// Completed stages per minute.
    pub processing_speed: f64,
    /// Completed stages as a percentage of finished stages.
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_metrics_start_at_zero() {
        let metrics = StageMetrics::default();
        assert_eq!(metrics.items_processed, 0);
        assert!(metrics.cpu_usage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_merge_only_overwrites_provided_fields() {
        let mut metrics = StageMetrics {
            cpu_usage: 40.0,
            throughput: 12.0,
            ..StageMetrics::default()
        };

        metrics.merge(&StageMetricsUpdate::new().with_cpu(75.0).with_items_processed(10));

        assert!((metrics.cpu_usage - 75.0).abs() < f64::EPSILON);
        assert!((metrics.throughput - 12.0).abs() < f64::EPSILON);
        assert_eq!(metrics.items_processed, 10);
    }

    #[test]
    fn test_peak_memory_tracks_maximum() {
        let mut metrics = StageMetrics::default();
        metrics.merge(&StageMetricsUpdate::new().with_memory_mb(512.0));
        metrics.merge(&StageMetricsUpdate::new().with_memory_mb(256.0));

        assert!((metrics.memory_usage_mb - 256.0).abs() < f64::EPSILON);
        assert!((metrics.peak_memory_mb - 512.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_deserializes_partially() {
        let update: StageMetricsUpdate = serde_json::from_str(r#"{"cpu_usage": 12.5}"#).unwrap();
        assert_eq!(update.cpu_usage, Some(12.5));
        assert!(update.memory_usage_mb.is_none());
    }
}
