//! Inputs to a recovery attempt: the error context, system state and user
//! preferences.

use crate::core::PipelineError;
use crate::errors::StagewatchError;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reachability of the network as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    /// Fully reachable.
    #[default]
    Online,
    /// Reachable with loss or high latency.
    Degraded,
    /// Unreachable.
    Offline,
}

/// Overall host health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemHealth {
    /// No known problems.
    #[default]
    Healthy,
    /// Running with reduced headroom.
    Degraded,
    /// Close to failure.
    Critical,
}

/// Host snapshot taken at the start of each handling call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// Free memory in MB.
    pub available_memory_mb: f64,
    /// Free disk space in GB.
    pub available_disk_gb: f64,
    /// CPU usage in percent.
    pub cpu_usage: f64,
    /// Network reachability.
    pub network_status: NetworkStatus,
    /// Overall health.
    pub health: SystemHealth,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            available_memory_mb: 8_192.0,
            available_disk_gb: 100.0,
            cpu_usage: 25.0,
            network_status: NetworkStatus::Online,
            health: SystemHealth::Healthy,
        }
    }
}

/// Source of [`SystemState`] snapshots.
#[cfg_attr(test, mockall::automock)]
pub trait SystemProbe: Send + Sync {
    /// Takes a snapshot.
    fn snapshot(&self) -> SystemState;
}

/// A probe that always reports the same state.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    state: SystemState,
}

impl StaticProbe {
    /// Creates a probe reporting `state`.
    #[must_use]
    pub fn new(state: SystemState) -> Self {
        Self { state }
    }
}

impl SystemProbe for StaticProbe {
    fn snapshot(&self) -> SystemState {
        self.state.clone()
    }
}

/// Operator preferences that bound and steer recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Attempt budget applied on top of every strategy's own budget.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Upper bound on any single action's run time, in milliseconds.
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
    /// Use the strategy's fallback when recovery fails; otherwise `manual`.
    #[serde(default = "default_true")]
    pub auto_fallback: bool,
    /// Notify when an error is handled.
    #[serde(default = "default_true")]
    pub notify_on_error: bool,
    /// Notify when recovery succeeds.
    #[serde(default)]
    pub notify_on_recovery: bool,
    /// Prefer output quality over throughput.
    #[serde(default = "default_true")]
    pub quality_over_speed: bool,
    /// Accept skipping stages whose output would be lost.
    #[serde(default)]
    pub allow_data_loss: bool,
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            max_retry_attempts: default_max_retry_attempts(),
            retry_timeout_ms: default_retry_timeout_ms(),
            auto_fallback: true,
            notify_on_error: true,
            notify_on_recovery: false,
            quality_over_speed: true,
            allow_data_loss: false,
        }
    }
}

impl UserPreferences {
    /// Parses a (possibly partial) JSON document.
    pub fn from_json(json: &str) -> Result<Self, StagewatchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Sets the per-action timeout.
    #[must_use]
    pub fn with_retry_timeout_ms(mut self, ms: u64) -> Self {
        self.retry_timeout_ms = ms;
        self
    }

    /// Enables or disables automatic fallback.
    #[must_use]
    pub fn with_auto_fallback(mut self, enabled: bool) -> Self {
        self.auto_fallback = enabled;
        self
    }

    /// Enables or disables notifications.
    #[must_use]
    pub fn with_notifications(mut self, on_error: bool, on_recovery: bool) -> Self {
        self.notify_on_error = on_error;
        self.notify_on_recovery = on_recovery;
        self
    }

    /// Allows or forbids data loss.
    #[must_use]
    pub fn with_allow_data_loss(mut self, allowed: bool) -> Self {
        self.allow_data_loss = allowed;
        self
    }

    /// Returns the per-action timeout as a `Duration`.
    #[must_use]
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }
}

/// One recorded `handle_error` call for a `(pipeline, stage)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAttempt {
    /// 1-based position in the stage's history.
    pub attempt_number: u32,
    /// When handling finished.
    pub timestamp: Timestamp,
    /// Last strategy tried, if any.
    pub strategy_id: Option<String>,
    /// Ids of every action executed.
    pub actions_executed: Vec<String>,
    /// Whether recovery succeeded.
    pub success: bool,
    /// The error as reported.
    pub error: PipelineError,
    /// Wall time spent handling, in milliseconds.
    pub duration_ms: u64,
    /// Stable hash of code, stage and message.
    pub fingerprint: String,
}

impl ErrorAttempt {
    /// Creates an attempt record stamped now.
    #[must_use]
    pub fn new(attempt_number: u32, error: PipelineError, fingerprint: impl Into<String>) -> Self {
        Self {
            attempt_number,
            timestamp: now_utc(),
            strategy_id: None,
            actions_executed: Vec::new(),
            success: false,
            error,
            duration_ms: 0,
            fingerprint: fingerprint.into(),
        }
    }
}

/// Everything a recovery action may inspect.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Working copy of the error for this attempt.
    pub error: PipelineError,
    /// Pipeline id.
    pub pipeline_id: String,
    /// Stage id.
    pub stage_id: String,
    /// 1-based attempt within the current strategy.
    pub attempt: u32,
    /// Earlier handling calls for this stage, oldest first.
    pub previous_attempts: Vec<ErrorAttempt>,
    /// Caller-supplied stage data.
    pub stage_data: Option<serde_json::Value>,
    /// Caller-supplied pipeline data.
    pub pipeline_data: Option<serde_json::Value>,
    /// Host snapshot.
    pub system_state: SystemState,
    /// Effective preferences.
    pub preferences: UserPreferences,
}

impl ErrorContext {
    /// Creates a context for the first attempt with a default system state.
    #[must_use]
    pub fn new(error: PipelineError, pipeline_id: impl Into<String>, stage_id: impl Into<String>) -> Self {
        Self {
            error,
            pipeline_id: pipeline_id.into(),
            stage_id: stage_id.into(),
            attempt: 1,
            previous_attempts: Vec::new(),
            stage_data: None,
            pipeline_data: None,
            system_state: SystemState::default(),
            preferences: UserPreferences::default(),
        }
    }

    /// Looks `key` up in the error context, then stage data, then pipeline data.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&serde_json::Value> {
        self.error
            .context
            .get(key)
            .or_else(|| self.stage_data.as_ref().and_then(|d| d.get(key)))
            .or_else(|| self.pipeline_data.as_ref().and_then(|d| d.get(key)))
    }

    /// Number of earlier failed handling calls for this stage.
    #[must_use]
    pub fn previous_failures(&self) -> usize {
        self.previous_attempts.iter().filter(|a| !a.success).count()
    }
}
