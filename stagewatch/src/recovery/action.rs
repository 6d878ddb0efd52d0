//! The recovery action trait and the built-in actions.

use super::context::{ErrorContext, NetworkStatus};
use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{info, warn};

/// Category of a recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Frees resources.
    Cleanup,
    /// Resets or re-validates state.
    Reset,
    /// Switches to another route.
    Alternative,
    /// Tells someone.
    Notification,
    /// Applies a fallback.
    Fallback,
}

/// What an action asks the handler to do next.
///
/// Only [`NextAction::Continue`] ends handling successfully; every other
/// value lets the retry loop carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// The error is resolved; resume the stage.
    Continue,
    /// Try again.
    Retry,
    /// Skip the stage.
    Skip,
    /// Stop the pipeline.
    Abort,
    /// Use the fallback.
    Fallback,
}

/// Outcome of one action execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    /// Whether the action did what it set out to do.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Requested follow-up.
    pub next_action: NextAction,
    /// Action-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl RecoveryResult {
    /// A successful result.
    #[must_use]
    pub fn success(message: impl Into<String>, next_action: NextAction) -> Self {
        Self {
            success: true,
            message: message.into(),
            next_action,
            data: Value::Null,
        }
    }

    /// An unsuccessful result.
    #[must_use]
    pub fn failure(message: impl Into<String>, next_action: NextAction) -> Self {
        Self {
            success: false,
            message: message.into(),
            next_action,
            data: Value::Null,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Returns true if the result resolves the error.
    #[must_use]
    pub fn resolves(&self) -> bool {
        self.next_action == NextAction::Continue
    }
}

/// A single remediation step run by a strategy.
///
/// Implementations may fail with any error; the handler bounds each call
/// with [`timeout`](RecoveryAction::timeout) and catches panics.
#[async_trait]
pub trait RecoveryAction: Send + Sync + Debug {
    /// Stable id.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Category.
    fn action_type(&self) -> ActionType;

    /// Lower runs first.
    fn priority(&self) -> u32 {
        100
    }

    /// Maximum run time.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Static parameters, for display.
    fn parameters(&self) -> Value {
        Value::Null
    }

    /// Runs the action.
    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult>;
}

/// Serializable description of a [`RecoveryAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Priority.
    pub priority: u32,
    /// Timeout in milliseconds.
    pub timeout_ms: u64,
    /// Parameters.
    #[serde(default)]
    pub parameters: Value,
}

impl ActionDescriptor {
    /// Describes `action`.
    #[must_use]
    pub fn of(action: &dyn RecoveryAction) -> Self {
        Self {
            id: action.id().to_string(),
            name: action.name().to_string(),
            action_type: action.action_type(),
            priority: action.priority(),
            timeout_ms: u64::try_from(action.timeout().as_millis()).unwrap_or(u64::MAX),
            parameters: action.parameters(),
        }
    }
}

/// Checks network reachability before a retry.
#[derive(Debug, Clone)]
pub struct ConnectivityCheckAction {
    timeout: Duration,
}

impl Default for ConnectivityCheckAction {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl RecoveryAction for ConnectivityCheckAction {
    fn id(&self) -> &str {
        "check_connectivity"
    }

    fn name(&self) -> &str {
        "Check network connectivity"
    }

    fn action_type(&self) -> ActionType {
        ActionType::Reset
    }

    fn priority(&self) -> u32 {
        1
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult> {
        let status = ctx.system_state.network_status;
        let result = match status {
            NetworkStatus::Online => RecoveryResult::success("Network is reachable", NextAction::Retry),
            NetworkStatus::Degraded => {
                RecoveryResult::success("Network is degraded, retrying", NextAction::Retry)
            }
            NetworkStatus::Offline => RecoveryResult::failure("Network is offline", NextAction::Fallback),
        };
        Ok(result.with_data(json!({ "network_status": status })))
    }
}

/// Asks the host to release memory before a retry.
#[derive(Debug, Clone)]
pub struct MemoryCleanupAction {
    min_free_mb: f64,
}

impl Default for MemoryCleanupAction {
    fn default() -> Self {
        Self { min_free_mb: 512.0 }
    }
}

impl MemoryCleanupAction {
    /// Creates a cleanup action that considers `min_free_mb` enough to retry.
    #[must_use]
    pub fn new(min_free_mb: f64) -> Self {
        Self { min_free_mb }
    }
}

#[async_trait]
impl RecoveryAction for MemoryCleanupAction {
    fn id(&self) -> &str {
        "cleanup_memory"
    }

    fn name(&self) -> &str {
        "Release memory"
    }

    fn action_type(&self) -> ActionType {
        ActionType::Cleanup
    }

    fn priority(&self) -> u32 {
        1
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn parameters(&self) -> Value {
        json!({ "min_free_mb": self.min_free_mb })
    }

    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult> {
        let available = ctx.system_state.available_memory_mb;
        info!(
            pipeline_id = %ctx.pipeline_id,
            stage_id = %ctx.stage_id,
            available_mb = available,
            "Requesting memory cleanup"
        );
        let data = json!({ "available_memory_mb": available });
        if available >= self.min_free_mb {
            Ok(RecoveryResult::success("Memory cleanup requested", NextAction::Retry).with_data(data))
        } else {
            Ok(RecoveryResult::failure("Not enough free memory to retry", NextAction::Fallback).with_data(data))
        }
    }
}

/// Verifies that the path named in the error context is accessible.
#[derive(Debug, Clone)]
pub struct PathValidationAction {
    key: String,
}

impl Default for PathValidationAction {
    fn default() -> Self {
        Self {
            key: "path".to_string(),
        }
    }
}

impl PathValidationAction {
    /// Validates the path stored under `key` instead of `path`.
    #[must_use]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl RecoveryAction for PathValidationAction {
    fn id(&self) -> &str {
        "validate_path"
    }

    fn name(&self) -> &str {
        "Validate file path"
    }

    fn action_type(&self) -> ActionType {
        ActionType::Reset
    }

    fn priority(&self) -> u32 {
        1
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn parameters(&self) -> Value {
        json!({ "key": self.key })
    }

    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult> {
        let Some(path) = ctx.lookup(&self.key).and_then(Value::as_str) else {
            return Ok(RecoveryResult::failure(
                format!("No '{}' in error context", self.key),
                NextAction::Skip,
            ));
        };
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("path '{path}' is not accessible"))?;
        Ok(RecoveryResult::success("Path is accessible", NextAction::Retry)
            .with_data(json!({ "path": path, "is_dir": meta.is_dir(), "len": meta.len() })))
    }
}

/// Records the error and defers to the strategy's fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorAction;

#[async_trait]
impl RecoveryAction for LogErrorAction {
    fn id(&self) -> &str {
        "log_error"
    }

    fn name(&self) -> &str {
        "Log error"
    }

    fn action_type(&self) -> ActionType {
        ActionType::Notification
    }

    fn priority(&self) -> u32 {
        10
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult> {
        warn!(
            pipeline_id = %ctx.pipeline_id,
            stage_id = %ctx.stage_id,
            code = %ctx.error.code,
            attempt = ctx.attempt,
            "Unhandled pipeline error: {}", ctx.error.message
        );
        Ok(RecoveryResult::success("Error logged", NextAction::Fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineError;
    use crate::recovery::context::SystemState;

    fn ctx() -> ErrorContext {
        ErrorContext::new(PipelineError::new("s", "NETWORK_ERROR", "reset"), "p", "s")
    }

    #[tokio::test]
    async fn test_connectivity_online_asks_for_retry() {
        let result = ConnectivityCheckAction::default().execute(&ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.next_action, NextAction::Retry);
        assert!(!result.resolves());
    }

    #[tokio::test]
    async fn test_connectivity_offline_fails() {
        let mut c = ctx();
        c.system_state = SystemState {
            network_status: NetworkStatus::Offline,
            ..SystemState::default()
        };
        let result = ConnectivityCheckAction::default().execute(&c).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.data["network_status"], "offline");
    }

    #[tokio::test]
    async fn test_memory_cleanup_threshold() {
        let mut c = ctx();
        c.system_state.available_memory_mb = 100.0;
        let result = MemoryCleanupAction::default().execute(&c).await.unwrap();
        assert!(!result.success);
        let result = MemoryCleanupAction::new(50.0).execute(&c).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_path_validation() {
        let mut c = ctx();
        let missing = PathValidationAction::default().execute(&c).await.unwrap();
        assert_eq!(missing.next_action, NextAction::Skip);

        let dir = std::env::temp_dir();
        c.error = c.error.clone().with_context("path", json!(dir.to_string_lossy()));
        let ok = PathValidationAction::default().execute(&c).await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.data["is_dir"], true);

        c.error = c.error.clone().with_context("path", json!("/definitely/not/here"));
        let err = PathValidationAction::default().execute(&c).await.unwrap_err();
        assert!(err.to_string().contains("not accessible"));
    }

    #[test]
    fn test_descriptor() {
        let d = ActionDescriptor::of(&LogErrorAction);
        assert_eq!(d.id, "log_error");
        assert_eq!(d.timeout_ms, 1_000);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "notification");
    }
}
