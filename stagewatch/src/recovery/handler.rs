//! The error handler: strategy selection, retries and outcome reporting.

use super::action::{RecoveryAction, RecoveryResult};
use super::analytics::ErrorAnalytics;
use super::context::{ErrorAttempt, ErrorContext, StaticProbe, SystemProbe, SystemState, UserPreferences};
use super::defaults::default_strategies;
use super::patterns::{ErrorPattern, PatternCatalog};
use super::strategy::{calculate_retry_delay, ErrorHandlingStrategy, FallbackAction};
use crate::core::{PipelineError, Severity};
use crate::errors::StagewatchError;
use crate::notify::{NoOpNotifier, Notification, Notifier};
use crate::utils::{fingerprint, panic_message};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Attempts kept per `(pipeline, stage)` pair.
pub const MAX_HISTORY_PER_STAGE: usize = 10;

/// Code of the synthetic error produced when an action times out.
pub const RECOVERY_ACTION_TIMEOUT: &str = "RECOVERY_ACTION_TIMEOUT";

/// Code of the synthetic error produced when an action fails or panics.
pub const RECOVERY_ACTION_FAILED: &str = "RECOVERY_ACTION_FAILED";

/// What the caller should do after handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    /// Recovery succeeded; resume the stage.
    Continue,
    /// Skip the stage.
    Skip,
    /// Run an alternative implementation of the stage.
    Alternative,
    /// Hand over to an operator.
    Manual,
    /// Stop the pipeline.
    Abort,
}

impl From<FallbackAction> for FinalAction {
    fn from(fallback: FallbackAction) -> Self {
        match fallback {
            FallbackAction::Skip => Self::Skip,
            FallbackAction::Alternative => Self::Alternative,
            FallbackAction::Manual => Self::Manual,
            FallbackAction::Abort => Self::Abort,
        }
    }
}

impl fmt::Display for FinalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Skip => write!(f, "skip"),
            Self::Alternative => write!(f, "alternative"),
            Self::Manual => write!(f, "manual"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Outcome of [`ErrorHandler::handle_error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingResult {
    /// Whether an action resolved the error.
    pub success: bool,
    /// What the caller should do next.
    pub final_action: FinalAction,
    /// Attempts run across all strategies.
    pub attempts_made: u32,
    /// Last strategy attempted.
    pub strategy_used: Option<String>,
    /// Wall time spent handling, in milliseconds.
    pub recovery_time_ms: u64,
    /// The error still outstanding, if recovery failed.
    pub final_error: Option<PipelineError>,
    /// Advisory hints for an operator.
    pub recommendations: Vec<String>,
    /// Ids of every action run, in order.
    pub actions_executed: Vec<String>,
    /// Ids of catalog patterns that matched the error.
    pub matched_patterns: Vec<String>,
}

enum ActionOutcome {
    Completed(RecoveryResult),
    TimedOut(Duration),
    Failed(String),
}

/// Classifies errors, runs recovery strategies and keeps statistics.
///
/// `handle_error` never fails: every internal problem ends up in the
/// returned [`ErrorHandlingResult`]. Locks are never held across an
/// `.await`, so concurrent calls for different stages proceed independently.
pub struct ErrorHandler {
    preferences: RwLock<UserPreferences>,
    strategies: RwLock<HashMap<String, ErrorHandlingStrategy>>,
    history: RwLock<HashMap<String, VecDeque<ErrorAttempt>>>,
    analytics: RwLock<ErrorAnalytics>,
    patterns: Mutex<PatternCatalog>,
    probe: Arc<dyn SystemProbe>,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("preferences", &*self.preferences.read())
            .field("strategies", &self.strategies.read().len())
            .field("history_keys", &self.history.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn history_key(pipeline_id: &str, stage_id: &str) -> String {
    format!("{pipeline_id}:{stage_id}")
}

fn synthetic_error(previous: &PipelineError, code: &str, action: &str, reason: &str) -> PipelineError {
    let mut error = PipelineError::new(
        previous.stage.clone(),
        code,
        format!("Recovery action '{action}' failed: {reason}"),
    )
    .with_severity(previous.severity)
    .with_recoverable(previous.recoverable)
    .with_max_retries(previous.max_retries)
    .with_retry_count(previous.retry_count)
    .with_details(format!("{}: {}", previous.code, previous.message));
    error.context = previous.context.clone();
    error
        .with_context("failed_action", json!(action))
        .with_context("original_code", json!(previous.code))
}

async fn run_action(action: &dyn RecoveryAction, ctx: &ErrorContext, limit: Duration) -> ActionOutcome {
    let guarded = AssertUnwindSafe(action.execute(ctx)).catch_unwind();
    match tokio::time::timeout(limit, guarded).await {
        Err(_) => ActionOutcome::TimedOut(limit),
        Ok(Err(panic)) => ActionOutcome::Failed(format!("panicked: {}", panic_message(panic.as_ref()))),
        Ok(Ok(Err(e))) => ActionOutcome::Failed(format!("{e:#}")),
        Ok(Ok(Ok(result))) => ActionOutcome::Completed(result),
    }
}

impl ErrorHandler {
    /// Creates a handler with the built-in strategies and patterns.
    #[must_use]
    pub fn new(preferences: UserPreferences) -> Self {
        let strategies = default_strategies()
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Self {
            preferences: RwLock::new(preferences),
            strategies: RwLock::new(strategies),
            history: RwLock::new(HashMap::new()),
            analytics: RwLock::new(ErrorAnalytics::default()),
            patterns: Mutex::new(PatternCatalog::with_defaults()),
            probe: Arc::new(StaticProbe::default()),
            notifier: Arc::new(NoOpNotifier),
        }
    }

    /// Creates a handler with default preferences.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(UserPreferences::default())
    }

    /// Uses `probe` for system snapshots.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn SystemProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Sends error and recovery notifications to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns the current preferences.
    #[must_use]
    pub fn preferences(&self) -> UserPreferences {
        self.preferences.read().clone()
    }

    /// Replaces the preferences for subsequent calls.
    pub fn set_preferences(&self, preferences: UserPreferences) {
        *self.preferences.write() = preferences;
    }

    /// Registers a strategy, returning the one it replaced.
    pub fn add_strategy(&self, strategy: ErrorHandlingStrategy) -> Option<ErrorHandlingStrategy> {
        debug!(strategy_id = %strategy.id, "Registering error handling strategy");
        self.strategies.write().insert(strategy.id.clone(), strategy)
    }

    /// Removes a strategy. Returns false if it was not registered.
    pub fn remove_strategy(&self, id: &str) -> bool {
        self.strategies.write().remove(id).is_some()
    }

    /// Copies of every registered strategy, ordered by id.
    #[must_use]
    pub fn get_strategies(&self) -> Vec<ErrorHandlingStrategy> {
        let mut all: Vec<_> = self.strategies.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Strategies applicable to `error`, most specific first.
    ///
    /// Specificity is the number of declared error types, fewest first, with
    /// the id as tie-break. Wildcard strategies take part like any other.
    #[must_use]
    pub fn find_matching_strategies(&self, error: &PipelineError) -> Vec<ErrorHandlingStrategy> {
        let mut matching: Vec<_> = self
            .strategies
            .read()
            .values()
            .filter(|s| s.matches(error))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.error_types
                .len()
                .cmp(&b.error_types.len())
                .then_with(|| a.id.cmp(&b.id))
        });
        matching
    }

    /// Snapshot of the analytics counters.
    #[must_use]
    pub fn get_analytics(&self) -> ErrorAnalytics {
        self.analytics.read().clone()
    }

    /// Snapshot of the pattern catalog.
    #[must_use]
    pub fn get_error_patterns(&self) -> Vec<ErrorPattern> {
        self.patterns.lock().patterns()
    }

    /// Adds or replaces a catalog pattern.
    pub fn add_error_pattern(&self, pattern: ErrorPattern) -> Result<(), StagewatchError> {
        self.patterns
            .lock()
            .add(pattern)
            .map_err(|e| StagewatchError::Config(format!("invalid error pattern: {e}")))
    }

    /// Recorded attempts for one stage, oldest first.
    #[must_use]
    pub fn get_error_history(&self, pipeline_id: &str, stage_id: &str) -> Vec<ErrorAttempt> {
        self.history
            .read()
            .get(&history_key(pipeline_id, stage_id))
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forgets history for one pipeline, or for all pipelines.
    pub fn clear_error_history(&self, pipeline_id: Option<&str>) {
        let mut history = self.history.write();
        match pipeline_id {
            Some(id) => {
                let prefix = format!("{id}:");
                history.retain(|key, _| !key.starts_with(&prefix));
            }
            None => history.clear(),
        }
    }

    /// Tries to recover from `error` raised by `stage_id` of `pipeline_id`.
    ///
    /// Each matching strategy gets up to `min(strategy.max_retries,
    /// preferences.max_retry_attempts)` attempts. An attempt runs the
    /// strategy's actions in priority order; the first action that answers
    /// [`NextAction::Continue`](super::NextAction::Continue) ends handling
    /// successfully. Otherwise the last attempted strategy's fallback is
    /// returned.
    pub async fn handle_error(
        &self,
        error: &PipelineError,
        pipeline_id: &str,
        stage_id: &str,
        stage_data: Option<serde_json::Value>,
        pipeline_data: Option<serde_json::Value>,
    ) -> ErrorHandlingResult {
        let started = Instant::now();
        let preferences = self.preferences();
        let system_state = self.probe.snapshot();
        let key = history_key(pipeline_id, stage_id);
        let previous_attempts = self.get_error_history(pipeline_id, stage_id);
        let print = fingerprint([error.code.as_str(), stage_id, error.message.as_str()]);

        self.analytics.write().record_error(error, &print);
        let matched_patterns = self.patterns.lock().classify(error);
        let strategies = self.find_matching_strategies(error);

        info!(
            pipeline_id,
            stage_id,
            code = %error.code,
            severity = %error.severity,
            strategies = strategies.len(),
            "Handling pipeline error"
        );

        let mut working = error.clone();
        let mut attempts_made = 0u32;
        let mut actions_executed = Vec::new();
        let mut last_strategy: Option<&ErrorHandlingStrategy> = None;
        let mut success = false;

        'strategies: for strategy in &strategies {
            let budget = strategy.max_retries.min(preferences.max_retry_attempts);
            for attempt in 1..=budget {
                last_strategy = Some(strategy);
                attempts_made += 1;
                working = working.clone().with_retry_count(working.retry_count.saturating_add(1));

                let ctx = ErrorContext {
                    error: working.clone(),
                    pipeline_id: pipeline_id.to_string(),
                    stage_id: stage_id.to_string(),
                    attempt,
                    previous_attempts: previous_attempts.clone(),
                    stage_data: stage_data.clone(),
                    pipeline_data: pipeline_data.clone(),
                    system_state: system_state.clone(),
                    preferences: preferences.clone(),
                };

                for action in strategy.recovery_actions() {
                    actions_executed.push(action.id().to_string());
                    let limit = action.timeout().min(preferences.retry_timeout());
                    match run_action(action.as_ref(), &ctx, limit).await {
                        ActionOutcome::Completed(result) => {
                            debug!(
                                strategy_id = %strategy.id,
                                action_id = action.id(),
                                attempt,
                                success = result.success,
                                next_action = ?result.next_action,
                                "Recovery action finished: {}", result.message
                            );
                            if result.resolves() {
                                success = true;
                                break 'strategies;
                            }
                        }
                        ActionOutcome::TimedOut(limit) => {
                            warn!(
                                strategy_id = %strategy.id,
                                action_id = action.id(),
                                attempt,
                                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                                "Recovery action timed out"
                            );
                            working = synthetic_error(
                                &working,
                                RECOVERY_ACTION_TIMEOUT,
                                action.id(),
                                &format!("timed out after {limit:?}"),
                            );
                        }
                        ActionOutcome::Failed(reason) => {
                            warn!(
                                strategy_id = %strategy.id,
                                action_id = action.id(),
                                attempt,
                                "Recovery action failed: {reason}"
                            );
                            working = synthetic_error(&working, RECOVERY_ACTION_FAILED, action.id(), &reason);
                        }
                    }
                }

                if attempt < budget {
                    tokio::time::sleep(calculate_retry_delay(strategy, attempt)).await;
                }
            }
        }

        let final_action = if success {
            FinalAction::Continue
        } else {
            match last_strategy {
                Some(s) if preferences.auto_fallback => s.fallback_action.into(),
                _ => FinalAction::Manual,
            }
        };

        let recovery_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let recommendations = recommendations(
            error,
            stage_id,
            &previous_attempts,
            &system_state,
            &preferences,
            attempts_made,
            success,
            final_action,
            &matched_patterns,
        );

        let strategy_used = last_strategy.map(|s| s.id.clone());
        self.record_attempt(key, error, &print, strategy_used.clone(), &actions_executed, success, recovery_time_ms);
        if attempts_made > 0 {
            self.analytics.write().record_recovery(success, recovery_time_ms);
        }
        self.notify(error, pipeline_id, stage_id, &preferences, success, final_action);

        info!(
            pipeline_id,
            stage_id,
            success,
            final_action = %final_action,
            attempts_made,
            "Error handling finished"
        );

        ErrorHandlingResult {
            success,
            final_action,
            attempts_made,
            strategy_used,
            recovery_time_ms,
            final_error: (!success).then_some(working),
            recommendations,
            actions_executed,
            matched_patterns: matched_patterns.into_iter().map(|p| p.id).collect(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_attempt(
        &self,
        key: String,
        error: &PipelineError,
        print: &str,
        strategy_id: Option<String>,
        actions_executed: &[String],
        success: bool,
        duration_ms: u64,
    ) {
        let mut history = self.history.write();
        let entries = history.entry(key).or_default();
        let number = entries.back().map_or(1, |a| a.attempt_number.saturating_add(1));
        let mut attempt = ErrorAttempt::new(number, error.clone(), print);
        attempt.strategy_id = strategy_id;
        attempt.actions_executed = actions_executed.to_vec();
        attempt.success = success;
        attempt.duration_ms = duration_ms;
        entries.push_back(attempt);
        while entries.len() > MAX_HISTORY_PER_STAGE {
            entries.pop_front();
        }
    }

    fn notify(
        &self,
        error: &PipelineError,
        pipeline_id: &str,
        stage_id: &str,
        preferences: &UserPreferences,
        success: bool,
        final_action: FinalAction,
    ) {
        if preferences.notify_on_error {
            let message = format!("{} ({}), next: {final_action}", error.message, error.code);
            self.notifier.notify(
                &Notification::new("Pipeline error", message, error.severity, pipeline_id).for_stage(stage_id),
            );
        }
        if success && preferences.notify_on_recovery {
            self.notifier.notify(
                &Notification::new(
                    "Error recovered",
                    format!("Recovered from {}", error.code),
                    Severity::Low,
                    pipeline_id,
                )
                .for_stage(stage_id),
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recommendations(
    error: &PipelineError,
    stage_id: &str,
    previous_attempts: &[ErrorAttempt],
    system: &SystemState,
    preferences: &UserPreferences,
    attempts_made: u32,
    success: bool,
    final_action: FinalAction,
    patterns: &[ErrorPattern],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: String| {
        if !out.contains(&s) {
            out.push(s);
        }
    };

    let failures = previous_attempts.iter().filter(|a| !a.success).count();
    if failures > 3 {
        push(format!(
            "Stage '{stage_id}' has failed {failures} times; investigate the root cause"
        ));
    }
    if system.available_memory_mb < 1024.0 {
        push("Available memory is low; close other applications or reduce batch size".to_string());
    }
    if system.cpu_usage > 80.0 {
        push("CPU usage is high; reduce parallelism or retry later".to_string());
    }
    if error.code.contains("NETWORK") {
        push("Check network connectivity and remote service availability".to_string());
    }
    if error.code.contains("PERMISSION") {
        push("Verify file and directory permissions".to_string());
    }
    if error.code.contains("MEMORY") {
        push("Reduce input size or increase available memory".to_string());
    }
    if !success && attempts_made > 1 {
        push(format!(
            "{attempts_made} recovery attempts failed; manual intervention may be required"
        ));
    }
    for pattern in patterns {
        push(pattern.suggestion.clone());
    }
    if final_action == FinalAction::Skip && !preferences.allow_data_loss {
        push(format!(
            "Skipping stage '{stage_id}' may lose its output; allow data loss or provide an alternative"
        ));
    }
    out
}
