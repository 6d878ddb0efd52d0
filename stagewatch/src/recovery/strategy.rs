//! Error handling strategies and retry backoff.

use super::action::{ActionDescriptor, RecoveryAction};
use super::condition::ErrorCondition;
use crate::core::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shape of the delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * attempt
    Linear,
    /// delay = base * multiplier^(attempt - 1)
    #[default]
    Exponential,
    /// delay = base
    Fixed,
}

/// What the caller should do once a strategy is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// Skip the stage and carry on.
    Skip,
    /// Switch to an alternative implementation of the stage.
    Alternative,
    /// Hand the failure to an operator.
    #[default]
    Manual,
    /// Stop the pipeline.
    Abort,
}

impl fmt::Display for FallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Alternative => write!(f, "alternative"),
            Self::Manual => write!(f, "manual"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Matches a class of errors to recovery actions, retries and a fallback.
#[derive(Clone)]
pub struct ErrorHandlingStrategy {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Codes (or code fragments) this strategy handles; `"*"` handles all.
    pub error_types: Vec<String>,
    /// Attempts before falling back.
    pub max_retries: u32,
    /// Base delay between attempts.
    pub retry_delay: Duration,
    /// Delay growth between attempts.
    pub backoff_strategy: BackoffStrategy,
    /// Growth factor for exponential backoff.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_retry_delay: Duration,
    /// Outcome once every attempt has failed.
    pub fallback_action: FallbackAction,
    /// Actions in ascending priority.
    recovery_actions: Vec<Arc<dyn RecoveryAction>>,
    /// Extra predicates that must all hold for the strategy to apply.
    pub conditions: Vec<ErrorCondition>,
}

impl ErrorHandlingStrategy {
    /// Wildcard entry in `error_types`.
    pub const WILDCARD: &'static str = "*";

    /// Creates a strategy with one attempt, no delay and a manual fallback.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            error_types: Vec::new(),
            max_retries: 1,
            retry_delay: Duration::ZERO,
            backoff_strategy: BackoffStrategy::Fixed,
            backoff_multiplier: 2.0,
            max_retry_delay: Duration::from_secs(30),
            fallback_action: FallbackAction::Manual,
            recovery_actions: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Sets the handled error types.
    #[must_use]
    pub fn with_error_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.error_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the backoff shape and multiplier.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy, multiplier: f64) -> Self {
        self.backoff_strategy = strategy;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Sets the fallback.
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackAction) -> Self {
        self.fallback_action = fallback;
        self
    }

    /// Adds a recovery action, keeping actions ordered by priority.
    #[must_use]
    pub fn with_action(mut self, action: Arc<dyn RecoveryAction>) -> Self {
        self.recovery_actions.push(action);
        // Stable sort keeps insertion order among equal priorities.
        self.recovery_actions.sort_by_key(|a| a.priority());
        self
    }

    /// Adds a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ErrorCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Recovery actions in execution order.
    #[must_use]
    pub fn recovery_actions(&self) -> &[Arc<dyn RecoveryAction>] {
        &self.recovery_actions
    }

    /// Returns true if `"*"` is among the error types.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.error_types.iter().any(|t| t == Self::WILDCARD)
    }

    /// Returns true if the error's code is covered and every condition holds.
    #[must_use]
    pub fn matches(&self, error: &PipelineError) -> bool {
        let type_match = self
            .error_types
            .iter()
            .any(|t| t == Self::WILDCARD || error.code.contains(t.as_str()));
        type_match && self.conditions.iter().all(|c| c.evaluate(error))
    }

    /// Returns a serializable description of the strategy.
    #[must_use]
    pub fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            error_types: self.error_types.clone(),
            max_retries: self.max_retries,
            retry_delay_ms: duration_ms(self.retry_delay),
            backoff_strategy: self.backoff_strategy,
            backoff_multiplier: self.backoff_multiplier,
            max_retry_delay_ms: duration_ms(self.max_retry_delay),
            fallback_action: self.fallback_action,
            recovery_actions: self
                .recovery_actions
                .iter()
                .map(|a| ActionDescriptor::of(a.as_ref()))
                .collect(),
            conditions: self.conditions.clone(),
        }
    }
}

impl fmt::Debug for ErrorHandlingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.recovery_actions.iter().map(|a| a.id()).collect();
        f.debug_struct("ErrorHandlingStrategy")
            .field("id", &self.id)
            .field("error_types", &self.error_types)
            .field("max_retries", &self.max_retries)
            .field("backoff_strategy", &self.backoff_strategy)
            .field("fallback_action", &self.fallback_action)
            .field("recovery_actions", &actions)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

/// Serializable view of an [`ErrorHandlingStrategy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Handled error types.
    pub error_types: Vec<String>,
    /// Attempt budget.
    pub max_retries: u32,
    /// Base delay in milliseconds.
    pub retry_delay_ms: u64,
    /// Backoff shape.
    pub backoff_strategy: BackoffStrategy,
    /// Exponential growth factor.
    pub backoff_multiplier: f64,
    /// Delay cap in milliseconds.
    pub max_retry_delay_ms: u64,
    /// Fallback.
    pub fallback_action: FallbackAction,
    /// Actions in execution order.
    pub recovery_actions: Vec<ActionDescriptor>,
    /// Conditions.
    pub conditions: Vec<ErrorCondition>,
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Delay to wait after the given 1-based attempt, capped at `max_retry_delay`.
#[must_use]
pub fn calculate_retry_delay(strategy: &ErrorHandlingStrategy, attempt: u32) -> Duration {
    let base = strategy.retry_delay.as_secs_f64() * 1000.0;
    let attempt = attempt.max(1);
    let delay_ms = match strategy.backoff_strategy {
        BackoffStrategy::Linear => base * f64::from(attempt),
        BackoffStrategy::Exponential => {
            let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
            base * strategy.backoff_multiplier.powi(exponent)
        }
        BackoffStrategy::Fixed => base,
    };
    let cap = strategy.max_retry_delay.as_secs_f64() * 1000.0;
    let capped = if delay_ms.is_finite() { delay_ms.min(cap) } else { cap };
    Duration::from_secs_f64(capped.max(0.0) / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::condition::ErrorField;

    fn exponential() -> ErrorHandlingStrategy {
        ErrorHandlingStrategy::new("net", "Network")
            .with_error_types(["NETWORK"])
            .with_retry_delay(Duration::from_millis(2_000))
            .with_backoff(BackoffStrategy::Exponential, 2.0)
            .with_max_retry_delay(Duration::from_millis(30_000))
    }

    #[test]
    fn test_exponential_delay() {
        let s = exponential();
        assert_eq!(calculate_retry_delay(&s, 1), Duration::from_millis(2_000));
        assert_eq!(calculate_retry_delay(&s, 2), Duration::from_millis(4_000));
        assert_eq!(calculate_retry_delay(&s, 3), Duration::from_millis(8_000));
    }

    #[test]
    fn test_delay_is_capped() {
        let s = exponential().with_max_retry_delay(Duration::from_millis(5_000));
        assert_eq!(calculate_retry_delay(&s, 3), Duration::from_millis(5_000));
        assert_eq!(calculate_retry_delay(&s, 60), Duration::from_millis(5_000));
    }

    #[test]
    fn test_linear_and_fixed_delay() {
        let linear = exponential().with_backoff(BackoffStrategy::Linear, 1.0);
        assert_eq!(calculate_retry_delay(&linear, 3), Duration::from_millis(6_000));

        let fixed = exponential().with_backoff(BackoffStrategy::Fixed, 1.0);
        assert_eq!(calculate_retry_delay(&fixed, 1), Duration::from_millis(2_000));
        assert_eq!(calculate_retry_delay(&fixed, 4), Duration::from_millis(2_000));
    }

    #[test]
    fn test_matching_by_substring_and_wildcard() {
        let s = exponential();
        assert!(s.matches(&PipelineError::new("a", "NETWORK_ERROR", "reset")));
        assert!(!s.matches(&PipelineError::new("a", "DISK_FULL", "no space")));

        let any = ErrorHandlingStrategy::new("any", "Any").with_error_types(["*"]);
        assert!(any.is_wildcard());
        assert!(any.matches(&PipelineError::new("a", "DISK_FULL", "no space")));
    }

    #[test]
    fn test_conditions_must_all_hold() {
        let s = exponential().with_condition(ErrorCondition::equals(
            ErrorField::Stage,
            serde_json::json!("download"),
        ));
        assert!(s.matches(&PipelineError::new("download", "NETWORK_ERROR", "x")));
        assert!(!s.matches(&PipelineError::new("render", "NETWORK_ERROR", "x")));
    }

    #[test]
    fn test_descriptor_serializes() {
        let json = serde_json::to_value(exponential().descriptor()).unwrap();
        assert_eq!(json["backoff_strategy"], "exponential");
        assert_eq!(json["retry_delay_ms"], 2_000);
        assert_eq!(json["fallback_action"], "manual");
    }
}
