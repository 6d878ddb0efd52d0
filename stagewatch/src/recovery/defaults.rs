//! Strategies registered by [`ErrorHandler::new`](super::ErrorHandler::new).

use super::action::{ConnectivityCheckAction, LogErrorAction, MemoryCleanupAction, PathValidationAction};
use super::strategy::{BackoffStrategy, ErrorHandlingStrategy, FallbackAction};
use std::sync::Arc;
use std::time::Duration;

/// Retries transient network failures with exponential backoff.
#[must_use]
pub fn network_error_strategy() -> ErrorHandlingStrategy {
    ErrorHandlingStrategy::new("network_error_strategy", "Network error recovery")
        .with_error_types(["NETWORK_ERROR", "CONNECTION_ERROR", "TIMEOUT_ERROR", "DNS_ERROR"])
        .with_max_retries(3)
        .with_retry_delay(Duration::from_millis(2_000))
        .with_backoff(BackoffStrategy::Exponential, 2.0)
        .with_max_retry_delay(Duration::from_millis(30_000))
        .with_fallback(FallbackAction::Alternative)
        .with_action(Arc::new(ConnectivityCheckAction::default()))
}

/// Frees memory and retries with linear backoff.
#[must_use]
pub fn memory_error_strategy() -> ErrorHandlingStrategy {
    ErrorHandlingStrategy::new("memory_error_strategy", "Memory error recovery")
        .with_error_types(["MEMORY_ERROR", "OUT_OF_MEMORY", "ALLOCATION_ERROR"])
        .with_max_retries(2)
        .with_retry_delay(Duration::from_millis(5_000))
        .with_backoff(BackoffStrategy::Linear, 1.0)
        .with_max_retry_delay(Duration::from_millis(20_000))
        .with_fallback(FallbackAction::Alternative)
        .with_action(Arc::new(MemoryCleanupAction::default()))
}

/// Re-validates file paths and retries at a fixed interval.
#[must_use]
pub fn filesystem_error_strategy() -> ErrorHandlingStrategy {
    ErrorHandlingStrategy::new("filesystem_error_strategy", "File system error recovery")
        .with_error_types(["FILE_NOT_FOUND", "PERMISSION_DENIED", "DISK_FULL", "FILE_ERROR"])
        .with_max_retries(2)
        .with_retry_delay(Duration::from_millis(1_000))
        .with_backoff(BackoffStrategy::Fixed, 1.0)
        .with_max_retry_delay(Duration::from_millis(5_000))
        .with_fallback(FallbackAction::Skip)
        .with_action(Arc::new(PathValidationAction::default()))
}

/// Catches everything else: log once, then hand over to an operator.
#[must_use]
pub fn generic_error_strategy() -> ErrorHandlingStrategy {
    ErrorHandlingStrategy::new("generic_error_strategy", "Generic error handling")
        .with_error_types([ErrorHandlingStrategy::WILDCARD])
        .with_max_retries(1)
        .with_fallback(FallbackAction::Manual)
        .with_action(Arc::new(LogErrorAction))
}

/// Every built-in strategy.
#[must_use]
pub fn default_strategies() -> Vec<ErrorHandlingStrategy> {
    vec![
        network_error_strategy(),
        memory_error_strategy(),
        filesystem_error_strategy(),
        generic_error_strategy(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineError;

    #[test]
    fn test_default_ids_are_unique() {
        let ids: std::collections::HashSet<_> = default_strategies().into_iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_network_strategy_shape() {
        let s = network_error_strategy();
        assert!(s.matches(&PipelineError::new("a", "NETWORK_ERROR", "x")));
        assert_eq!(s.fallback_action, FallbackAction::Alternative);
        assert_eq!(s.recovery_actions()[0].id(), "check_connectivity");
    }

    #[test]
    fn test_only_generic_is_wildcard() {
        let wildcards: Vec<_> = default_strategies()
            .into_iter()
            .filter(ErrorHandlingStrategy::is_wildcard)
            .map(|s| s.id)
            .collect();
        assert_eq!(wildcards, vec!["generic_error_strategy"]);
    }
}
