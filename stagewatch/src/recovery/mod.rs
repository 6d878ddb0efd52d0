//! Error recovery.
//!
//! An [`ErrorHandler`] matches a [`PipelineError`](crate::core::PipelineError)
//! against registered [`ErrorHandlingStrategy`]s, runs their
//! [`RecoveryAction`]s with bounded retries and backoff, and reports a
//! [`FinalAction`] for the caller to apply.

mod action;
mod analytics;
mod condition;
mod context;
mod defaults;
mod handler;
mod patterns;
mod strategy;

pub use self::action::{
    ActionDescriptor, ActionType, ConnectivityCheckAction, LogErrorAction, MemoryCleanupAction,
    NextAction, PathValidationAction, RecoveryAction, RecoveryResult,
};
pub use self::analytics::ErrorAnalytics;
pub use self::condition::{ConditionOperator, ErrorCondition, ErrorField};
#[cfg(test)]
pub use self::context::MockSystemProbe;
pub use self::context::{
    ErrorAttempt, ErrorContext, NetworkStatus, StaticProbe, SystemHealth, SystemProbe, SystemState,
    UserPreferences,
};
pub use self::defaults::{
    default_strategies, filesystem_error_strategy, generic_error_strategy, memory_error_strategy,
    network_error_strategy,
};
pub use self::handler::{
    ErrorHandler, ErrorHandlingResult, FinalAction, MAX_HISTORY_PER_STAGE, RECOVERY_ACTION_FAILED,
    RECOVERY_ACTION_TIMEOUT,
};
pub use self::patterns::{ErrorPattern, PatternCatalog};
pub use self::strategy::{
    calculate_retry_delay, BackoffStrategy, ErrorHandlingStrategy, FallbackAction, StrategyDescriptor,
};
