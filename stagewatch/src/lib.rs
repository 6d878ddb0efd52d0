//! # Stagewatch
//!
//! Monitoring and error recovery for multi-stage processing pipelines.
//!
//! Stagewatch tracks pipelines made of dependent stages and reacts to their
//! failures:
//!
//! - **Monitoring**: stage lifecycle, dependency-gated auto-start, progress,
//!   metrics, bounded logs and periodic resource sampling with threshold alerts
//! - **Events**: typed lifecycle events delivered to subscribed listeners
//! - **Recovery**: rule-driven strategies with bounded retries, backoff,
//!   recovery actions and fallbacks, plus error history and analytics
//! - **Supervision**: glue that applies a recovery outcome back to the monitor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagewatch::prelude::*;
//!
//! let monitor = PipelineMonitor::new(MonitorConfig::default());
//! monitor.create_pipeline("render", "Render video", vec![
//!     StageDefinition::new("decode", "Decode"),
//!     StageDefinition::new("encode", "Encode").with_dependency("decode"),
//! ])?;
//! monitor.start_stage("render", "decode");
//! monitor.update_stage_progress("render", "decode", 40.0, None);
//!
//! let supervisor = Supervisor::new(monitor.clone(), Arc::new(ErrorHandler::with_defaults()));
//! let error = PipelineError::new("decode", "NETWORK_ERROR", "connection reset");
//! let outcome = supervisor.report_failure("render", "decode", error, None).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod core;
pub mod errors;
pub mod events;
pub mod monitor;
pub mod notify;
pub mod observability;
pub mod recovery;
pub mod supervisor;
pub mod testing;
pub mod utils;

mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        LogLevel, PipelineError, PipelineEvent, PipelineEventType, PipelineState,
        PipelineStatus, PipelineWarning, Severity, StageDefinition, StageMetricsUpdate,
        StageStatus, WarningType,
    };
    pub use crate::errors::StagewatchError;
    pub use crate::events::{CollectingListener, EventListener, LoggingListener};
    pub use crate::monitor::{AlertThresholds, MonitorConfig, PipelineMonitor};
    pub use crate::notify::{Notification, NotificationSettings, Notifier};
    pub use crate::observability::{init_tracing, TracingConfig};
    pub use crate::recovery::{
        ErrorHandler, ErrorHandlingResult, ErrorHandlingStrategy, FinalAction, NextAction,
        RecoveryAction, RecoveryResult, UserPreferences,
    };
    pub use crate::supervisor::Supervisor;
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
