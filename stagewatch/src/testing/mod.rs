//! Testing utilities for monitored pipelines and recovery strategies.
//!
//! This module provides:
//! - Scripted recovery actions and a recording notifier
//! - Pipeline fixtures
//! - Assertions over monitor state and event order

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_dependencies_respected, assert_event_order, assert_pipeline_state,
    assert_stage_status,
};
pub use fixtures::{critical_error, linear_pipeline, network_error, two_stage_pipeline, TestFixture};
pub use mocks::{RecordingNotifier, ScriptedAction, Step};
