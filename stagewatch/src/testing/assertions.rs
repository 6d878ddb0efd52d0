//! Assertions over monitor state and emitted events.

use crate::core::{PipelineEventType, PipelineState, PipelineStatus, StageStatus};
use crate::events::CollectingListener;

/// Asserts that `stage` of `status` is in `expected`.
pub fn assert_stage_status(status: &PipelineStatus, stage: &str, expected: StageStatus) {
    let actual = status.stage(stage).map(|s| s.status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{}' to be {:?}, got {:?}",
        stage,
        expected,
        actual
    );
}

/// Asserts the pipeline state.
pub fn assert_pipeline_state(status: &PipelineStatus, expected: PipelineState) {
    assert_eq!(
        status.status, expected,
        "Expected pipeline '{}' to be {:?}, got {:?}",
        status.id, expected, status.status
    );
}

/// Asserts that every started stage had its dependencies satisfied.
///
/// A stage that is running or finished must not depend on a stage that is
/// still pending, running or failed.
pub fn assert_dependencies_respected(status: &PipelineStatus) {
    for stage in &status.stages {
        if stage.status == StageStatus::Pending {
            continue;
        }
        for dep in &stage.dependencies {
            let dep_status = status.stage(dep).map(|s| s.status);
            assert!(
                dep_status.is_some_and(|s| s.satisfies_dependency()),
                "Stage '{}' is {:?} but dependency '{}' is {:?}",
                stage.id,
                stage.status,
                dep,
                dep_status
            );
        }
    }
}

/// Asserts that the events of the listed types arrived in this order.
///
/// Events of other types are ignored.
pub fn assert_event_order(listener: &CollectingListener, expected: &[PipelineEventType]) {
    let seen: Vec<PipelineEventType> = listener
        .types()
        .into_iter()
        .filter(|t| expected.contains(t))
        .collect();
    assert_eq!(seen, expected, "Unexpected event order");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{two_stage_pipeline, TestFixture};

    #[test]
    fn test_assertions_accept_valid_run() {
        let fixture = TestFixture::new(two_stage_pipeline());
        fixture.start("extract");
        fixture.complete("extract");
        let status = fixture.status();

        assert_stage_status(&status, "extract", StageStatus::Completed);
        assert_stage_status(&status, "transform", StageStatus::Running);
        assert_pipeline_state(&status, PipelineState::Running);
        assert_dependencies_respected(&status);
        assert_event_order(
            &fixture.events,
            &[
                PipelineEventType::StageStarted,
                PipelineEventType::StageCompleted,
                PipelineEventType::StageStarted,
            ],
        );
    }

    #[test]
    #[should_panic(expected = "Expected stage 'extract'")]
    fn test_stage_status_mismatch_panics() {
        let fixture = TestFixture::new(two_stage_pipeline());
        assert_stage_status(&fixture.status(), "extract", StageStatus::Running);
    }
}
