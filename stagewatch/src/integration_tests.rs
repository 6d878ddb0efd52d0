//! End-to-end scenarios across the monitor, the handler and the supervisor.

#[cfg(test)]
mod tests {
    use crate::core::{
        PipelineEventType, PipelineState, ResourceUsage, StageStatus,
    };
    use crate::monitor::{FixedSampler, MonitorConfig, PipelineMonitor};
    use crate::recovery::{
        calculate_retry_delay, network_error_strategy, ErrorHandler, FinalAction, UserPreferences,
    };
    use crate::supervisor::Supervisor;
    use crate::testing::{
        assert_dependencies_respected, assert_event_order, assert_pipeline_state,
        assert_stage_status, critical_error, linear_pipeline, network_error, two_stage_pipeline,
        RecordingNotifier, TestFixture,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_progress_drives_two_stage_pipeline_to_completion() {
        let fx = TestFixture::new(two_stage_pipeline());

        assert!(fx.start("extract"));
        assert!(fx.progress("extract", 50.0));
        assert_eq!(fx.status().overall_progress, 25.0);

        assert!(fx.progress("extract", 100.0));
        let status = fx.status();
        assert_stage_status(&status, "extract", StageStatus::Completed);
        assert_stage_status(&status, "transform", StageStatus::Running);
        assert_eq!(status.overall_progress, 50.0);

        assert!(fx.complete("transform"));
        let status = fx.status();
        assert_pipeline_state(&status, PipelineState::Completed);
        assert_eq!(status.overall_progress, 100.0);
        assert!(status.end_time.is_some());

        assert_event_order(
            &fx.events,
            &[
                PipelineEventType::StageStarted,
                PipelineEventType::StageCompleted,
                PipelineEventType::StageStarted,
                PipelineEventType::StageCompleted,
                PipelineEventType::PipelineCompleted,
            ],
        );
    }

    #[test]
    fn test_completing_pending_stage_auto_starts_dependent() {
        let fx = TestFixture::new(two_stage_pipeline());

        assert!(!fx.complete("transform"));
        assert!(fx.complete("extract"));
        let status = fx.status();
        assert_stage_status(&status, "extract", StageStatus::Completed);
        assert_stage_status(&status, "transform", StageStatus::Running);
        assert_eq!(status.current_stage.as_deref(), Some("transform"));
    }

    #[test]
    fn test_n_completions_terminate_pipeline() {
        let fx = TestFixture::new(linear_pipeline(6));
        for i in 0..6 {
            assert!(fx.complete(&format!("stage-{i}")));
        }
        let status = fx.status();
        assert_pipeline_state(&status, PipelineState::Completed);
        assert_eq!(status.overall_progress, 100.0);
        assert_eq!(status.metrics.stages_completed, 6);
        assert_eq!(fx.events.count_of(PipelineEventType::PipelineCompleted), 1);

        // Terminal pipelines ignore further mutation.
        assert!(!fx.complete("stage-0"));
        assert!(!fx.progress("stage-5", 10.0));
    }

    #[test]
    fn test_dependency_invariant_holds_under_mixed_operations() {
        let fx = TestFixture::new(linear_pipeline(4));
        let ops: Vec<Box<dyn Fn(&TestFixture) -> bool>> = vec![
            Box::new(|f: &TestFixture| f.start("stage-2")),
            Box::new(|f: &TestFixture| f.complete("stage-3")),
            Box::new(|f: &TestFixture| f.start("stage-0")),
            Box::new(|f: &TestFixture| f.start("stage-1")),
            Box::new(|f: &TestFixture| f.progress("stage-0", 40.0)),
            Box::new(|f: &TestFixture| f.monitor.fail_stage(&f.pipeline_id, "stage-0", network_error("stage-0"))),
            Box::new(|f: &TestFixture| f.start("stage-1")),
            Box::new(|f: &TestFixture| f.monitor.skip_stage(&f.pipeline_id, "stage-0", "optional")),
            Box::new(|f: &TestFixture| f.complete("stage-2")),
        ];
        let accepted: Vec<bool> = ops
            .iter()
            .map(|op| {
                let ok = op(&fx);
                assert_dependencies_respected(&fx.status());
                ok
            })
            .collect();

        assert_eq!(
            accepted,
            vec![false, false, true, false, true, true, false, true, false]
        );
        assert_stage_status(&fx.status(), "stage-1", StageStatus::Running);
    }

    #[test]
    fn test_lower_progress_overwrites_higher() {
        let fx = TestFixture::new(two_stage_pipeline());
        fx.start("extract");
        fx.progress("extract", 60.0);
        fx.progress("extract", 30.0);
        assert_eq!(fx.status().stage("extract").unwrap().progress, 30.0);

        fx.progress("extract", -5.0);
        assert_eq!(fx.status().stage("extract").unwrap().progress, 0.0);
    }

    #[test]
    fn test_alerts_are_not_debounced() {
        let usage = ResourceUsage {
            cpu_percent: 97.0,
            ..ResourceUsage::default()
        };
        let monitor = PipelineMonitor::with_sampler(
            MonitorConfig::default().with_quality_monitoring(false),
            Arc::new(FixedSampler::new(usage)),
        );
        let events = Arc::new(crate::events::CollectingListener::new());
        monitor.add_event_listener(PipelineEventType::ResourceAlert, events.clone());
        monitor.create_pipeline("p", "P", two_stage_pipeline()).unwrap();

        for _ in 0..3 {
            assert!(monitor.sample_pipeline("p"));
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events.events()[0].data["metric"], "cpu_usage");
    }

    #[test]
    fn test_backoff_progression_and_cap() {
        let strategy = network_error_strategy();
        assert_eq!(calculate_retry_delay(&strategy, 1), Duration::from_millis(2_000));
        assert_eq!(calculate_retry_delay(&strategy, 3), Duration::from_millis(8_000));
        assert_eq!(calculate_retry_delay(&strategy, 10), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_with_defaults_falls_back_to_alternative() {
        let handler = ErrorHandler::with_defaults();
        let started = tokio::time::Instant::now();

        let result = handler
            .handle_error(&network_error("fetch"), "p", "fetch", None, None)
            .await;

        assert!(!result.success);
        assert_eq!(result.final_action, FinalAction::Alternative);
        // The wildcard strategy declares one type and runs first.
        assert_eq!(result.attempts_made, 4);
        assert_eq!(result.strategy_used.as_deref(), Some("network_error_strategy"));
        assert_eq!(
            result.actions_executed,
            vec!["log_error", "check_connectivity", "check_connectivity", "check_connectivity"]
        );
        assert!(result.matched_patterns.contains(&"network_timeout".to_string()));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("network connectivity")));

        // 2000 ms after the first network attempt, 4000 ms after the second, none after the last.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(6_000));
        assert!(waited < Duration::from_millis(8_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_is_minimum_of_strategy_and_preferences() {
        let handler = ErrorHandler::new(UserPreferences::default().with_max_retry_attempts(1));
        let result = handler
            .handle_error(&network_error("fetch"), "p", "fetch", None, None)
            .await;
        // One attempt each for the generic and the network strategy.
        assert_eq!(result.attempts_made, 2);

        handler.set_preferences(UserPreferences::default().with_max_retry_attempts(10));
        let result = handler
            .handle_error(&network_error("fetch"), "p", "fetch", None, None)
            .await;
        assert_eq!(result.attempts_made, 1 + 3);
    }

    #[tokio::test]
    async fn test_repeated_handling_is_well_formed() {
        let handler = ErrorHandler::with_defaults();
        let error = crate::core::PipelineError::new("parse", "PARSE_ERROR", "unexpected token");
        for _ in 0..5 {
            let result = handler.handle_error(&error, "p", "parse", None, None).await;
            assert_eq!(result.final_action, FinalAction::Manual);
            assert_eq!(result.attempts_made, 1);
            assert_eq!(result.strategy_used.as_deref(), Some("generic_error_strategy"));
        }
        let analytics = handler.get_analytics();
        assert_eq!(analytics.total_errors, 5);
        assert_eq!(analytics.unique_errors, 1);
        assert_eq!(analytics.failed_recoveries, 5);
        assert_eq!(handler.get_error_history("p", "parse").len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervised_network_failure_then_manual_retry() {
        let fx = TestFixture::with_config(
            MonitorConfig::default()
                .with_resource_monitoring(false)
                .with_quality_monitoring(false),
            two_stage_pipeline(),
        );
        let supervisor = Supervisor::new(fx.monitor.clone(), Arc::new(ErrorHandler::with_defaults()));
        fx.start("extract");

        let result = supervisor
            .report_failure(&fx.pipeline_id, "extract", network_error("extract"), None)
            .await;
        assert_eq!(result.final_action, FinalAction::Alternative);

        let status = fx.status();
        assert_pipeline_state(&status, PipelineState::Running);
        assert_stage_status(&status, "extract", StageStatus::Failed);
        assert_eq!(status.warnings.len(), 1);
        assert!(status.warnings[0].message.contains("alternative implementation"));

        assert!(fx.monitor.reset_stage(&fx.pipeline_id, "extract"));
        assert!(fx.start("extract"));
        assert!(fx.complete("extract"));
        assert!(fx.complete("transform"));
        assert_pipeline_state(&fx.status(), PipelineState::Completed);
        assert_eq!(fx.status().errors.len(), 1);
    }

    #[tokio::test]
    async fn test_supervised_critical_failure_fails_pipeline_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::new());
        let monitor = PipelineMonitor::from_parts(
            MonitorConfig::default().with_resource_monitoring(false),
            Arc::new(FixedSampler::new(ResourceUsage::default())),
            notifier.clone(),
        );
        monitor.create_pipeline("p", "P", two_stage_pipeline()).unwrap();
        monitor.start_stage("p", "extract");
        let supervisor = Supervisor::new(monitor.clone(), Arc::new(ErrorHandler::with_defaults()));

        let result = supervisor
            .report_failure("p", "extract", critical_error("extract"), None)
            .await;
        assert_eq!(result.final_action, FinalAction::Manual);

        let status = monitor.get_pipeline_status("p").unwrap();
        assert_pipeline_state(&status, PipelineState::Failed);
        assert!(!monitor.is_monitoring("p"));
        assert!(notifier.titles().contains(&"Pipeline failed".to_string()));

        // Locked: neither the stage nor the pipeline moves again.
        assert!(!monitor.start_stage("p", "transform"));
        assert!(!monitor.reset_stage("p", "extract"));
    }
}
