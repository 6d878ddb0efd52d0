//! The pipeline monitor and its per-pipeline state machine.

use super::alerts::check_thresholds;
use super::config::MonitorConfig;
use super::graph::validate_stages;
use super::sampler::{ResourceSampler, SimulatedSampler};
use crate::core::{
    LogLevel, PipelineError, PipelineEvent, PipelineEventType, PipelineLog, PipelineStage,
    PipelineState, PipelineStatus, PipelineWarning, Severity, StageDefinition, StageMetricsUpdate,
    StageStatus,
};
use crate::errors::StagewatchError;
use crate::events::{EventBus, EventListener, ListenerId};
use crate::notify::{notifier_for, Notification, Notifier};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

struct MonitorInner {
    config: MonitorConfig,
    pipelines: DashMap<String, Arc<TrackedPipeline>>,
    timers: DashMap<String, JoinHandle<()>>,
    bus: EventBus,
    sampler: Arc<dyn ResourceSampler>,
    notifier: Arc<dyn Notifier>,
}

/// A registered pipeline and the events waiting to be delivered for it.
struct TrackedPipeline {
    status: Mutex<PipelineStatus>,
    outbox: Mutex<Outbox>,
}

/// FIFO of undelivered events. Only one caller drains it at a time.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<PipelineEvent>,
    draining: bool,
}

impl TrackedPipeline {
    fn new(status: PipelineStatus) -> Self {
        Self {
            status: Mutex::new(status),
            outbox: Mutex::new(Outbox::default()),
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        for timer in self.timers.iter() {
            timer.value().abort();
        }
    }
}

/// Tracks the lifecycle, progress, metrics and logs of running pipelines.
///
/// Cloning is cheap and every clone shares the same state. Each pipeline is
/// guarded by its own lock, so pipelines are updated independently. Events
/// are queued per pipeline under that lock and delivered after it is
/// released, in the order the triggering calls ran. Listeners may call back
/// into the monitor; events raised by such calls are delivered after the ones
/// already queued.
///
/// Mutators return `false` instead of failing when the pipeline or stage is
/// unknown or the transition is not allowed from the current state.
#[derive(Clone)]
pub struct PipelineMonitor {
    inner: Arc<MonitorInner>,
}

impl std::fmt::Debug for PipelineMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMonitor")
            .field("pipelines", &self.inner.pipelines.len())
            .field("timers", &self.inner.timers.len())
            .field("bus", &self.inner.bus)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

/// Mutation scope for one locked pipeline.
struct Changes<'a> {
    status: &'a mut PipelineStatus,
    config: &'a MonitorConfig,
    events: Vec<PipelineEvent>,
    stop_monitoring: bool,
}

impl Changes<'_> {
    fn log(&mut self, level: LogLevel, stage: Option<&str>, message: impl Into<String>) {
        if level < self.config.log_level {
            return;
        }
        let entry = PipelineLog::new(level, stage, message);
        mirror_to_tracing(&self.status.id, &entry);
        self.status.push_log(entry, self.config.max_log_entries);
    }

    fn emit(&mut self, event: PipelineEvent) {
        self.events.push(event);
    }

    fn event(&self, event_type: PipelineEventType) -> PipelineEvent {
        PipelineEvent::new(event_type, self.status.id.clone())
    }

    fn is_locked(&self) -> bool {
        self.status.status.is_terminal()
    }

    fn start_stage(&mut self, stage_id: &str) -> bool {
        if self.status.status != PipelineState::Initializing && self.status.status != PipelineState::Running {
            return false;
        }
        if !self.status.dependencies_satisfied(stage_id) {
            return false;
        }
        let Some(stage) = self.status.stage_mut(stage_id) else {
            return false;
        };
        if stage.status != StageStatus::Pending {
            return false;
        }
        stage.mark_running();
        let name = stage.name.clone();

        self.status.current_stage = Some(stage_id.to_string());
        if self.status.status == PipelineState::Initializing {
            self.status.status = PipelineState::Running;
        }
        self.status.refresh_metrics();
        self.log(LogLevel::Info, Some(stage_id), format!("Stage '{name}' started"));
        let event = self
            .event(PipelineEventType::StageStarted)
            .for_stage(stage_id)
            .with_data(json!({ "stage_name": name }));
        self.emit(event);
        true
    }

    fn complete_stage(&mut self, stage_id: &str, outputs: Option<Vec<String>>) -> bool {
        let deps_ok = self.status.dependencies_satisfied(stage_id);
        let Some(stage) = self.status.stage_mut(stage_id) else {
            return false;
        };
        let allowed = match stage.status {
            StageStatus::Running => true,
            StageStatus::Pending => deps_ok,
            _ => false,
        };
        if !allowed {
            return false;
        }
        stage.mark_completed(outputs);
        let data = json!({
            "duration_ms": stage.duration_ms,
            "outputs": stage.outputs,
        });
        let name = stage.name.clone();

        self.log(LogLevel::Info, Some(stage_id), format!("Stage '{name}' completed"));
        let event = self
            .event(PipelineEventType::StageCompleted)
            .for_stage(stage_id)
            .with_data(data);
        self.emit(event);
        self.settle();
        true
    }

    /// Finishes the pipeline once every stage is done, otherwise starts the
    /// next eligible stage.
    fn settle(&mut self) {
        self.status.refresh_progress();
        self.status.refresh_metrics();

        if self.status.all_stages_finished() {
            self.status.finish(PipelineState::Completed);
            let metrics = &self.status.metrics;
            let data = json!({
                "duration_ms": metrics.total_duration_ms,
                "stages_completed": metrics.stages_completed,
                "stages_skipped": metrics.stages_skipped,
                "warning_count": metrics.warning_count,
            });
            self.log(LogLevel::Info, None, "Pipeline completed");
            let event = self.event(PipelineEventType::PipelineCompleted).with_data(data);
            self.emit(event);
            self.stop_monitoring = true;
            return;
        }

        if let Some(next) = self.status.next_eligible_stage() {
            self.start_stage(&next);
        }
    }

    fn progress_event(&mut self, stage_id: &str) {
        let data = json!({
            "progress": self.status.stage(stage_id).map_or(0.0, |s| s.progress),
            "overall_progress": self.status.overall_progress,
            "estimated_time_remaining_ms": self.status.metrics.estimated_time_remaining_ms,
        });
        let event = self
            .event(PipelineEventType::ProgressUpdated)
            .for_stage(stage_id)
            .with_data(data);
        self.emit(event);
    }
}

fn mirror_to_tracing(pipeline_id: &str, entry: &PipelineLog) {
    let stage = entry.stage.as_deref().unwrap_or("-");
    match entry.level {
        LogLevel::Debug => debug!(pipeline_id, stage, "{}", entry.message),
        LogLevel::Info => info!(pipeline_id, stage, "{}", entry.message),
        LogLevel::Warn => warn!(pipeline_id, stage, "{}", entry.message),
        LogLevel::Error => error!(pipeline_id, stage, "{}", entry.message),
    }
}

impl PipelineMonitor {
    /// Creates a monitor with the simulated resource sampler and the
    /// notifier implied by `config.notifications`.
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_sampler(config, Arc::new(SimulatedSampler::default()))
    }

    /// Creates a monitor with a custom resource sampler.
    #[must_use]
    pub fn with_sampler(config: MonitorConfig, sampler: Arc<dyn ResourceSampler>) -> Self {
        let notifier = notifier_for(&config.notifications);
        Self::from_parts(config, sampler, notifier)
    }

    /// Creates a monitor from explicit parts.
    #[must_use]
    pub fn from_parts(
        config: MonitorConfig,
        sampler: Arc<dyn ResourceSampler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                config,
                pipelines: DashMap::new(),
                timers: DashMap::new(),
                bus: EventBus::new(),
                sampler,
                notifier,
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Registers a pipeline with every stage `pending` and starts its sampler.
    ///
    /// The sampler needs a tokio runtime; without one the pipeline is still
    /// registered and can be sampled with [`sample_pipeline`](Self::sample_pipeline).
    ///
    /// # Errors
    ///
    /// Fails if `id` is already registered or the stage declarations are
    /// empty, repeat an id, name an unknown dependency or form a cycle.
    pub fn create_pipeline(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        stages: Vec<StageDefinition>,
    ) -> Result<(), StagewatchError> {
        let id = id.into();
        let name = name.into();
        validate_stages(&stages)?;

        let stage_count = stages.len();
        let mut status = PipelineStatus::new(
            id.clone(),
            name.clone(),
            stages.into_iter().map(PipelineStage::from).collect(),
        );
        let mut changes = Changes {
            status: &mut status,
            config: &self.inner.config,
            events: Vec::new(),
            stop_monitoring: false,
        };
        changes.log(
            LogLevel::Info,
            None,
            format!("Pipeline '{name}' created with {stage_count} stages"),
        );

        match self.inner.pipelines.entry(id.clone()) {
            Entry::Occupied(_) => return Err(StagewatchError::DuplicatePipeline(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(TrackedPipeline::new(status)));
            }
        }

        self.start_sampler(&id);
        Ok(())
    }

    fn start_sampler(&self, pipeline_id: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(pipeline_id, "No async runtime, background sampling disabled");
            return;
        };
        let period = self.inner.config.update_interval().max(Duration::from_millis(1));
        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let id = pipeline_id.to_string();

        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let monitor = PipelineMonitor { inner };
                if !monitor.tick(&id) {
                    monitor.inner.timers.remove(&id);
                    break;
                }
            }
        });

        if let Some(previous) = self.inner.timers.insert(pipeline_id.to_string(), task) {
            previous.abort();
        }
    }

    /// Runs `f` against one locked pipeline, queues the collected events in
    /// the pipeline's outbox, then delivers the outbox with the lock released.
    fn mutate<R>(&self, pipeline_id: &str, f: impl FnOnce(&mut Changes<'_>) -> R) -> Option<R> {
        let entry = self
            .inner
            .pipelines
            .get(pipeline_id)
            .map(|e| Arc::clone(e.value()))?;

        let (result, stop) = {
            let mut guard = entry.status.lock();
            let mut changes = Changes {
                status: &mut guard,
                config: &self.inner.config,
                events: Vec::new(),
                stop_monitoring: false,
            };
            let result = f(&mut changes);
            let Changes {
                events,
                stop_monitoring,
                ..
            } = changes;
            entry.outbox.lock().queue.extend(events);
            (result, stop_monitoring)
        };

        if stop {
            self.stop_monitoring(pipeline_id);
        }
        self.drain(&entry);
        Some(result)
    }

    /// Delivers queued events in the order they were queued. A call made
    /// while another call is already draining (a listener calling back into
    /// the monitor, or another thread) only leaves its events in the queue.
    fn drain(&self, entry: &TrackedPipeline) {
        {
            let mut outbox = entry.outbox.lock();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        loop {
            let next = {
                let mut outbox = entry.outbox.lock();
                let next = outbox.queue.pop_front();
                if next.is_none() {
                    outbox.draining = false;
                }
                next
            };
            let Some(event) = next else {
                break;
            };
            self.inner.bus.emit(&event);
            self.notify(&event);
        }
    }

    fn notify(&self, event: &PipelineEvent) {
        let (title, severity) = match event.event_type {
            PipelineEventType::PipelineFailed => ("Pipeline failed", Severity::Critical),
            PipelineEventType::PipelineCompleted => ("Pipeline completed", Severity::Low),
            PipelineEventType::ResourceAlert => ("Resource alert", Severity::High),
            PipelineEventType::QualityAlert => ("Quality alert", Severity::High),
            _ => return,
        };
        let message = event
            .data
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| event.data.to_string(), str::to_string);
        let mut notification = Notification::new(title, message, severity, event.pipeline_id.clone());
        if let Some(stage) = &event.stage_id {
            notification = notification.for_stage(stage.clone());
        }
        self.inner.notifier.notify(&notification);
    }

    /// One sampler tick. Returns false once the pipeline is gone or terminal.
    fn tick(&self, pipeline_id: &str) -> bool {
        let config = &self.inner.config;
        let sampler = &self.inner.sampler;
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            if c.status.status == PipelineState::Paused {
                return true;
            }
            if config.enable_resource_monitoring {
                c.status.resource_usage = sampler.sample(&*c.status);
            }
            if config.enable_metrics || config.enable_quality_monitoring {
                c.status.refresh_metrics();
            }
            let alerts = check_thresholds(
                &*c.status,
                &config.alert_thresholds,
                config.enable_resource_monitoring,
                config.enable_quality_monitoring,
            );
            for alert in alerts {
                c.log(LogLevel::Warn, None, alert.message.clone());
                let event = alert.into_event(&c.status.id);
                c.emit(event);
            }
            true
        })
        .unwrap_or(false)
    }

    /// Performs one sampler tick immediately.
    ///
    /// Returns false if the pipeline is unknown or terminal.
    pub fn sample_pipeline(&self, pipeline_id: &str) -> bool {
        self.tick(pipeline_id)
    }

    /// Starts a pending stage whose dependencies are satisfied.
    pub fn start_stage(&self, pipeline_id: &str, stage_id: &str) -> bool {
        self.mutate(pipeline_id, |c| c.start_stage(stage_id))
            .unwrap_or(false)
    }

    /// Records progress for a running stage.
    ///
    /// Progress is clamped to `0..=100` and replaces the previous value even
    /// when lower. Reaching 100 completes the stage.
    pub fn update_stage_progress(
        &self,
        pipeline_id: &str,
        stage_id: &str,
        progress: f64,
        metrics: Option<StageMetricsUpdate>,
    ) -> bool {
        if progress.is_nan() {
            return false;
        }
        let progress = progress.clamp(0.0, 100.0);
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            let Some(stage) = c.status.stage_mut(stage_id) else {
                return false;
            };
            if stage.status != StageStatus::Running {
                return false;
            }
            stage.progress = progress;
            if let Some(update) = &metrics {
                stage.metrics.merge(update);
            }

            c.status.refresh_progress();
            c.status.refresh_metrics();
            c.log(LogLevel::Debug, Some(stage_id), format!("Progress {progress:.1}%"));
            c.progress_event(stage_id);

            if progress >= 100.0 {
                c.complete_stage(stage_id, None);
            }
            true
        })
        .unwrap_or(false)
    }

    /// Completes a running stage, or a pending one whose dependencies are met.
    pub fn complete_stage(&self, pipeline_id: &str, stage_id: &str, outputs: Option<Vec<String>>) -> bool {
        self.mutate(pipeline_id, |c| !c.is_locked() && c.complete_stage(stage_id, outputs))
            .unwrap_or(false)
    }

    /// Records an error and marks the stage failed.
    ///
    /// A critical or unrecoverable error also fails the pipeline.
    pub fn fail_stage(&self, pipeline_id: &str, stage_id: &str, error: PipelineError) -> bool {
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            let Some(stage) = c.status.stage_mut(stage_id) else {
                return false;
            };
            if stage.status.satisfies_dependency() {
                return false;
            }
            stage.errors.push(error.clone());
            stage.mark_failed();
            c.status.errors.push(error.clone());
            c.status.refresh_progress();
            c.status.refresh_metrics();

            c.log(
                LogLevel::Error,
                Some(stage_id),
                format!("Stage failed: {} - {}", error.code, error.message),
            );
            let failed = c
                .event(PipelineEventType::StageFailed)
                .for_stage(stage_id)
                .with_data(json!({
                    "code": error.code,
                    "message": error.message,
                    "severity": error.severity,
                }));
            c.emit(failed);
            let occurred = c
                .event(PipelineEventType::ErrorOccurred)
                .for_stage(stage_id)
                .with_data(serde_json::to_value(&error).unwrap_or_default());
            c.emit(occurred);

            if error.is_fatal() {
                c.status.finish(PipelineState::Failed);
                c.log(
                    LogLevel::Error,
                    Some(stage_id),
                    format!("Pipeline failed: {}", error.message),
                );
                let event = c
                    .event(PipelineEventType::PipelineFailed)
                    .for_stage(stage_id)
                    .with_data(json!({
                        "code": error.code,
                        "message": error.message,
                    }));
                c.emit(event);
                c.stop_monitoring = true;
            }
            true
        })
        .unwrap_or(false)
    }

    /// Skips a pending or failed stage.
    ///
    /// Skipped stages satisfy dependencies, so the pipeline continues exactly
    /// as after a completion.
    pub fn skip_stage(&self, pipeline_id: &str, stage_id: &str, reason: &str) -> bool {
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            let Some(stage) = c.status.stage_mut(stage_id) else {
                return false;
            };
            if !matches!(stage.status, StageStatus::Pending | StageStatus::Failed) {
                return false;
            }
            stage.mark_skipped();
            c.log(LogLevel::Warn, Some(stage_id), format!("Stage skipped: {reason}"));
            c.status.refresh_progress();
            c.status.refresh_metrics();
            c.progress_event(stage_id);
            c.settle();
            true
        })
        .unwrap_or(false)
    }

    /// Returns a failed stage to `pending` so it can be retried.
    pub fn reset_stage(&self, pipeline_id: &str, stage_id: &str) -> bool {
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            let Some(stage) = c.status.stage_mut(stage_id) else {
                return false;
            };
            if stage.status != StageStatus::Failed {
                return false;
            }
            stage.reset();
            c.status.refresh_progress();
            c.status.refresh_metrics();
            c.log(LogLevel::Info, Some(stage_id), "Stage reset for retry");
            c.progress_event(stage_id);
            true
        })
        .unwrap_or(false)
    }

    /// Records a warning. Never changes stage or pipeline status.
    pub fn add_warning(&self, pipeline_id: &str, warning: PipelineWarning) -> bool {
        self.mutate(pipeline_id, |c| {
            if let Some(stage) = c.status.stage_mut(&warning.stage) {
                stage.warnings.push(warning.clone());
            }
            c.status.warnings.push(warning.clone());
            c.status.refresh_metrics();
            c.log(
                LogLevel::Warn,
                Some(&warning.stage),
                format!("Warning ({}): {}", warning.warning_type, warning.message),
            );
            let event = c
                .event(PipelineEventType::WarningIssued)
                .for_stage(warning.stage.clone())
                .with_data(serde_json::to_value(&warning).unwrap_or_default());
            c.emit(event);
            true
        })
        .unwrap_or(false)
    }

    /// Appends a log entry, subject to the configured level and capacity.
    pub fn add_log(&self, pipeline_id: &str, level: LogLevel, stage_id: Option<&str>, message: &str) -> bool {
        self.mutate(pipeline_id, |c| c.log(level, stage_id, message))
            .is_some()
    }

    /// Pauses a pipeline. Paused pipelines start no stages and skip sampling.
    pub fn pause_pipeline(&self, pipeline_id: &str) -> bool {
        self.mutate(pipeline_id, |c| {
            if !matches!(c.status.status, PipelineState::Initializing | PipelineState::Running) {
                return false;
            }
            c.status.status = PipelineState::Paused;
            c.log(LogLevel::Info, None, "Pipeline paused");
            true
        })
        .unwrap_or(false)
    }

    /// Resumes a paused pipeline.
    pub fn resume_pipeline(&self, pipeline_id: &str) -> bool {
        self.mutate(pipeline_id, |c| {
            if c.status.status != PipelineState::Paused {
                return false;
            }
            let started = c.status.stages.iter().any(|s| s.status != StageStatus::Pending);
            c.status.status = if started {
                PipelineState::Running
            } else {
                PipelineState::Initializing
            };
            c.log(LogLevel::Info, None, "Pipeline resumed");
            true
        })
        .unwrap_or(false)
    }

    /// Cancels a pipeline and stops its sampler.
    pub fn cancel_pipeline(&self, pipeline_id: &str) -> bool {
        self.mutate(pipeline_id, |c| {
            if c.is_locked() {
                return false;
            }
            c.status.finish(PipelineState::Cancelled);
            c.log(LogLevel::Warn, None, "Pipeline cancelled");
            c.stop_monitoring = true;
            true
        })
        .unwrap_or(false)
    }

    /// Returns a snapshot of one pipeline.
    #[must_use]
    pub fn get_pipeline_status(&self, pipeline_id: &str) -> Option<PipelineStatus> {
        self.inner
            .pipelines
            .get(pipeline_id)
            .map(|e| e.value().status.lock().clone())
    }

    /// Returns snapshots of every pipeline, oldest first.
    #[must_use]
    pub fn get_all_pipelines(&self) -> Vec<PipelineStatus> {
        let mut all: Vec<PipelineStatus> = self
            .inner
            .pipelines
            .iter()
            .map(|e| e.value().status.lock().clone())
            .collect();
        all.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Returns log entries at or above `min_level`, oldest first.
    #[must_use]
    pub fn get_logs(&self, pipeline_id: &str, min_level: LogLevel) -> Vec<PipelineLog> {
        self.inner
            .pipelines
            .get(pipeline_id)
            .map(|e| {
                e.value()
                    .status
                    .lock()
                    .logs
                    .iter()
                    .filter(|l| l.level >= min_level)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subscribes a listener to one event type.
    pub fn add_event_listener(
        &self,
        event_type: PipelineEventType,
        listener: Arc<dyn EventListener>,
    ) -> ListenerId {
        self.inner.bus.subscribe(event_type, listener)
    }

    /// Subscribes a listener to every event type.
    pub fn add_global_listener(
        &self,
        listener: Arc<dyn EventListener>,
    ) -> Vec<(PipelineEventType, ListenerId)> {
        self.inner.bus.subscribe_all(listener)
    }

    /// Unsubscribes a listener.
    pub fn remove_event_listener(&self, event_type: PipelineEventType, id: ListenerId) -> bool {
        self.inner.bus.unsubscribe(event_type, id)
    }

    /// Returns true while the pipeline has a background sampler.
    #[must_use]
    pub fn is_monitoring(&self, pipeline_id: &str) -> bool {
        self.inner.timers.contains_key(pipeline_id)
    }

    /// Cancels the pipeline's background sampler. State is left untouched.
    pub fn stop_monitoring(&self, pipeline_id: &str) -> bool {
        match self.inner.timers.remove(pipeline_id) {
            Some((_, task)) => {
                task.abort();
                debug!(pipeline_id, "Monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// Stops every sampler and forgets all pipelines and listeners.
    pub fn destroy(&self) {
        let ids: Vec<String> = self.inner.timers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.stop_monitoring(&id);
        }
        self.inner.pipelines.clear();
        self.inner.bus.clear();
        info!("Pipeline monitor destroyed");
    }
}
