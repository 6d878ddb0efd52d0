//! Event listener trait and implementations.

use crate::core::{PipelineEvent, PipelineEventType};
use tracing::{debug, info, warn, Level};

/// Receives pipeline events synchronously on the emitting thread.
///
/// Implementations should return quickly; a panicking listener is caught
/// and logged by the bus and does not affect other listeners.
pub trait EventListener: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &PipelineEvent);
}

impl<F> EventListener for F
where
    F: Fn(&PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event);
    }
}

/// A listener that logs events using the tracing framework.
///
/// Alerts and failures are always logged at `WARN`; everything else uses the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    level: Level,
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingListener {
    /// Creates a new logging listener with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging listener.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventListener for LoggingListener {
    fn on_event(&self, event: &PipelineEvent) {
        let noisy = matches!(
            event.event_type,
            PipelineEventType::ResourceAlert
                | PipelineEventType::QualityAlert
                | PipelineEventType::StageFailed
                | PipelineEventType::PipelineFailed
        );
        if noisy {
            warn!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                stage_id = ?event.stage_id,
                event_data = %event.data,
                "Event: {}", event.event_type
            );
        } else if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                stage_id = ?event.stage_id,
                event_data = %event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                pipeline_id = %event.pipeline_id,
                stage_id = ?event.stage_id,
                "Event: {}", event.event_type
            );
        }
    }
}

/// A listener that records every event, for tests and snapshots.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: parking_lot::RwLock<Vec<PipelineEvent>>,
}

impl CollectingListener {
    /// Creates a new collecting listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in delivery order.
    #[must_use]
    pub fn types(&self) -> Vec<PipelineEventType> {
        self.events.read().iter().map(|e| e.event_type).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the number of events of one type.
    #[must_use]
    pub fn count_of(&self, event_type: PipelineEventType) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventListener for CollectingListener {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(event_type: PipelineEventType) -> PipelineEvent {
        PipelineEvent::new(event_type, "p1")
    }

    #[test]
    fn test_closure_listener() {
        let hits = AtomicUsize::new(0);
        let listener = |_: &PipelineEvent| {
            hits.fetch_add(1, Ordering::SeqCst);
        };
        listener.on_event(&event(PipelineEventType::StageStarted));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logging_listener_does_not_panic() {
        let listener = LoggingListener::default();
        listener.on_event(&event(PipelineEventType::ResourceAlert));
        listener.on_event(&event(PipelineEventType::StageStarted));
        LoggingListener::debug().on_event(&event(PipelineEventType::ProgressUpdated));
    }

    #[test]
    fn test_collecting_listener() {
        let listener = CollectingListener::new();
        assert!(listener.is_empty());

        listener.on_event(&event(PipelineEventType::StageStarted));
        listener.on_event(&event(PipelineEventType::StageCompleted));
        listener.on_event(&event(PipelineEventType::StageCompleted));

        assert_eq!(listener.len(), 3);
        assert_eq!(listener.count_of(PipelineEventType::StageCompleted), 2);
        assert_eq!(listener.types()[0], PipelineEventType::StageStarted);

        listener.clear();
        assert!(listener.is_empty());
    }
}
