//! In-process typed publish/subscribe.

use super::EventListener;
use crate::core::{PipelineEvent, PipelineEventType};
use crate::utils::panic_message;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Registration = (ListenerId, Arc<dyn EventListener>);

/// Delivers events to the listeners registered for their type.
///
/// Delivery is synchronous and happens in registration order. The listener
/// table is snapshotted before delivery so listeners may subscribe or
/// unsubscribe from inside a callback.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<PipelineEventType, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one event type.
    pub fn subscribe(&self, event_type: PipelineEventType, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event_type)
            .or_default()
            .push((id, listener));
        id
    }

    /// Registers the same listener for every event type.
    pub fn subscribe_all(&self, listener: Arc<dyn EventListener>) -> Vec<(PipelineEventType, ListenerId)> {
        PipelineEventType::ALL
            .iter()
            .map(|t| (*t, self.subscribe(*t, listener.clone())))
            .collect()
    }

    /// Removes a listener. Returns false if it was not registered for `event_type`.
    pub fn unsubscribe(&self, event_type: PipelineEventType, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(registered) = listeners.get_mut(&event_type) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(lid, _)| *lid != id);
        before != registered.len()
    }

    /// Returns the number of listeners registered for `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: PipelineEventType) -> usize {
        self.listeners.read().get(&event_type).map_or(0, Vec::len)
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Delivers an event to its listeners.
    ///
    /// Panics raised by listeners are caught and logged.
    pub fn emit(&self, event: &PipelineEvent) {
        let targets: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .get(&event.event_type)
            .map(|regs| regs.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in targets {
            if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            })) {
                warn!(
                    event_type = %event.event_type,
                    pipeline_id = %event.pipeline_id,
                    "Event listener panicked: {}", panic_message(panic.as_ref())
                );
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<PipelineEventType, usize> = self
            .listeners
            .read()
            .iter()
            .map(|(t, l)| (*t, l.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingListener;

    fn event(event_type: PipelineEventType) -> PipelineEvent {
        PipelineEvent::new(event_type, "p1")
    }

    #[test]
    fn test_delivers_only_matching_type() {
        let bus = EventBus::new();
        let listener = Arc::new(CollectingListener::new());
        bus.subscribe(PipelineEventType::StageStarted, listener.clone());

        bus.emit(&event(PipelineEventType::StageStarted));
        bus.emit(&event(PipelineEventType::StageCompleted));

        assert_eq!(listener.types(), vec![PipelineEventType::StageStarted]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let listener = Arc::new(CollectingListener::new());
        let id = bus.subscribe(PipelineEventType::StageStarted, listener.clone());

        assert!(!bus.unsubscribe(PipelineEventType::StageFailed, id));
        assert!(bus.unsubscribe(PipelineEventType::StageStarted, id));
        assert!(!bus.unsubscribe(PipelineEventType::StageStarted, id));

        bus.emit(&event(PipelineEventType::StageStarted));
        assert!(listener.is_empty());
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let after = Arc::new(CollectingListener::new());
        bus.subscribe(
            PipelineEventType::ErrorOccurred,
            Arc::new(|_: &PipelineEvent| panic!("listener bug")),
        );
        bus.subscribe(PipelineEventType::ErrorOccurred, after.clone());

        bus.emit(&event(PipelineEventType::ErrorOccurred));

        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_subscribe_all() {
        let bus = EventBus::new();
        let listener = Arc::new(CollectingListener::new());
        let ids = bus.subscribe_all(listener.clone());
        assert_eq!(ids.len(), PipelineEventType::ALL.len());

        for t in PipelineEventType::ALL {
            bus.emit(&event(t));
        }
        assert_eq!(listener.len(), PipelineEventType::ALL.len());
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let bus_clone = bus.clone();
        let id_cell = Arc::new(parking_lot::Mutex::new(None));
        let id_clone = id_cell.clone();

        let id = bus.subscribe(
            PipelineEventType::StageStarted,
            Arc::new(move |_: &PipelineEvent| {
                if let Some(id) = *id_clone.lock() {
                    bus_clone.unsubscribe(PipelineEventType::StageStarted, id);
                }
            }),
        );
        *id_cell.lock() = Some(id);

        bus.emit(&event(PipelineEventType::StageStarted));
        assert_eq!(bus.listener_count(PipelineEventType::StageStarted), 0);
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        bus.subscribe(PipelineEventType::StageStarted, Arc::new(CollectingListener::new()));
        bus.clear();
        assert_eq!(bus.listener_count(PipelineEventType::StageStarted), 0);
    }
}
