//! Bounded channel forwarding for out-of-process consumers.
//!
//! Dashboards and exporters usually consume events on their own task. The
//! [`ChannelListener`] bridges the synchronous bus to a bounded `tokio`
//! channel and drops events, rather than blocking the monitor, when the
//! consumer falls behind.

use super::EventListener;
use crate::core::PipelineEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::warn;

/// Metrics for backpressure monitoring.
#[derive(Debug, Default)]
pub struct ForwardingMetrics {
    forwarded: AtomicU64,
    dropped: AtomicU64,
    last_drop_time: RwLock<Option<Instant>>,
}

impl ForwardingMetrics {
    /// Records a forwarded event.
    pub fn record_forward(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped event.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        *self.last_drop_time.write() = Some(Instant::now());
    }

    /// Returns the number of forwarded events.
    #[must_use]
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Returns the number of dropped events.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns when the last event was dropped.
    #[must_use]
    pub fn last_drop_time(&self) -> Option<Instant> {
        *self.last_drop_time.read()
    }

    /// Returns the drop rate as a percentage.
    #[must_use]
    pub fn drop_rate(&self) -> f64 {
        let forwarded = self.forwarded();
        let dropped = self.dropped();
        let total = forwarded + dropped;
        if total == 0 {
            0.0
        } else {
            (dropped as f64 / total as f64) * 100.0
        }
    }

    /// Converts metrics to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "forwarded": self.forwarded(),
            "dropped": self.dropped(),
            "drop_rate_percent": (self.drop_rate() * 100.0).round() / 100.0
        })
    }
}

/// A listener that forwards events into a bounded channel.
pub struct ChannelListener {
    tx: mpsc::Sender<PipelineEvent>,
    metrics: Arc<ForwardingMetrics>,
}

impl ChannelListener {
    /// Creates a listener and the receiving end of its channel.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                metrics: Arc::new(ForwardingMetrics::default()),
            },
            rx,
        )
    }

    /// Returns the shared metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<ForwardingMetrics> {
        self.metrics.clone()
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: &PipelineEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => self.metrics.record_forward(),
            Err(e) => {
                self.metrics.record_drop();
                warn!(
                    event_type = %event.event_type,
                    pipeline_id = %event.pipeline_id,
                    dropped_total = self.metrics.dropped(),
                    "Event dropped by channel listener: {}", e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineEventType;

    fn event() -> PipelineEvent {
        PipelineEvent::new(PipelineEventType::ProgressUpdated, "p1")
    }

    #[test]
    fn test_metrics_default() {
        let metrics = ForwardingMetrics::default();
        assert_eq!(metrics.forwarded(), 0);
        assert_eq!(metrics.dropped(), 0);
        assert!(metrics.drop_rate().abs() < f64::EPSILON);
        assert!(metrics.last_drop_time().is_none());
    }

    #[test]
    fn test_metrics_to_json() {
        let metrics = ForwardingMetrics::default();
        metrics.record_forward();
        metrics.record_forward();
        metrics.record_drop();

        let json = metrics.to_json();
        assert_eq!(json["forwarded"], 2);
        assert_eq!(json["dropped"], 1);
    }

    #[tokio::test]
    async fn test_forwards_until_full() {
        let (listener, mut rx) = ChannelListener::new(2);

        listener.on_event(&event());
        listener.on_event(&event());
        listener.on_event(&event());

        let metrics = listener.metrics();
        assert_eq!(metrics.forwarded(), 2);
        assert_eq!(metrics.dropped(), 1);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_counts_as_drop() {
        let (listener, rx) = ChannelListener::new(4);
        drop(rx);
        listener.on_event(&event());
        assert_eq!(listener.metrics().dropped(), 1);
    }
}
