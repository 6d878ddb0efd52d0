//! Event delivery for pipeline lifecycle notifications.
//!
//! The [`EventBus`] is embedded in the monitor. Listeners implement
//! [`EventListener`] (closures work too) and are registered per
//! [`PipelineEventType`](crate::core::PipelineEventType).

mod bus;
mod forwarding;
mod listener;

pub use bus::{EventBus, ListenerId};
pub use forwarding::{ChannelListener, ForwardingMetrics};
pub use listener::{CollectingListener, EventListener, LoggingListener};
