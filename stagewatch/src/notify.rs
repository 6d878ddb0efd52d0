//! Notification transports.
//!
//! The monitor and the error handler hand notable outcomes to a [`Notifier`].
//! Email and desktop delivery are outside this crate; [`LogNotifier`] records
//! what would have been sent on each enabled channel. With the `webhook`
//! feature, [`WebhookNotifier`] POSTs the notification as JSON.

use crate::core::Severity;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Which notification channels are enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Send email notifications.
    pub email: bool,
    /// POST notifications to this URL.
    pub webhook: Option<String>,
    /// Show desktop notifications.
    pub desktop: bool,
}

impl NotificationSettings {
    /// Returns true if any channel is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.email || self.desktop || self.webhook.is_some()
    }
}

/// A message for a human operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Urgency.
    pub severity: Severity,
    /// Pipeline the notification concerns.
    pub pipeline_id: String,
    /// Stage the notification concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    /// When the notification was created.
    pub timestamp: Timestamp,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        pipeline_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            pipeline_id: pipeline_id.into(),
            stage_id: None,
            timestamp: now_utc(),
        }
    }

    /// Attaches a stage id.
    #[must_use]
    pub fn for_stage(mut self, stage_id: impl Into<String>) -> Self {
        self.stage_id = Some(stage_id.into());
        self
    }
}

/// Delivers notifications. Implementations must not block.
pub trait Notifier: Send + Sync {
    /// Delivers one notification, best effort.
    fn notify(&self, notification: &Notification);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _notification: &Notification) {}
}

/// Logs one line per enabled channel.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    settings: NotificationSettings,
}

impl LogNotifier {
    /// Creates a log notifier for the given channels.
    #[must_use]
    pub fn new(settings: NotificationSettings) -> Self {
        Self { settings }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, n: &Notification) {
        let mut channels = Vec::new();
        if self.settings.email {
            channels.push("email");
        }
        if self.settings.desktop {
            channels.push("desktop");
        }
        if self.settings.webhook.is_some() {
            channels.push("webhook");
        }
        if channels.is_empty() {
            return;
        }
        if n.severity >= Severity::High {
            warn!(
                pipeline_id = %n.pipeline_id,
                stage_id = ?n.stage_id,
                channels = ?channels,
                "Notification: {} - {}", n.title, n.message
            );
        } else {
            info!(
                pipeline_id = %n.pipeline_id,
                stage_id = ?n.stage_id,
                channels = ?channels,
                "Notification: {} - {}", n.title, n.message
            );
        }
    }
}

/// POSTs notifications to a webhook URL on the current tokio runtime.
#[cfg(feature = "webhook")]
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

#[cfg(feature = "webhook")]
impl WebhookNotifier {
    /// Creates a webhook notifier.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "webhook")]
impl Notifier for WebhookNotifier {
    fn notify(&self, notification: &Notification) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(url = %self.url, "No async runtime available, webhook notification dropped");
            return;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        let body = notification.clone();
        handle.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    warn!(url = %url, status = %resp.status(), "Webhook notification rejected");
                }
                Ok(_) => {}
                Err(e) => warn!(url = %url, error = %e, "Webhook notification failed"),
            }
        });
    }
}

/// Fans a notification out to several notifiers.
#[derive(Default)]
pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notifier.
    #[must_use]
    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Returns the number of wrapped notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Returns true if nothing is wrapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Notifier for CompositeNotifier {
    fn notify(&self, notification: &Notification) {
        for notifier in &self.notifiers {
            notifier.notify(notification);
        }
    }
}

/// Builds the notifier implied by a settings block.
#[must_use]
pub fn notifier_for(settings: &NotificationSettings) -> Arc<dyn Notifier> {
    if !settings.any_enabled() {
        return Arc::new(NoOpNotifier);
    }
    let composite = CompositeNotifier::new().with(Arc::new(LogNotifier::new(settings.clone())));
    Arc::new(with_webhook(composite, settings))
}

#[cfg(feature = "webhook")]
fn with_webhook(composite: CompositeNotifier, settings: &NotificationSettings) -> CompositeNotifier {
    match &settings.webhook {
        Some(url) => composite.with(Arc::new(WebhookNotifier::new(url.clone()))),
        None => composite,
    }
}

#[cfg(not(feature = "webhook"))]
fn with_webhook(composite: CompositeNotifier, _settings: &NotificationSettings) -> CompositeNotifier {
    composite
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Notification>>);

    impl Notifier for Recording {
        fn notify(&self, notification: &Notification) {
            self.0.lock().push(notification.clone());
        }
    }

    #[test]
    fn test_settings_any_enabled() {
        assert!(!NotificationSettings::default().any_enabled());
        let settings = NotificationSettings {
            desktop: true,
            ..NotificationSettings::default()
        };
        assert!(settings.any_enabled());
    }

    #[test]
    fn test_composite_fans_out() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let composite = CompositeNotifier::new().with(a.clone()).with(b.clone());

        composite.notify(&Notification::new("t", "m", Severity::Low, "p1").for_stage("s"));

        assert_eq!(a.0.lock().len(), 1);
        assert_eq!(b.0.lock()[0].stage_id.as_deref(), Some("s"));
    }

    #[test]
    fn test_log_notifier_does_not_panic() {
        let notifier = LogNotifier::new(NotificationSettings {
            email: true,
            desktop: true,
            webhook: None,
        });
        notifier.notify(&Notification::new("Pipeline failed", "boom", Severity::Critical, "p1"));
        notifier.notify(&Notification::new("Pipeline done", "ok", Severity::Low, "p1"));
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: NotificationSettings = serde_json::from_str(r#"{"email": true}"#).unwrap();
        assert!(settings.email);
        assert!(settings.webhook.is_none());
    }
}
