//! Scripted recovery actions and recording notifiers for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::notify::{Notification, Notifier};
use crate::recovery::{ActionType, ErrorContext, NextAction, RecoveryAction, RecoveryResult};

/// One scripted response of a [`ScriptedAction`].
#[derive(Debug, Clone)]
pub enum Step {
    /// Returns a result asking for `NextAction`.
    Answer(NextAction),
    /// Returns an error.
    Fail(String),
    /// Panics.
    Panic(String),
    /// Sleeps, then answers `Retry`.
    Sleep(Duration),
}

/// A recovery action that replays a script and counts its calls.
///
/// The last step repeats once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedAction {
    id: String,
    priority: u32,
    timeout: Duration,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: Mutex<usize>,
    attempts: Mutex<Vec<u32>>,
}

impl ScriptedAction {
    /// Creates an action that plays `steps` in order.
    #[must_use]
    pub fn new(id: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        let steps: VecDeque<Step> = steps.into_iter().collect();
        let last = steps.back().cloned().unwrap_or(Step::Answer(NextAction::Retry));
        Self {
            id: id.into(),
            priority: 100,
            timeout: Duration::from_secs(30),
            steps: Mutex::new(steps),
            last: Mutex::new(last),
            calls: Mutex::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `next`.
    #[must_use]
    pub fn always(id: impl Into<String>, next: NextAction) -> Self {
        Self::new(id, [Step::Answer(next)])
    }

    /// Always fails with `message`.
    #[must_use]
    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, [Step::Fail(message.into())])
    }

    /// Always panics.
    #[must_use]
    pub fn panicking(id: impl Into<String>) -> Self {
        let id = id.into();
        let message = format!("{id} exploded");
        Self::new(id, [Step::Panic(message)])
    }

    /// Always sleeps for `delay` before answering.
    #[must_use]
    pub fn slow(id: impl Into<String>, delay: Duration) -> Self {
        Self::new(id, [Step::Sleep(delay)])
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of executions so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    /// Attempt numbers seen, in call order.
    #[must_use]
    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock();
        match steps.pop_front() {
            Some(step) => {
                *self.last.lock() = step.clone();
                step
            }
            None => self.last.lock().clone(),
        }
    }
}

#[async_trait]
impl RecoveryAction for ScriptedAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn action_type(&self) -> ActionType {
        ActionType::Reset
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, ctx: &ErrorContext) -> anyhow::Result<RecoveryResult> {
        *self.calls.lock() += 1;
        self.attempts.lock().push(ctx.attempt);
        match self.next_step() {
            Step::Answer(next) => Ok(RecoveryResult::success(format!("{} answered", self.id), next)),
            Step::Fail(message) => Err(anyhow::anyhow!(message)),
            Step::Panic(message) => panic!("{message}"),
            Step::Sleep(delay) => {
                tokio::time::sleep(delay).await;
                Ok(RecoveryResult::success("woke up", NextAction::Retry))
            }
        }
    }
}

/// A notifier that keeps everything it is sent.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Titles received so far.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.sent.lock().push(notification.clone());
    }
}
