use async_trait::async_trait;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::notifications_errors::NotificationError;

/// Unit of delivery work handed to the broker. Deliberately thin: the
/// worker re-reads the notification row, so a stale task cannot resurrect
/// deleted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTask {
    pub notification_id: String,
}

/// Broker boundary. The outbox dispatcher enqueues through this trait and
/// treats any error as retryable.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn enqueue(&self, task: DeliveryTask) -> Result<(), NotificationError>;
}

/// In-process queue over an unbounded tokio channel. The receive side is
/// handed to a delivery worker at startup.
pub struct InProcessQueue {
    sender: mpsc::UnboundedSender<DeliveryTask>,
}

impl InProcessQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl DeliveryQueue for InProcessQueue {
    async fn enqueue(&self, task: DeliveryTask) -> Result<(), NotificationError> {
        self.sender
            .send(task)
            .map_err(|_| NotificationError::EnqueueFailed("delivery channel closed".to_string()))
    }
}

/// Test double: records every enqueued task and can be toggled into a
/// failing state to exercise the retry path.
#[derive(Default)]
pub struct RecordingQueue {
    failing: AtomicBool,
    tasks: Mutex<Vec<DeliveryTask>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn tasks(&self) -> Vec<DeliveryTask> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeliveryQueue for RecordingQueue {
    async fn enqueue(&self, task: DeliveryTask) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::EnqueueFailed(
                "broker unreachable".to_string(),
            ));
        }
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(task);
        }
        Ok(())
    }
}

/// Result of one email provider call.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub retryable: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(provider_message_id: String) -> Self {
        Self {
            success: true,
            retryable: false,
            provider_message_id: Some(provider_message_id),
            error: None,
        }
    }

    pub fn rejected(error: String, retryable: bool) -> Self {
        Self {
            success: false,
            retryable,
            provider_message_id: None,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait EmailDelivery: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> DeliveryOutcome;
}

/// Default email backend: logs the message and reports success. Real
/// provider integrations replace this behind the same trait.
pub struct LogOnlyEmail;

#[async_trait]
impl EmailDelivery for LogOnlyEmail {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> DeliveryOutcome {
        let message_id = Uuid::new_v4().to_string();
        info!("Email to {}: {} ({})", to, subject, message_id);
        DeliveryOutcome::delivered(message_id)
    }
}
