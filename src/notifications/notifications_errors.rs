use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    /// Broker unreachable at enqueue time. Retried at the next commit
    /// boundary or sweep, never discarded.
    #[error("Failed to enqueue delivery task: {0}")]
    EnqueueFailed(String),

    #[error("Unknown notification channel: {0}")]
    InvalidChannel(String),
}
