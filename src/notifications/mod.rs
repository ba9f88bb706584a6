pub(crate) mod delivery;
pub(crate) mod notifications_errors;
pub(crate) mod notifications_model;
pub(crate) mod notifications_repository;
pub(crate) mod notifications_service;
pub(crate) mod outbox;
pub(crate) mod stream;

pub use delivery::{
    DeliveryOutcome, DeliveryQueue, DeliveryTask, EmailDelivery, InProcessQueue, LogOnlyEmail,
    RecordingQueue,
};
pub use notifications_errors::NotificationError;
pub use notifications_model::{
    DeliveryFrequency, NewNotification, NewOutboxMarker, NotificationChannel, NotificationDB,
    NotificationPreferences, NotificationStatus, OutboxMarker, OutboxState,
};
pub use notifications_repository::{
    NotificationRepository, OutboxRepository, PreferenceRepository,
};
pub use notifications_service::{
    is_within_quiet_hours, quiet_window_end, stream_payload, DeliveryService, DeliveryWorker,
    NotificationDispatcher,
};
pub use outbox::{OutboxDispatcher, OutboxRunStats};
pub use stream::StreamBroker;
