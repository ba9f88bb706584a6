use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notifications_errors::NotificationError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Realtime,
}

impl NotificationChannel {
    pub const ALL: [NotificationChannel; 2] =
        [NotificationChannel::Email, NotificationChannel::Realtime];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Realtime => "realtime",
        }
    }

    pub fn parse(value: &str) -> Result<Self, NotificationError> {
        match value {
            "email" => Ok(NotificationChannel::Email),
            "realtime" => Ok(NotificationChannel::Realtime),
            other => Err(NotificationError::InvalidChannel(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }
}

impl From<&str> for NotificationStatus {
    fn from(value: &str) -> Self {
        match value {
            "sent" => NotificationStatus::Sent,
            "failed" => NotificationStatus::Failed,
            _ => NotificationStatus::Pending,
        }
    }
}

/// How often a user wants a channel to actually deliver. Non-instant
/// cadences batch pending notifications against the last successful send.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFrequency {
    Instant,
    Hourly,
    Daily,
}

impl DeliveryFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryFrequency::Instant => "instant",
            DeliveryFrequency::Hourly => "hourly",
            DeliveryFrequency::Daily => "daily",
        }
    }

    pub fn interval(&self) -> Option<chrono::Duration> {
        match self {
            DeliveryFrequency::Instant => None,
            DeliveryFrequency::Hourly => Some(chrono::Duration::hours(1)),
            DeliveryFrequency::Daily => Some(chrono::Duration::days(1)),
        }
    }
}

impl From<&str> for DeliveryFrequency {
    fn from(value: &str) -> Self {
        match value {
            "hourly" => DeliveryFrequency::Hourly,
            "daily" => DeliveryFrequency::Daily,
            _ => DeliveryFrequency::Instant,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct NotificationDB {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub event_type: String,
    pub channel: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
    pub failed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl NotificationDB {
    pub fn status(&self) -> NotificationStatus {
        NotificationStatus::from(self.status.as_str())
    }

    pub fn channel(&self) -> Result<NotificationChannel, NotificationError> {
        NotificationChannel::parse(&self.channel)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub event_type: String,
    pub channel: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
    pub failed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl NewNotification {
    pub fn new(
        user_id: &str,
        event_id: &str,
        event_type: &str,
        channel: NotificationChannel,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            channel: channel.as_str().to_string(),
            status: NotificationStatus::Pending.as_str().to_string(),
            created_at: now,
            sent_at: None,
            failed_at: None,
            updated_at: now,
        }
    }
}

/// Per-user delivery policy. One row per user, created lazily with
/// defaults the first time an event fans out.
#[derive(Queryable, Identifiable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::notification_preferences)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub user_id: String,
    pub email_enabled: bool,
    pub realtime_enabled: bool,
    pub delivery_frequency: String,
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    pub timezone_override: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NotificationPreferences {
    pub fn defaults(user_id: &str, now: NaiveDateTime) -> Self {
        Self {
            user_id: user_id.to_string(),
            email_enabled: true,
            realtime_enabled: true,
            delivery_frequency: DeliveryFrequency::Instant.as_str().to_string(),
            quiet_hours_start: None,
            quiet_hours_end: None,
            timezone_override: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn channel_enabled(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::Email => self.email_enabled,
            NotificationChannel::Realtime => self.realtime_enabled,
        }
    }

    pub fn frequency(&self) -> DeliveryFrequency {
        DeliveryFrequency::from(self.delivery_frequency.as_str())
    }

    pub fn quiet_hours(&self) -> Option<(u32, u32)> {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(start), Some(end)) if (0..24).contains(&start) && (0..24).contains(&end) => {
                Some((start as u32, end as u32))
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
    Pending,
    Dispatched,
}

impl OutboxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxState::Pending => "pending",
            OutboxState::Dispatched => "dispatched",
        }
    }
}

/// Enqueue-pending marker written in the same transaction as its
/// notification. The dispatcher only ever enqueues from committed markers,
/// which is what makes dispatch safe against rollbacks.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::notification_outbox)]
#[diesel(primary_key(notification_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct OutboxMarker {
    pub notification_id: String,
    pub state: String,
    pub deliver_after: Option<NaiveDateTime>,
    pub attempts: i32,
    pub created_at: NaiveDateTime,
    pub dispatched_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::notification_outbox)]
pub struct NewOutboxMarker {
    pub notification_id: String,
    pub state: String,
    pub deliver_after: Option<NaiveDateTime>,
    pub attempts: i32,
    pub created_at: NaiveDateTime,
    pub dispatched_at: Option<NaiveDateTime>,
}

impl NewOutboxMarker {
    pub fn new(notification_id: &str, deliver_after: Option<NaiveDateTime>, now: NaiveDateTime) -> Self {
        Self {
            notification_id: notification_id.to_string(),
            state: OutboxState::Pending.as_str().to_string(),
            deliver_after,
            attempts: 0,
            created_at: now,
            dispatched_at: None,
        }
    }
}
