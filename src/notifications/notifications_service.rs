use chrono::{DateTime, Duration, LocalResult, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::Result;
use crate::events::EventDB;
use crate::users::UserRepository;

use super::delivery::{DeliveryTask, EmailDelivery};
use super::notifications_model::{
    NewNotification, NewOutboxMarker, NotificationChannel, NotificationDB,
    NotificationPreferences,
};
use super::notifications_repository::{
    NotificationRepository, OutboxRepository, PreferenceRepository,
};
use super::stream::StreamBroker;

/// Half-open local-hour window check with wrap-around. Equal start and end
/// means the window covers the whole day.
pub fn is_within_quiet_hours(hour: u32, start: u32, end: u32) -> bool {
    if start == end {
        return true;
    }
    if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// UTC instant at which the quiet window containing `at` ends, or None
/// when `at` is outside the window.
pub fn quiet_window_end(at: DateTime<Utc>, tz: Tz, start: u32, end: u32) -> Option<DateTime<Utc>> {
    let local = at.with_timezone(&tz);
    if !is_within_quiet_hours(local.hour(), start, end) {
        return None;
    }
    let ends_tomorrow = if start == end {
        local.hour() >= end
    } else if start < end {
        false
    } else {
        // Wrapped window; the evening half ends tomorrow morning.
        local.hour() >= start
    };
    let mut end_date = local.date_naive();
    if ends_tomorrow {
        end_date = end_date.succ_opt()?;
    }
    let end_naive = end_date.and_hms_opt(end, 0, 0)?;
    let end_local = match tz.from_local_datetime(&end_naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // DST gap swallowed the wall-clock hour; take the next one.
        LocalResult::None => tz
            .from_local_datetime(&(end_naive + Duration::hours(1)))
            .earliest()?,
    };
    Some(end_local.with_timezone(&Utc))
}

/// Fans events out into per-channel notification rows plus their outbox
/// markers, all inside the caller's transaction. Disabled channels get no
/// row at all; quiet hours and cadence only push `deliver_after` forward.
pub struct NotificationDispatcher {
    notifications: NotificationRepository,
    preferences: PreferenceRepository,
    outbox: OutboxRepository,
    users: UserRepository,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            notifications: NotificationRepository::new(),
            preferences: PreferenceRepository::new(),
            outbox: OutboxRepository::new(),
            users: UserRepository::new(),
        }
    }

    pub fn enqueue_from_event(
        &self,
        conn: &mut SqliteConnection,
        event: &EventDB,
        now: DateTime<Utc>,
    ) -> Result<Vec<NotificationDB>> {
        let prefs = self
            .preferences
            .get_or_create(conn, &event.user_id, now.naive_utc())?;
        let tz = self.resolve_timezone(conn, &prefs, &event.user_id)?;

        let mut created = Vec::new();
        for channel in NotificationChannel::ALL {
            if !prefs.channel_enabled(channel) {
                continue;
            }
            let notification = self.notifications.insert(
                conn,
                &NewNotification::new(
                    &event.user_id,
                    &event.id,
                    &event.event_type,
                    channel,
                    now.naive_utc(),
                ),
            )?;
            let deliver_after =
                self.deliver_after(conn, &prefs, tz, &event.user_id, channel, now)?;
            self.outbox.insert(
                conn,
                &NewOutboxMarker::new(
                    &notification.id,
                    deliver_after.map(|d| d.naive_utc()),
                    now.naive_utc(),
                ),
            )?;
            debug!(
                "Notification {} queued on {} (deliver_after: {:?})",
                notification.id,
                channel.as_str(),
                deliver_after
            );
            created.push(notification);
        }
        Ok(created)
    }

    /// Preference override wins, then the user's profile timezone, then
    /// UTC. Unparseable names are logged and skipped, not fatal.
    fn resolve_timezone(
        &self,
        conn: &mut SqliteConnection,
        prefs: &NotificationPreferences,
        user_id: &str,
    ) -> Result<Tz> {
        let profile_tz = self.users.get_timezone(conn, user_id)?;
        for candidate in [prefs.timezone_override.as_deref(), profile_tz.as_deref()]
            .into_iter()
            .flatten()
        {
            match Tz::from_str(candidate) {
                Ok(tz) => return Ok(tz),
                Err(_) => warn!("Ignoring invalid timezone {:?} for user {}", candidate, user_id),
            }
        }
        Ok(Tz::UTC)
    }

    fn deliver_after(
        &self,
        conn: &mut SqliteConnection,
        prefs: &NotificationPreferences,
        tz: Tz,
        user_id: &str,
        channel: NotificationChannel,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut defer: Option<DateTime<Utc>> = None;

        if let Some((start, end)) = prefs.quiet_hours() {
            defer = quiet_window_end(now, tz, start, end);
        }

        if let Some(interval) = prefs.frequency().interval() {
            if let Some(last) = self
                .notifications
                .last_successful_send(conn, user_id, channel)?
            {
                let next = Utc.from_utc_datetime(&last) + interval;
                if next > now {
                    defer = Some(defer.map_or(next, |d| d.max(next)));
                }
            }
        }

        // Cadence may push delivery into a quiet window; the window wins.
        if let Some(candidate) = defer {
            if let Some((start, end)) = prefs.quiet_hours() {
                if let Some(window_end) = quiet_window_end(candidate, tz, start, end) {
                    if window_end > candidate {
                        return Ok(Some(window_end));
                    }
                }
            }
        }
        Ok(defer)
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal delivery step: resolves a task back to its row and performs
/// the channel send, recording sent/failed state.
pub struct DeliveryService {
    notifications: NotificationRepository,
    users: UserRepository,
    email: Arc<dyn EmailDelivery>,
    broker: Arc<StreamBroker>,
}

impl DeliveryService {
    pub fn new(email: Arc<dyn EmailDelivery>, broker: Arc<StreamBroker>) -> Self {
        Self {
            notifications: NotificationRepository::new(),
            users: UserRepository::new(),
            email,
            broker,
        }
    }

    pub async fn process(
        &self,
        conn: &mut SqliteConnection,
        task: &DeliveryTask,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let notification = match self.notifications.get_by_id(conn, &task.notification_id)? {
            Some(n) => n,
            None => {
                // Race with a concurrent deletion; anomaly, not an error.
                warn!(
                    "Delivery task references missing notification {}",
                    task.notification_id
                );
                return Ok(());
            }
        };
        match notification.channel()? {
            NotificationChannel::Email => self.send_email(conn, &notification, now).await,
            NotificationChannel::Realtime => self.publish_realtime(conn, &notification, now),
        }
    }

    async fn send_email(
        &self,
        conn: &mut SqliteConnection,
        notification: &NotificationDB,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let address = self
            .users
            .get_by_id(conn, &notification.user_id)?
            .map(|u| u.email);
        let address = match address {
            Some(a) => a,
            None => {
                warn!(
                    "Notification {} belongs to missing user {}",
                    notification.id, notification.user_id
                );
                self.notifications
                    .mark_failed(conn, &notification.id, now.naive_utc())?;
                return Ok(());
            }
        };

        let subject = match notification.event_type.as_str() {
            "NEW_MATCH" => "New listing matched your watch",
            "LISTING_PRICE_DROP" => "Price drop on a watched listing",
            "LISTING_PRICE_RISE" => "Price change on a watched listing",
            other => other,
        };
        let body = format!("Notification {} ({})", notification.id, notification.event_type);

        let outcome = self.email.send(&address, subject, &body).await;
        if outcome.success {
            self.notifications
                .mark_sent(conn, &notification.id, now.naive_utc())?;
        } else {
            warn!(
                "Email delivery failed for notification {} (retryable: {}): {:?}",
                notification.id, outcome.retryable, outcome.error
            );
            self.notifications
                .mark_failed(conn, &notification.id, now.naive_utc())?;
        }
        Ok(())
    }

    fn publish_realtime(
        &self,
        conn: &mut SqliteConnection,
        notification: &NotificationDB,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let payload = stream_payload(notification);
        self.broker.publish(&notification.user_id, payload);
        self.notifications
            .mark_sent(conn, &notification.id, now.naive_utc())?;
        Ok(())
    }
}

/// Drains the in-process delivery queue, processing one task at a time
/// until the enqueue side closes.
pub struct DeliveryWorker {
    pool: Arc<crate::db::DbPool>,
    service: DeliveryService,
    clock: Arc<dyn crate::clock::Clock>,
}

impl DeliveryWorker {
    pub fn new(
        pool: Arc<crate::db::DbPool>,
        service: DeliveryService,
        clock: Arc<dyn crate::clock::Clock>,
    ) -> Self {
        Self {
            pool,
            service,
            clock,
        }
    }

    pub async fn run(&self, mut receiver: tokio::sync::mpsc::UnboundedReceiver<DeliveryTask>) {
        while let Some(task) = receiver.recv().await {
            match crate::db::get_connection(&self.pool) {
                Ok(mut conn) => {
                    if let Err(e) = self.service.process(&mut conn, &task, self.clock.now()).await
                    {
                        warn!("Delivery failed for {}: {}", task.notification_id, e);
                    }
                }
                Err(e) => warn!(
                    "No connection to deliver {}: {}",
                    task.notification_id, e
                ),
            }
        }
    }
}

/// Wire shape pushed to realtime subscribers, once per successful send.
pub fn stream_payload(notification: &NotificationDB) -> Value {
    json!({
        "notification_id": notification.id,
        "event_id": notification.event_id,
        "event_type": notification.event_type,
        "created_at": notification.created_at.and_utc().to_rfc3339(),
    })
}
