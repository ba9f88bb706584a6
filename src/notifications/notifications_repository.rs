use chrono::NaiveDateTime;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::{notification_outbox, notification_preferences, notifications};

use super::notifications_model::{
    NewNotification, NewOutboxMarker, NotificationChannel, NotificationDB,
    NotificationPreferences, NotificationStatus, OutboxMarker, OutboxState,
};

pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn insert(
        &self,
        conn: &mut SqliteConnection,
        notification: &NewNotification,
    ) -> Result<NotificationDB> {
        let created = diesel::insert_into(notifications::table)
            .values(notification)
            .get_result::<NotificationDB>(conn)?;
        Ok(created)
    }

    pub fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
    ) -> Result<Option<NotificationDB>> {
        let row = notifications::table
            .find(notification_id)
            .first::<NotificationDB>(conn)
            .optional()?;
        Ok(row)
    }

    pub fn mark_sent(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let updated = diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::status.eq(NotificationStatus::Sent.as_str()),
                notifications::sent_at.eq(Some(now)),
                notifications::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(updated)
    }

    pub fn mark_failed(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let updated = diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::status.eq(NotificationStatus::Failed.as_str()),
                notifications::failed_at.eq(Some(now)),
                notifications::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(updated)
    }

    /// Timestamp of the most recent successful delivery on a channel.
    /// Anchors the cadence deferral for hourly/daily frequencies.
    pub fn last_successful_send(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        channel: NotificationChannel,
    ) -> Result<Option<NaiveDateTime>> {
        let latest = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::channel.eq(channel.as_str()))
            .filter(notifications::status.eq(NotificationStatus::Sent.as_str()))
            .select(max(notifications::sent_at))
            .first::<Option<NaiveDateTime>>(conn)?;
        Ok(latest)
    }

    pub fn pending_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<Vec<NotificationDB>> {
        let rows = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::status.eq(NotificationStatus::Pending.as_str()))
            .order(notifications::created_at.asc())
            .load::<NotificationDB>(conn)?;
        Ok(rows)
    }
}

pub struct PreferenceRepository;

impl PreferenceRepository {
    pub fn new() -> Self {
        Self
    }

    /// Load a user's preferences, creating the default row on first touch.
    pub fn get_or_create(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        now: NaiveDateTime,
    ) -> Result<NotificationPreferences> {
        if let Some(prefs) = notification_preferences::table
            .find(user_id)
            .first::<NotificationPreferences>(conn)
            .optional()?
        {
            return Ok(prefs);
        }
        let defaults = NotificationPreferences::defaults(user_id, now);
        diesel::insert_into(notification_preferences::table)
            .values(&defaults)
            .on_conflict(notification_preferences::user_id)
            .do_nothing()
            .execute(conn)?;
        let prefs = notification_preferences::table
            .find(user_id)
            .first::<NotificationPreferences>(conn)?;
        Ok(prefs)
    }

    pub fn upsert(
        &self,
        conn: &mut SqliteConnection,
        prefs: &NotificationPreferences,
    ) -> Result<()> {
        diesel::insert_into(notification_preferences::table)
            .values(prefs)
            .on_conflict(notification_preferences::user_id)
            .do_update()
            .set((
                notification_preferences::email_enabled.eq(prefs.email_enabled),
                notification_preferences::realtime_enabled.eq(prefs.realtime_enabled),
                notification_preferences::delivery_frequency.eq(&prefs.delivery_frequency),
                notification_preferences::quiet_hours_start.eq(prefs.quiet_hours_start),
                notification_preferences::quiet_hours_end.eq(prefs.quiet_hours_end),
                notification_preferences::timezone_override.eq(&prefs.timezone_override),
                notification_preferences::updated_at.eq(prefs.updated_at),
            ))
            .execute(conn)?;
        Ok(())
    }
}

pub struct OutboxRepository;

impl OutboxRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn insert(&self, conn: &mut SqliteConnection, marker: &NewOutboxMarker) -> Result<()> {
        diesel::insert_into(notification_outbox::table)
            .values(marker)
            .execute(conn)?;
        Ok(())
    }

    /// Committed markers ready to enqueue: still pending and past any
    /// quiet-hours/cadence deferral.
    pub fn due_pending(
        &self,
        conn: &mut SqliteConnection,
        now: NaiveDateTime,
        limit: i64,
    ) -> Result<Vec<OutboxMarker>> {
        let rows = notification_outbox::table
            .filter(notification_outbox::state.eq(OutboxState::Pending.as_str()))
            .filter(
                notification_outbox::deliver_after
                    .is_null()
                    .or(notification_outbox::deliver_after.le(now)),
            )
            .order(notification_outbox::created_at.asc())
            .limit(limit)
            .load::<OutboxMarker>(conn)?;
        Ok(rows)
    }

    pub fn mark_dispatched(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let updated = diesel::update(notification_outbox::table.find(notification_id))
            .set((
                notification_outbox::state.eq(OutboxState::Dispatched.as_str()),
                notification_outbox::dispatched_at.eq(Some(now)),
            ))
            .execute(conn)?;
        Ok(updated)
    }

    /// Enqueue failed; leave the marker pending for the next boundary.
    pub fn record_attempt(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
    ) -> Result<usize> {
        let updated = diesel::update(notification_outbox::table.find(notification_id))
            .set(notification_outbox::attempts.eq(notification_outbox::attempts + 1))
            .execute(conn)?;
        Ok(updated)
    }

    pub fn get(
        &self,
        conn: &mut SqliteConnection,
        notification_id: &str,
    ) -> Result<Option<OutboxMarker>> {
        let row = notification_outbox::table
            .find(notification_id)
            .first::<OutboxMarker>(conn)
            .optional()?;
        Ok(row)
    }
}
