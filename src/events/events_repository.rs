use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::events;

use super::events_model::{EventDB, NewEvent};

pub struct EventRepository;

impl EventRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn insert(&self, conn: &mut SqliteConnection, event: &NewEvent) -> Result<EventDB> {
        let created = diesel::insert_into(events::table)
            .values(event)
            .get_result::<EventDB>(conn)?;
        Ok(created)
    }

    pub fn get_by_id(&self, conn: &mut SqliteConnection, event_id: &str) -> Result<Option<EventDB>> {
        let event = events::table
            .find(event_id)
            .first::<EventDB>(conn)
            .optional()?;
        Ok(event)
    }

    /// Latest event for a (rule, listing) pairing. New-match and price-change
    /// detection both key off this row: no row means the pairing has never
    /// matched, and its payload carries the last reported price.
    pub fn latest_event_for_rule(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        listing_id: &str,
    ) -> Result<Option<EventDB>> {
        let event = events::table
            .filter(events::rule_id.eq(rule_id))
            .filter(events::listing_id.eq(listing_id))
            .order(events::created_at.desc())
            .first::<EventDB>(conn)
            .optional()?;
        Ok(event)
    }

    pub fn latest_event_for_watch(
        &self,
        conn: &mut SqliteConnection,
        watch_release_id: &str,
        listing_id: &str,
    ) -> Result<Option<EventDB>> {
        let event = events::table
            .filter(events::watch_release_id.eq(watch_release_id))
            .filter(events::listing_id.eq(listing_id))
            .order(events::created_at.desc())
            .first::<EventDB>(conn)
            .optional()?;
        Ok(event)
    }

    pub fn events_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<EventDB>> {
        let rows = events::table
            .filter(events::user_id.eq(user_id))
            .order(events::created_at.desc())
            .limit(limit)
            .load::<EventDB>(conn)?;
        Ok(rows)
    }

    pub fn count_by_type(
        &self,
        conn: &mut SqliteConnection,
        event_type: &str,
    ) -> Result<i64> {
        let count = events::table
            .filter(events::event_type.eq(event_type))
            .count()
            .get_result::<i64>(conn)?;
        Ok(count)
    }
}
