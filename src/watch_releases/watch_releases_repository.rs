use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::watch_releases;

use super::watch_releases_model::{NewWatchRelease, WatchRelease};

pub struct WatchReleaseRepository;

impl WatchReleaseRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn create(
        &self,
        conn: &mut SqliteConnection,
        new_watch: &NewWatchRelease,
    ) -> Result<WatchRelease> {
        let created = diesel::insert_into(watch_releases::table)
            .values(new_watch)
            .get_result::<WatchRelease>(conn)?;
        Ok(created)
    }

    pub fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        watch_id: &str,
    ) -> Result<Option<WatchRelease>> {
        let watch = watch_releases::table
            .find(watch_id)
            .first::<WatchRelease>(conn)
            .optional()?;
        Ok(watch)
    }

    pub fn active_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<Vec<WatchRelease>> {
        let watches = watch_releases::table
            .filter(watch_releases::user_id.eq(user_id))
            .filter(watch_releases::is_active.eq(true))
            .order(watch_releases::created_at.asc())
            .load::<WatchRelease>(conn)?;
        Ok(watches)
    }

    pub fn set_active(
        &self,
        conn: &mut SqliteConnection,
        watch_id: &str,
        active: bool,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let updated = diesel::update(watch_releases::table.find(watch_id))
            .set((
                watch_releases::is_active.eq(active),
                watch_releases::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(updated)
    }
}
