use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::watch_matches;

use super::matching_model::{NewWatchMatch, WatchMatchDB};

pub struct WatchMatchRepository;

impl WatchMatchRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insert the first-match marker for a (rule, listing) pairing.
    /// Returns true when this call created the marker, false when the
    /// pairing had already matched before.
    pub fn insert_if_absent(
        &self,
        conn: &mut SqliteConnection,
        new_match: &NewWatchMatch,
    ) -> Result<bool> {
        let inserted = diesel::insert_into(watch_matches::table)
            .values(new_match)
            .on_conflict((watch_matches::rule_id, watch_matches::listing_id))
            .do_nothing()
            .execute(conn)?;
        Ok(inserted > 0)
    }

    pub fn get_for_pairing(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        listing_id: &str,
    ) -> Result<Option<WatchMatchDB>> {
        let row = watch_matches::table
            .filter(watch_matches::rule_id.eq(rule_id))
            .filter(watch_matches::listing_id.eq(listing_id))
            .first::<WatchMatchDB>(conn)
            .optional()?;
        Ok(row)
    }

    pub fn matches_for_rule(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
    ) -> Result<Vec<WatchMatchDB>> {
        let rows = watch_matches::table
            .filter(watch_matches::rule_id.eq(rule_id))
            .order(watch_matches::matched_at.desc())
            .load::<WatchMatchDB>(conn)?;
        Ok(rows)
    }
}
