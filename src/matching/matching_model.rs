use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First-match marker for a (rule, listing) pairing. The unique index on
/// the pair makes "has this rule ever matched this listing" a single
/// conflict-checked insert.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_matches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct WatchMatchDB {
    pub id: String,
    pub rule_id: String,
    pub listing_id: String,
    pub matched_at: NaiveDateTime,
    pub match_context: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_matches)]
pub struct NewWatchMatch {
    pub id: String,
    pub rule_id: String,
    pub listing_id: String,
    pub matched_at: NaiveDateTime,
    pub match_context: Option<String>,
}

impl NewWatchMatch {
    pub fn new(rule_id: &str, listing_id: &str, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.to_string(),
            listing_id: listing_id.to_string(),
            matched_at: now,
            match_context: None,
        }
    }
}

/// Per-run counters reported back to the runner and, from there, into the
/// scheduler's health telemetry.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub fetched: usize,
    pub listings_created: usize,
    pub snapshots_created: usize,
    pub matches_created: usize,
    pub events_created: usize,
    pub notifications_created: usize,
}
