use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, ValidationError};
use crate::providers::SearchQuery;

/// Saved search / alert rule.
///
/// The query blob is stored normalized (lower-cased keywords and sources)
/// so matching and adapters never re-normalize.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_search_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct WatchSearchRule {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub query: String,
    pub is_active: bool,
    pub poll_interval_seconds: i32,
    pub last_run_at: Option<NaiveDateTime>,
    pub next_run_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WatchSearchRule {
    pub fn parsed_query(&self) -> Result<SearchQuery> {
        let query = serde_json::from_str(&self.query)?;
        Ok(query)
    }

    /// Configured sources, or the supplied defaults when the rule names none.
    pub fn sources_or<'a>(&self, query: &SearchQuery, defaults: &'a [String]) -> Vec<String> {
        let sources = query.normalized_sources();
        if sources.is_empty() {
            defaults.to_vec()
        } else {
            sources
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::seconds(self.poll_interval_seconds.max(1) as i64)
    }
}

#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_search_rules)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchSearchRule {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub query: String,
    pub is_active: bool,
    pub poll_interval_seconds: i32,
    pub last_run_at: Option<NaiveDateTime>,
    pub next_run_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewWatchSearchRule {
    /// Validates and case-normalizes the query before it is persisted.
    pub fn new(
        user_id: &str,
        name: &str,
        query: SearchQuery,
        poll_interval_seconds: i32,
        now: NaiveDateTime,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if poll_interval_seconds <= 0 {
            return Err(ValidationError::InvalidInput(
                "poll_interval_seconds must be positive".to_string(),
            )
            .into());
        }

        let normalized = SearchQuery {
            keywords: query.normalized_keywords(),
            sources: query.normalized_sources(),
            currency: query
                .currency
                .as_deref()
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            ..query
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.trim().to_string(),
            query: serde_json::to_string(&normalized)?,
            is_active: true,
            poll_interval_seconds,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}
