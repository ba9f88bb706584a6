use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::watch_search_rules;

use super::watch_rules_model::{NewWatchSearchRule, WatchSearchRule};

pub struct WatchRuleRepository;

impl WatchRuleRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn create(
        &self,
        conn: &mut SqliteConnection,
        rule: NewWatchSearchRule,
    ) -> Result<WatchSearchRule> {
        diesel::insert_into(watch_search_rules::table)
            .values(&rule)
            .execute(conn)?;

        let created = watch_search_rules::table
            .filter(watch_search_rules::id.eq(&rule.id))
            .first::<WatchSearchRule>(conn)?;
        Ok(created)
    }

    pub fn get_by_id(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
    ) -> Result<Option<WatchSearchRule>> {
        let rule = watch_search_rules::table
            .filter(watch_search_rules::id.eq(rule_id))
            .first::<WatchSearchRule>(conn)
            .optional()?;
        Ok(rule)
    }

    /// Active rules whose `next_run_at` has passed (or was never set),
    /// oldest-due first, bounded to cap per-tick load.
    ///
    /// SQLite sorts NULLs first on ascending order, so never-run rules are
    /// picked up ahead of everything else.
    pub fn due_rules(
        &self,
        conn: &mut SqliteConnection,
        now: NaiveDateTime,
        batch_size: i64,
    ) -> Result<Vec<WatchSearchRule>> {
        let rules = watch_search_rules::table
            .filter(watch_search_rules::is_active.eq(true))
            .filter(
                watch_search_rules::next_run_at
                    .is_null()
                    .or(watch_search_rules::next_run_at.le(now)),
            )
            .order(watch_search_rules::next_run_at.asc())
            .then_order_by(watch_search_rules::created_at.asc())
            .limit(batch_size)
            .load::<WatchSearchRule>(conn)?;
        Ok(rules)
    }

    /// Advance run timestamps after a run completes, success or failure,
    /// so a failing rule never polls tighter than its configured cadence.
    pub fn complete_run(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        now: NaiveDateTime,
        interval: Duration,
    ) -> Result<()> {
        diesel::update(watch_search_rules::table.filter(watch_search_rules::id.eq(rule_id)))
            .set((
                watch_search_rules::last_run_at.eq(Some(now)),
                watch_search_rules::next_run_at.eq(Some(now + interval)),
                watch_search_rules::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Soft-disable; the pipeline never hard-deletes rules.
    pub fn set_active(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        is_active: bool,
        now: NaiveDateTime,
    ) -> Result<()> {
        diesel::update(watch_search_rules::table.filter(watch_search_rules::id.eq(rule_id)))
            .set((
                watch_search_rules::is_active.eq(is_active),
                watch_search_rules::updated_at.eq(now),
            ))
            .execute(conn)?;
        Ok(())
    }
}

impl Default for WatchRuleRepository {
    fn default() -> Self {
        Self::new()
    }
}
