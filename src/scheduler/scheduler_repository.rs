use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::scheduler_locks;

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::scheduler_locks)]
#[diesel(primary_key(rule_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SchedulerLock {
    pub rule_id: String,
    pub locked_at: Option<NaiveDateTime>,
    pub cooldown_until: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::scheduler_locks)]
struct NewSchedulerLock {
    rule_id: String,
    locked_at: Option<NaiveDateTime>,
    cooldown_until: Option<NaiveDateTime>,
}

/// Persisted in-flight/cooldown guard, one row per rule. Claims run inside
/// a transaction; SQLite's single-writer discipline makes the
/// check-then-set atomic, and the rows keep multiple scheduler replicas
/// safe against double-running a rule.
pub struct SchedulerLockRepository;

impl SchedulerLockRepository {
    pub fn new() -> Self {
        Self
    }

    /// Try to claim a rule for execution. Returns false while another run
    /// holds the lock or the rule is cooling down; a lock older than
    /// `lock_timeout` is treated as abandoned and stolen.
    pub fn claim(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        now: NaiveDateTime,
        lock_timeout: Duration,
    ) -> Result<bool> {
        let existing = scheduler_locks::table
            .find(rule_id)
            .first::<SchedulerLock>(conn)
            .optional()?;

        match existing {
            None => {
                // The conflict path means another writer inserted the row
                // between our read and this insert; that writer holds it.
                let inserted = diesel::insert_into(scheduler_locks::table)
                    .values(&NewSchedulerLock {
                        rule_id: rule_id.to_string(),
                        locked_at: Some(now),
                        cooldown_until: None,
                    })
                    .on_conflict(scheduler_locks::rule_id)
                    .do_nothing()
                    .execute(conn)?;
                Ok(inserted > 0)
            }
            Some(lock) => {
                if let Some(locked_at) = lock.locked_at {
                    if now - locked_at < lock_timeout {
                        return Ok(false);
                    }
                }
                if let Some(cooldown_until) = lock.cooldown_until {
                    if now < cooldown_until {
                        return Ok(false);
                    }
                }
                diesel::update(scheduler_locks::table.find(rule_id))
                    .set((
                        scheduler_locks::locked_at.eq(Some(now)),
                        scheduler_locks::cooldown_until.eq(None::<NaiveDateTime>),
                    ))
                    .execute(conn)?;
                Ok(true)
            }
        }
    }

    /// Release after a run completes, starting the cooldown window.
    pub fn release(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
        now: NaiveDateTime,
        cooldown: Duration,
    ) -> Result<()> {
        diesel::update(scheduler_locks::table.find(rule_id))
            .set((
                scheduler_locks::locked_at.eq(None::<NaiveDateTime>),
                scheduler_locks::cooldown_until.eq(Some(now + cooldown)),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn get(
        &self,
        conn: &mut SqliteConnection,
        rule_id: &str,
    ) -> Result<Option<SchedulerLock>> {
        let lock = scheduler_locks::table
            .find(rule_id)
            .first::<SchedulerLock>(conn)
            .optional()?;
        Ok(lock)
    }
}
