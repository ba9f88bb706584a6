use chrono::Duration as ChronoDuration;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::clock::Clock;
use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::{Error, Result};
use crate::notifications::OutboxDispatcher;
use crate::runner::{RuleRunner, RunOutcome};
use crate::settings::SchedulerSettings;
use crate::watch_rules::WatchRuleRepository;

use super::scheduler_repository::SchedulerLockRepository;

/// Per-tick counters surfaced to observability. The core computes these
/// and logs them; metric transport lives with an external collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerHealth {
    pub due: usize,
    pub claimed: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub run_errors: usize,
    /// Worst freshness lag seen this tick, in seconds.
    pub max_lag_seconds: i64,
}

/// Fixed-interval tick loop. Each tick selects oldest-due rules, claims
/// them through the persisted lock table, and runs them concurrently up to
/// the configured ceiling.
pub struct SchedulerService {
    pool: Arc<DbPool>,
    runner: Arc<RuleRunner>,
    outbox: Arc<OutboxDispatcher>,
    rules: WatchRuleRepository,
    locks: SchedulerLockRepository,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    permits: Arc<Semaphore>,
}

impl SchedulerService {
    pub fn new(
        pool: Arc<DbPool>,
        runner: Arc<RuleRunner>,
        outbox: Arc<OutboxDispatcher>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_runs.max(1)));
        Self {
            pool,
            runner,
            outbox,
            rules: WatchRuleRepository::new(),
            locks: SchedulerLockRepository::new(),
            clock,
            settings,
            permits,
        }
    }

    pub async fn run_forever(&self) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.settings.tick_interval_seconds.max(1)));
        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(health) => info!(
                    "Scheduler tick: {} due, {} claimed, {} skipped, {} ok, {} failed, lag {}s",
                    health.due,
                    health.claimed,
                    health.skipped,
                    health.succeeded,
                    health.failed,
                    health.max_lag_seconds
                ),
                // Tick aborts cleanly; the next interval retries.
                Err(e) => error!("Scheduler tick aborted: {}", e),
            }
        }
    }

    pub async fn tick(&self) -> Result<SchedulerHealth> {
        let now = self.clock.now();
        let mut health = SchedulerHealth::default();

        let mut conn = crate::db::get_connection(&self.pool)
            .map_err(|e| Error::SchedulerTick(e.to_string()))?;
        let due = self
            .rules
            .due_rules(&mut conn, now.naive_utc(), self.settings.batch_size)
            .map_err(|e| Error::SchedulerTick(e.to_string()))?;
        drop(conn);
        health.due = due.len();

        let lock_timeout = ChronoDuration::seconds(self.settings.lock_timeout_seconds);
        let cooldown = ChronoDuration::seconds(self.settings.cooldown_seconds);

        let mut handles = Vec::new();
        for rule in due {
            let rule_id = rule.id.clone();
            let claimed = self.pool.execute(|conn| {
                self.locks.claim(conn, &rule_id, now.naive_utc(), lock_timeout)
            });
            match claimed {
                Ok(true) => {}
                Ok(false) => {
                    health.skipped += 1;
                    continue;
                }
                Err(e) => {
                    // SQLite contention on one rule's lock must not starve
                    // the rest of the batch.
                    warn!("Failed to claim lock for rule {}: {}", rule.id, e);
                    health.run_errors += 1;
                    continue;
                }
            }
            health.claimed += 1;

            if let Some(next_run_at) = rule.next_run_at {
                let lag = (now.naive_utc() - next_run_at).num_seconds();
                if lag > health.max_lag_seconds {
                    health.max_lag_seconds = lag;
                }
                info!("Rule {} starting with freshness lag {}s", rule.id, lag);
            }

            let runner = self.runner.clone();
            let pool = self.pool.clone();
            let clock = self.clock.clone();
            let permits = self.permits.clone();
            handles.push(tokio::spawn(async move {
                // Closed semaphore would mean shutdown; treat as a skip.
                let _permit = match permits.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return None,
                };
                let outcome = runner.run_rule_once(&rule).await;

                let locks = SchedulerLockRepository::new();
                let release = pool.execute(|conn| {
                    locks.release(conn, &rule.id, clock.now().naive_utc(), cooldown)
                });
                if let Err(e) = release {
                    warn!("Failed to release lock for rule {}: {}", rule.id, e);
                }
                Some(outcome)
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(Some(Ok(summary))) => match summary.outcome {
                    RunOutcome::Success => health.succeeded += 1,
                    RunOutcome::Failed => health.failed += 1,
                },
                Ok(Some(Err(e))) => {
                    // Isolated per rule; the tick itself carries on.
                    warn!("Rule run errored: {}", e);
                    health.run_errors += 1;
                }
                Ok(None) => health.skipped += 1,
                Err(e) => {
                    warn!("Rule run task panicked or was cancelled: {}", e);
                    health.run_errors += 1;
                }
            }
        }

        // Straggler pass: markers left pending by a broker outage or whose
        // quiet/cadence deferral has elapsed since their boundary dispatch.
        let sweep_now = self.clock.now();
        match crate::db::get_connection(&self.pool) {
            Ok(mut conn) => {
                if let Err(e) = self.outbox.sweep(&mut conn, sweep_now).await {
                    warn!("Outbox sweep failed: {}", e);
                }
            }
            Err(e) => warn!("No connection for outbox sweep: {}", e),
        }

        Ok(health)
    }
}
