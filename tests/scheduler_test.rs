use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use diesel::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

use waxwatch_core::clock::{Clock, ManualClock};
use waxwatch_core::matching::MatchingService;
use waxwatch_core::notifications::{
    NotificationDispatcher, NotificationRepository, OutboxDispatcher, OutboxRepository,
    RecordingQueue,
};
use waxwatch_core::providers::{
    NormalizedListing, PaginationModel, ProviderCapabilityContract, ProviderClient, ProviderError,
    ProviderRegistry, ProviderRequestRepository, SearchQuery,
};
use waxwatch_core::runner::{ProviderRunStatus, RuleRunner, RunOutcome};
use waxwatch_core::scheduler::{SchedulerLockRepository, SchedulerService};
use waxwatch_core::settings::{ProviderSettings, SchedulerSettings};
use waxwatch_core::watch_rules::WatchRuleRepository;

mod common;

struct BustedProvider;

#[async_trait]
impl ProviderClient for BustedProvider {
    fn id(&self) -> &'static str {
        "busted"
    }

    fn default_endpoint(&self) -> &'static str {
        "https://busted.example/search"
    }

    fn capability_contract(&self) -> ProviderCapabilityContract {
        ProviderCapabilityContract {
            supports_search: true,
            requires_auth: false,
            pagination_model: PaginationModel::None,
        }
    }

    async fn search(
        &self,
        _query: &SearchQuery,
        _limit: u32,
    ) -> Result<Vec<NormalizedListing>, ProviderError> {
        Err(ProviderError::Http {
            provider: "busted".to_string(),
            status: 503,
            message: "service unavailable".to_string(),
        })
    }
}

fn provider_settings(extra: &[&str]) -> ProviderSettings {
    let mut settings = ProviderSettings::default();
    for provider in extra {
        settings.enabled.insert(provider.to_string(), true);
    }
    // Keep retries fast in tests.
    let mut retry = waxwatch_core::settings::RetrySettings::default();
    retry.max_attempts = 2;
    retry.base_delay_ms = 1;
    retry.max_delay_ms = 2;
    for provider in ["mock", "busted"] {
        settings.retry.insert(provider.to_string(), retry);
    }
    settings
}

fn build_runner(
    pool: Arc<waxwatch_core::db::DbPool>,
    registry: ProviderRegistry,
    clock: Arc<ManualClock>,
) -> (Arc<RuleRunner>, Arc<OutboxDispatcher>, Arc<RecordingQueue>) {
    let queue = Arc::new(RecordingQueue::new());
    let outbox = Arc::new(OutboxDispatcher::new(queue.clone()));
    let matching = Arc::new(MatchingService::new(Arc::new(NotificationDispatcher::new())));
    let runner = Arc::new(RuleRunner::new(
        pool,
        Arc::new(registry),
        matching,
        outbox.clone(),
        clock,
        20,
    ));
    (runner, outbox, queue)
}

#[test]
fn second_claim_is_rejected_while_a_run_is_in_flight() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);
    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(&mut conn, "u-1", common::search_query(&["mock"], &[], None));

    let locks = SchedulerLockRepository::new();
    let now = common::utc(2026, 6, 2, 9, 0).naive_utc();
    let timeout = ChronoDuration::seconds(600);

    assert!(locks.claim(&mut conn, &rule.id, now, timeout).unwrap());
    assert!(!locks.claim(&mut conn, &rule.id, now, timeout).unwrap());

    // Cooldown blocks an immediate re-claim after release.
    locks
        .release(&mut conn, &rule.id, now, ChronoDuration::seconds(30))
        .unwrap();
    let lock = locks.get(&mut conn, &rule.id).unwrap().unwrap();
    assert!(lock.locked_at.is_none());
    assert_eq!(lock.cooldown_until, Some(now + ChronoDuration::seconds(30)));
    assert!(!locks
        .claim(&mut conn, &rule.id, now + ChronoDuration::seconds(10), timeout)
        .unwrap());
    assert!(locks
        .claim(&mut conn, &rule.id, now + ChronoDuration::seconds(31), timeout)
        .unwrap());
}

#[test]
fn abandoned_lock_is_stolen_after_the_timeout() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);
    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(&mut conn, "u-1", common::search_query(&["mock"], &[], None));

    let locks = SchedulerLockRepository::new();
    let now = common::utc(2026, 6, 2, 9, 0).naive_utc();
    let timeout = ChronoDuration::seconds(600);

    assert!(locks.claim(&mut conn, &rule.id, now, timeout).unwrap());
    let later = now + ChronoDuration::seconds(601);
    assert!(locks.claim(&mut conn, &rule.id, later, timeout).unwrap());
}

#[tokio::test]
async fn tick_runs_a_due_rule_end_to_end() {
    let (pool, _dir) = common::setup_pool();
    let rule = {
        let mut conn = common::get_conn(&pool);
        common::create_user(&mut conn, "u-1", None);
        common::create_rule(
            &mut conn,
            "u-1",
            common::search_query(&["mock"], &["primus", "vinyl"], Some(dec!(120.00))),
        )
    };

    let clock = Arc::new(ManualClock::new(common::utc(2026, 6, 2, 9, 0)));
    let registry = ProviderRegistry::with_builtin_providers(provider_settings(&[]));
    let (runner, outbox, queue) = build_runner(pool.clone(), registry, clock.clone());
    let scheduler = SchedulerService::new(
        pool.clone(),
        runner,
        outbox,
        clock.clone(),
        SchedulerSettings::default(),
    );

    let health = scheduler.tick().await.unwrap();
    assert_eq!(health.due, 1);
    assert_eq!(health.claimed, 1);
    assert_eq!(health.succeeded, 1);
    assert_eq!(health.failed, 0);

    let mut conn = common::get_conn(&pool);
    let refreshed = WatchRuleRepository::new()
        .get_by_id(&mut conn, &rule.id)
        .unwrap()
        .unwrap();
    assert_eq!(
        refreshed.next_run_at,
        Some((clock.now() + ChronoDuration::seconds(600)).naive_utc())
    );

    // The deterministic provider guarantees one listing under the ceiling.
    let pending = NotificationRepository::new()
        .pending_for_user(&mut conn, "u-1")
        .unwrap();
    assert!(!pending.is_empty());

    // The run's boundary dispatch flipped every committed marker and
    // handed the broker one task per notification row.
    assert_eq!(queue.tasks().len(), pending.len());
    let stragglers = OutboxRepository::new()
        .due_pending(&mut conn, clock.now().naive_utc(), 100)
        .unwrap();
    assert!(stragglers.is_empty());

    // The rule is cooling down; an immediate second tick skips it even
    // though next_run_at is in the future anyway.
    let health = scheduler.tick().await.unwrap();
    assert_eq!(health.due, 0);

    // A deactivated rule never comes due again, cadence or not.
    WatchRuleRepository::new()
        .set_active(&mut conn, &rule.id, false, clock.now().naive_utc())
        .unwrap();
    clock.advance(ChronoDuration::seconds(601));
    let health = scheduler.tick().await.unwrap();
    assert_eq!(health.due, 0);
}

#[tokio::test]
async fn failing_provider_does_not_block_its_siblings() {
    let (pool, _dir) = common::setup_pool();
    let rule = {
        let mut conn = common::get_conn(&pool);
        common::create_user(&mut conn, "u-1", None);
        common::create_rule(
            &mut conn,
            "u-1",
            common::search_query(&["mock", "busted"], &["primus", "vinyl"], Some(dec!(120.00))),
        )
    };

    let clock = Arc::new(ManualClock::new(common::utc(2026, 6, 2, 9, 0)));
    let mut registry = ProviderRegistry::with_builtin_providers(provider_settings(&["busted"]));
    registry.register(Arc::new(BustedProvider));
    let (runner, _outbox, _queue) = build_runner(pool.clone(), registry, clock.clone());

    let summary = runner.run_rule_once(&rule).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert!(summary
        .providers
        .iter()
        .any(|p| matches!(p.status, ProviderRunStatus::Failed { .. })));
    assert!(summary
        .providers
        .iter()
        .any(|p| matches!(p.status, ProviderRunStatus::Succeeded { .. })));
    assert!(summary.stats.listings_created > 0);

    // Healthy provider output still landed.
    let mut conn = common::get_conn(&pool);
    let pending = NotificationRepository::new()
        .pending_for_user(&mut conn, "u-1")
        .unwrap();
    assert!(!pending.is_empty());

    // Both attempts against the broken provider were journaled.
    let journal = ProviderRequestRepository::new();
    assert_eq!(journal.count_for_provider(&mut conn, "busted").unwrap(), 2);
    let attempts = journal.recent_for_provider(&mut conn, "busted", 10).unwrap();
    assert!(attempts.iter().all(|r| r.attempts_total == 2));
    assert!(attempts.iter().all(|r| r.status_code == Some(503)));
    assert!(attempts.iter().any(|r| r.attempt == 1));
    assert!(attempts.iter().any(|r| r.attempt == 2));
}

#[tokio::test]
async fn disabled_provider_is_skipped_not_failed() {
    let (pool, _dir) = common::setup_pool();
    let rule = {
        let mut conn = common::get_conn(&pool);
        common::create_user(&mut conn, "u-1", None);
        common::create_rule(
            &mut conn,
            "u-1",
            common::search_query(&["mock", "ebay"], &["primus", "vinyl"], Some(dec!(120.00))),
        )
    };

    let clock = Arc::new(ManualClock::new(common::utc(2026, 6, 2, 9, 0)));
    let mut settings = provider_settings(&[]);
    settings.enabled.insert("ebay".to_string(), false);
    let registry = ProviderRegistry::with_builtin_providers(settings);
    let (runner, _outbox, _queue) = build_runner(pool.clone(), registry, clock.clone());

    let summary = runner.run_rule_once(&rule).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Success);
    assert!(summary
        .providers
        .iter()
        .any(|p| matches!(p.status, ProviderRunStatus::Skipped { .. })));
}

#[tokio::test]
async fn failed_run_still_advances_the_cadence() {
    let (pool, _dir) = common::setup_pool();
    let rule = {
        let mut conn = common::get_conn(&pool);
        common::create_user(&mut conn, "u-1", None);
        let rule = common::create_rule(&mut conn, "u-1", common::search_query(&["mock"], &[], None));
        // Simulate a row whose stored query no longer parses.
        diesel::update(waxwatch_core::schema::watch_search_rules::table.find(&rule.id))
            .set(waxwatch_core::schema::watch_search_rules::query.eq("not json"))
            .execute(&mut conn)
            .unwrap();
        rule
    };

    let clock = Arc::new(ManualClock::new(common::utc(2026, 6, 2, 9, 0)));
    let registry = ProviderRegistry::with_builtin_providers(provider_settings(&[]));
    let (runner, _outbox, _queue) = build_runner(pool.clone(), registry, clock.clone());

    assert!(runner.run_rule_once(&rule).await.is_err());

    // The error must not leave the rule permanently due, or it would be
    // re-claimed and re-run on every tick.
    let mut conn = common::get_conn(&pool);
    let refreshed = WatchRuleRepository::new()
        .get_by_id(&mut conn, &rule.id)
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.last_run_at, Some(clock.now().naive_utc()));
    assert_eq!(
        refreshed.next_run_at,
        Some((clock.now() + ChronoDuration::seconds(600)).naive_utc())
    );
}

#[tokio::test]
async fn tick_reports_the_worst_freshness_lag() {
    let (pool, _dir) = common::setup_pool();
    {
        let mut conn = common::get_conn(&pool);
        common::create_user(&mut conn, "u-1", None);
        common::create_rule(
            &mut conn,
            "u-1",
            common::search_query(&["mock"], &["primus", "vinyl"], Some(dec!(120.00))),
        );
    }

    let clock = Arc::new(ManualClock::new(common::utc(2026, 6, 2, 9, 0)));
    let registry = ProviderRegistry::with_builtin_providers(provider_settings(&[]));
    let (runner, outbox, _queue) = build_runner(pool.clone(), registry, clock.clone());
    let scheduler = SchedulerService::new(
        pool.clone(),
        runner,
        outbox,
        clock.clone(),
        SchedulerSettings::default(),
    );

    // First tick: never-run rule, no next_run_at to lag behind.
    let health = scheduler.tick().await.unwrap();
    assert_eq!(health.claimed, 1);
    assert_eq!(health.max_lag_seconds, 0);

    // The rule came due 100s ago by the time the next tick sees it.
    clock.advance(ChronoDuration::seconds(700));
    let health = scheduler.tick().await.unwrap();
    assert_eq!(health.claimed, 1);
    assert_eq!(health.max_lag_seconds, 100);
}
