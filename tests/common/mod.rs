#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

use waxwatch_core::constants::DEFAULT_POLL_INTERVAL_SECONDS;
use waxwatch_core::db::{self, DbConnection, DbPool};
use waxwatch_core::providers::{NormalizedListing, SearchQuery};
use waxwatch_core::users::{NewUser, User, UserRepository};
use waxwatch_core::watch_rules::{NewWatchSearchRule, WatchRuleRepository, WatchSearchRule};

/// Fresh file-backed SQLite database with migrations applied. The TempDir
/// must stay in scope for the lifetime of the pool.
pub fn setup_pool() -> (Arc<DbPool>, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = db::init(dir.path().to_str().expect("temp path not utf-8"))
        .expect("failed to initialize database");
    let pool = db::create_pool(&db_path).expect("failed to create pool");
    db::run_migrations(&pool).expect("failed to run migrations");
    (pool, dir)
}

pub fn get_conn(pool: &DbPool) -> DbConnection {
    pool.get().expect("failed to get connection")
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap(),
    )
}

pub fn create_user(conn: &mut DbConnection, id: &str, timezone: Option<&str>) -> User {
    let now = utc(2026, 6, 1, 12, 0).naive_utc();
    UserRepository::new()
        .create(
            conn,
            NewUser {
                id: id.to_string(),
                email: format!("{}@example.com", id),
                display_name: None,
                currency: "USD".to_string(),
                timezone: timezone.map(str::to_string),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        )
        .expect("failed to create user")
}

pub fn search_query(
    sources: &[&str],
    keywords: &[&str],
    max_price: Option<Decimal>,
) -> SearchQuery {
    SearchQuery {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        max_price,
        currency: Some("USD".to_string()),
        min_condition: None,
        sources: sources.iter().map(|s| s.to_string()).collect(),
        seed: None,
    }
}

pub fn create_rule(
    conn: &mut DbConnection,
    user_id: &str,
    query: SearchQuery,
) -> WatchSearchRule {
    let now = utc(2026, 6, 1, 12, 0).naive_utc();
    let new_rule =
        NewWatchSearchRule::new(user_id, "test rule", query, DEFAULT_POLL_INTERVAL_SECONDS, now)
            .expect("invalid rule");
    WatchRuleRepository::new()
        .create(conn, new_rule)
        .expect("failed to create rule")
}

pub fn mock_listing(external_id: &str, price: Decimal, currency: &str) -> NormalizedListing {
    NormalizedListing {
        provider: "mock".to_string(),
        external_id: external_id.to_string(),
        url: format!("https://mock.example/listing/{}", external_id),
        title: "Primus - Sailing the Seas of Cheese (Vinyl LP)".to_string(),
        price,
        currency: currency.to_string(),
        condition: Some("VG+".to_string()),
        seller: Some("seller-1".to_string()),
        location: Some("US".to_string()),
        discogs_release_id: None,
        discogs_master_id: None,
        raw: None,
    }
}
