use rust_decimal_macros::dec;
use std::sync::Arc;

use waxwatch_core::events::EventRepository;
use waxwatch_core::listings::ListingRepository;
use waxwatch_core::matching::{MatchingService, WatchMatchRepository};
use waxwatch_core::notifications::{NotificationDispatcher, NotificationRepository};
use waxwatch_core::watch_releases::{MatchMode, NewWatchRelease, WatchReleaseRepository};

mod common;

fn matching_service() -> MatchingService {
    MatchingService::new(Arc::new(NotificationDispatcher::new()))
}

#[test]
fn same_payload_twice_creates_nothing_new() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["primus", "vinyl"], None),
    );
    let query = rule.parsed_query().unwrap();
    let svc = matching_service();

    let payload = vec![common::mock_listing("x-1", dec!(10.00), "USD")];
    let first = svc
        .ingest_and_match(&mut conn, &rule, &query, &payload, common::utc(2026, 6, 2, 9, 0))
        .unwrap();
    let second = svc
        .ingest_and_match(&mut conn, &rule, &query, &payload, common::utc(2026, 6, 2, 9, 10))
        .unwrap();

    assert_eq!(first.listings_created, 1);
    assert_eq!(first.snapshots_created, 1);
    assert_eq!(first.matches_created, 1);
    assert_eq!(first.events_created, 1);

    assert_eq!(second.listings_created, 0);
    assert_eq!(second.snapshots_created, 0);
    assert_eq!(second.matches_created, 0);
    assert_eq!(second.events_created, 0);

    let listing = ListingRepository::new()
        .find_by_key(&mut conn, "mock", "x-1")
        .unwrap()
        .expect("listing should exist");
    let snapshots = ListingRepository::new()
        .snapshots_for_listing(&mut conn, &listing.id)
        .unwrap();
    assert_eq!(snapshots.len(), 1);

    let markers = WatchMatchRepository::new()
        .matches_for_rule(&mut conn, &rule.id)
        .unwrap();
    assert_eq!(markers.len(), 1);

    // Default preferences enable both channels, so one event fans out to
    // two pending notifications and nothing more on the replay.
    let pending = NotificationRepository::new()
        .pending_for_user(&mut conn, "u-1")
        .unwrap();
    assert_eq!(pending.len(), 2);
}

#[test]
fn snapshot_created_only_when_price_changes() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["primus"], None),
    );
    let query = rule.parsed_query().unwrap();
    let svc = matching_service();

    for (i, price) in [dec!(10.00), dec!(10.00), dec!(12.00)].iter().enumerate() {
        svc.ingest_and_match(
            &mut conn,
            &rule,
            &query,
            &[common::mock_listing("x-1", *price, "USD")],
            common::utc(2026, 6, 2, 9, i as u32),
        )
        .unwrap();
    }

    let listing = ListingRepository::new()
        .find_by_key(&mut conn, "mock", "x-1")
        .unwrap()
        .unwrap();
    let snapshots = ListingRepository::new()
        .snapshots_for_listing(&mut conn, &listing.id)
        .unwrap();
    assert_eq!(snapshots.len(), 2);

    // First sighting and the later price move; the unchanged middle
    // sighting produces no event.
    let events = EventRepository::new()
        .events_for_user(&mut conn, "u-1", 10)
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "LISTING_PRICE_RISE");
    assert_eq!(events[1].event_type, "NEW_MATCH");
}

#[test]
fn price_drop_emits_a_drop_event() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["primus"], None),
    );
    let query = rule.parsed_query().unwrap();
    let svc = matching_service();

    for (i, price) in [dec!(20.00), dec!(15.00)].iter().enumerate() {
        svc.ingest_and_match(
            &mut conn,
            &rule,
            &query,
            &[common::mock_listing("x-1", *price, "USD")],
            common::utc(2026, 6, 2, 10, i as u32),
        )
        .unwrap();
    }

    let events = EventRepository::new()
        .events_for_user(&mut conn, "u-1", 10)
        .unwrap();
    assert_eq!(events[0].event_type, "LISTING_PRICE_DROP");
}

#[test]
fn shared_listing_price_move_reaches_every_matching_rule() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    common::create_user(&mut conn, "u-2", None);
    let rule_a = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["primus"], None),
    );
    let rule_b = common::create_rule(
        &mut conn,
        "u-2",
        common::search_query(&["mock"], &["primus"], None),
    );
    let query_a = rule_a.parsed_query().unwrap();
    let query_b = rule_b.parsed_query().unwrap();
    let svc = matching_service();

    // Both rules see the listing at its original price.
    let t0 = common::utc(2026, 6, 2, 9, 0);
    for (rule, query) in [(&rule_a, &query_a), (&rule_b, &query_b)] {
        svc.ingest_and_match(
            &mut conn,
            rule,
            query,
            &[common::mock_listing("x-1", dec!(10.00), "USD")],
            t0,
        )
        .unwrap();
    }

    // The first run to observe the rise writes the snapshot.
    let t1 = common::utc(2026, 6, 2, 10, 0);
    let first = svc
        .ingest_and_match(
            &mut conn,
            &rule_a,
            &query_a,
            &[common::mock_listing("x-1", dec!(12.00), "USD")],
            t1,
        )
        .unwrap();
    assert_eq!(first.snapshots_created, 1);
    assert_eq!(first.events_created, 1);

    // The other rule's run sees no new snapshot but its own pairing still
    // lags behind the price, so it owes its own event.
    let second = svc
        .ingest_and_match(
            &mut conn,
            &rule_b,
            &query_b,
            &[common::mock_listing("x-1", dec!(12.00), "USD")],
            t1,
        )
        .unwrap();
    assert_eq!(second.snapshots_created, 0);
    assert_eq!(second.events_created, 1);

    let events = EventRepository::new()
        .events_for_user(&mut conn, "u-2", 10)
        .unwrap();
    assert_eq!(events[0].event_type, "LISTING_PRICE_RISE");
}

#[test]
fn exact_release_requires_the_exact_pressing() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    // Keywords that never match, so only watch-release pairings produce events.
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["zzz-no-such-keyword"], None),
    );
    let query = rule.parsed_query().unwrap();

    let now = common::utc(2026, 6, 2, 9, 0);
    let releases = WatchReleaseRepository::new();
    let mut exact = NewWatchRelease::new(
        "u-1",
        1001,
        Some(5001),
        MatchMode::ExactRelease,
        "Sailing the Seas of Cheese",
        now.naive_utc(),
    );
    exact.id = "w-exact".to_string();
    releases.create(&mut conn, &exact).unwrap();

    let svc = matching_service();
    let mut other_pressing = common::mock_listing("x-1002", dec!(30.00), "USD");
    other_pressing.discogs_release_id = Some(1002);
    other_pressing.discogs_master_id = Some(5001);

    let stats = svc
        .ingest_and_match(&mut conn, &rule, &query, &[other_pressing], now)
        .unwrap();

    // Same master, different pressing: no match in exact mode.
    assert_eq!(stats.events_created, 0);
    let listing = ListingRepository::new()
        .find_by_key(&mut conn, "mock", "x-1002")
        .unwrap()
        .unwrap();
    assert!(EventRepository::new()
        .latest_event_for_watch(&mut conn, "w-exact", &listing.id)
        .unwrap()
        .is_none());

    // Disabling the watch silences even the exact pressing.
    releases
        .set_active(&mut conn, "w-exact", false, now.naive_utc())
        .unwrap();
    let disabled = releases
        .get_by_id(&mut conn, "w-exact")
        .unwrap()
        .unwrap();
    assert!(!disabled.is_active);

    let mut exact_pressing = common::mock_listing("x-1001", dec!(28.00), "USD");
    exact_pressing.discogs_release_id = Some(1001);
    exact_pressing.discogs_master_id = Some(5001);
    let stats = svc
        .ingest_and_match(&mut conn, &rule, &query, &[exact_pressing], now)
        .unwrap();
    assert_eq!(stats.events_created, 0);
}

#[test]
fn master_release_matches_every_pressing() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["zzz-no-such-keyword"], None),
    );
    let query = rule.parsed_query().unwrap();

    let now = common::utc(2026, 6, 2, 9, 0);
    let releases = WatchReleaseRepository::new();
    let mut master = NewWatchRelease::new(
        "u-1",
        1001,
        Some(5001),
        MatchMode::MasterRelease,
        "Sailing the Seas of Cheese",
        now.naive_utc(),
    );
    master.id = "w-master".to_string();
    releases.create(&mut conn, &master).unwrap();

    let svc = matching_service();
    let mut original = common::mock_listing("x-1001", dec!(25.00), "USD");
    original.discogs_release_id = Some(1001);
    original.discogs_master_id = Some(5001);
    let mut repress = common::mock_listing("x-1002", dec!(30.00), "USD");
    repress.discogs_release_id = Some(1002);
    repress.discogs_master_id = Some(5001);
    // No master id: never satisfies master mode.
    let mut unmapped_pressing = common::mock_listing("x-1003", dec!(30.00), "USD");
    unmapped_pressing.discogs_release_id = Some(1001);
    unmapped_pressing.title = "Unrelated bootleg tape".to_string();

    let stats = svc
        .ingest_and_match(
            &mut conn,
            &rule,
            &query,
            &[original, repress, unmapped_pressing],
            now,
        )
        .unwrap();
    assert_eq!(stats.events_created, 2);
    assert_eq!(
        EventRepository::new()
            .count_by_type(&mut conn, "NEW_MATCH")
            .unwrap(),
        2
    );
}

#[test]
fn unidentified_listing_is_enriched_from_a_confident_watch() {
    let (pool, _dir) = common::setup_pool();
    let mut conn = common::get_conn(&pool);

    common::create_user(&mut conn, "u-1", None);
    let rule = common::create_rule(
        &mut conn,
        "u-1",
        common::search_query(&["mock"], &["zzz-no-such-keyword"], None),
    );
    let query = rule.parsed_query().unwrap();

    let now = common::utc(2026, 6, 2, 9, 0);
    let mut watch = NewWatchRelease::new(
        "u-1",
        1001,
        Some(5001),
        MatchMode::ExactRelease,
        "Sailing the Seas of Cheese",
        now.naive_utc(),
    );
    watch.artist = Some("Primus".to_string());
    WatchReleaseRepository::new()
        .create(&mut conn, &watch)
        .unwrap();

    let svc = matching_service();
    // Title-only listing; identity comes from enrichment.
    let stats = svc
        .ingest_and_match(
            &mut conn,
            &rule,
            &query,
            &[common::mock_listing("x-raw", dec!(22.00), "USD")],
            now,
        )
        .unwrap();

    let listing = ListingRepository::new()
        .find_by_key(&mut conn, "mock", "x-raw")
        .unwrap()
        .unwrap();
    assert_eq!(listing.discogs_release_id, Some(1001));
    assert_eq!(listing.discogs_master_id, Some(5001));
    // The inferred identity immediately satisfies the watch.
    assert_eq!(stats.events_created, 1);

    let marker = WatchMatchRepository::new()
        .get_for_pairing(&mut conn, &rule.id, &listing.id)
        .unwrap();
    assert!(marker.is_none(), "rule keywords should not have matched");
}
