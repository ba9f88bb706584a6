use chrono::{DateTime, Utc};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::Result;
use crate::events::{EventDB, EventRepository, EventType, NewEvent};
use crate::listings::{Listing, ListingRepository, UpsertResult};
use crate::notifications::NotificationDispatcher;
use crate::providers::{NormalizedListing, SearchQuery};
use crate::watch_releases::{WatchRelease, WatchReleaseRepository};
use crate::watch_rules::WatchSearchRule;

use super::enrichment;
use super::matching_model::{IngestStats, NewWatchMatch};
use super::matching_repository::WatchMatchRepository;

/// Canonicalizes provider output, detects new and changed matches, and
/// records the events that drive notification fan-out. Every call runs
/// inside the caller's transaction.
pub struct MatchingService {
    listings: ListingRepository,
    matches: WatchMatchRepository,
    events: EventRepository,
    watch_releases: WatchReleaseRepository,
    dispatcher: Arc<NotificationDispatcher>,
}

impl MatchingService {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            listings: ListingRepository::new(),
            matches: WatchMatchRepository::new(),
            events: EventRepository::new(),
            watch_releases: WatchReleaseRepository::new(),
            dispatcher,
        }
    }

    /// Safety net against provider-side false positives. Provider filtering
    /// is trusted for recall; this re-checks the rule's own constraints
    /// before a match is recorded.
    pub fn rule_matches_listing(query: &SearchQuery, listing: &Listing) -> bool {
        let sources = query.normalized_sources();
        if !sources.is_empty() && !sources.iter().any(|s| s == &listing.provider) {
            return false;
        }

        if let Some(max_price) = query.max_price {
            // A ceiling is only meaningful when the currencies line up; a
            // non-comparable currency means no match rather than a guess.
            if let Some(rule_currency) = query.currency.as_deref() {
                if !rule_currency.eq_ignore_ascii_case(&listing.currency) {
                    return false;
                }
            }
            if listing.price > max_price {
                return false;
            }
        }

        let title = match listing.normalized_title.as_deref() {
            Some(t) => t.to_string(),
            None => enrichment::normalize_title(&listing.title),
        };
        query
            .normalized_keywords()
            .iter()
            .all(|kw| title.contains(kw.as_str()))
    }

    /// Ingest one run's worth of listings for a rule: dedup/upsert, enrich
    /// release identity, record first-match and price-change events, and
    /// hand each event to the dispatcher for in-transaction fan-out.
    pub fn ingest_and_match(
        &self,
        conn: &mut SqliteConnection,
        rule: &WatchSearchRule,
        query: &SearchQuery,
        incoming: &[NormalizedListing],
        now: DateTime<Utc>,
    ) -> Result<IngestStats> {
        let mut stats = IngestStats {
            fetched: incoming.len(),
            ..IngestStats::default()
        };
        let watches = self.watch_releases.active_for_user(conn, &rule.user_id)?;

        for item in incoming {
            let normalized = enrichment::normalize_title(&item.title);
            let UpsertResult {
                listing,
                created_listing,
                created_snapshot,
            } = self
                .listings
                .upsert(conn, item, normalized, now.naive_utc())?;
            if created_listing {
                stats.listings_created += 1;
            }
            if created_snapshot {
                stats.snapshots_created += 1;
            }

            let listing = self.enrich(conn, listing, &watches)?;

            if Self::rule_matches_listing(query, &listing) {
                self.record_rule_match(conn, rule, &listing, now, &mut stats)?;
            }

            for watch in watches.iter().filter(|w| w.matches_listing(&listing)) {
                self.record_watch_match(conn, watch, &listing, now, &mut stats)?;
            }
        }

        debug!(
            "Matched rule {}: {} listings in, {} created, {} snapshots, {} events",
            rule.id, stats.fetched, stats.listings_created, stats.snapshots_created, stats.events_created
        );
        Ok(stats)
    }

    /// Map an unidentified listing onto a watched release when the token
    /// overlap is confident enough. The decision is written into the
    /// listing's raw payload for provenance.
    fn enrich(
        &self,
        conn: &mut SqliteConnection,
        mut listing: Listing,
        watches: &[WatchRelease],
    ) -> Result<Listing> {
        if listing.discogs_release_id.is_some() || watches.is_empty() {
            return Ok(listing);
        }
        let title = listing
            .normalized_title
            .clone()
            .unwrap_or_else(|| listing.title.clone());
        if let Some(candidate) = enrichment::best_candidate(&title, watches) {
            let raw = enrichment::mapping_decision(listing.raw.clone(), &candidate);
            self.listings.set_release_mapping(
                conn,
                &listing.id,
                candidate.discogs_release_id,
                candidate.discogs_master_id,
                Some(&raw),
            )?;
            debug!(
                "Enriched listing {} with release {} (score {:.3})",
                listing.id, candidate.discogs_release_id, candidate.score
            );
            listing.discogs_release_id = Some(candidate.discogs_release_id);
            listing.discogs_master_id = candidate.discogs_master_id;
            listing.raw = Some(raw);
        }
        Ok(listing)
    }

    fn record_rule_match(
        &self,
        conn: &mut SqliteConnection,
        rule: &WatchSearchRule,
        listing: &Listing,
        now: DateTime<Utc>,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let marker = NewWatchMatch::new(&rule.id, &listing.id, now.naive_utc());
        let first_match = self.matches.insert_if_absent(conn, &marker)?;

        if first_match {
            stats.matches_created += 1;
            let event = NewEvent::new(
                &rule.user_id,
                EventType::NewMatch,
                Some(&Self::event_payload(listing)),
                now.naive_utc(),
            )
            .for_rule(&rule.id, &listing.id);
            self.persist_event(conn, event, now, stats)?;
            return Ok(());
        }

        // The comparison runs on every sighting, not just the one that wrote
        // the snapshot: other pairings sharing this listing still owe their
        // own change event.
        let prior = self.events.latest_event_for_rule(conn, &rule.id, &listing.id)?;
        if let Some(event_type) = Self::price_change_type(prior.as_ref(), listing) {
            let event = NewEvent::new(
                &rule.user_id,
                event_type,
                Some(&Self::event_payload(listing)),
                now.naive_utc(),
            )
            .for_rule(&rule.id, &listing.id);
            self.persist_event(conn, event, now, stats)?;
        }
        Ok(())
    }

    fn record_watch_match(
        &self,
        conn: &mut SqliteConnection,
        watch: &WatchRelease,
        listing: &Listing,
        now: DateTime<Utc>,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let prior = self
            .events
            .latest_event_for_watch(conn, &watch.id, &listing.id)?;

        if prior.is_none() {
            stats.matches_created += 1;
            let event = NewEvent::new(
                &watch.user_id,
                EventType::NewMatch,
                Some(&Self::event_payload(listing)),
                now.naive_utc(),
            )
            .for_watch_release(&watch.id, &listing.id);
            self.persist_event(conn, event, now, stats)?;
            return Ok(());
        }

        if let Some(event_type) = Self::price_change_type(prior.as_ref(), listing) {
            let event = NewEvent::new(
                &watch.user_id,
                event_type,
                Some(&Self::event_payload(listing)),
                now.naive_utc(),
            )
            .for_watch_release(&watch.id, &listing.id);
            self.persist_event(conn, event, now, stats)?;
        }
        Ok(())
    }

    fn persist_event(
        &self,
        conn: &mut SqliteConnection,
        event: NewEvent,
        now: DateTime<Utc>,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let stored = self.events.insert(conn, &event)?;
        stats.events_created += 1;
        let created = self.dispatcher.enqueue_from_event(conn, &stored, now)?;
        stats.notifications_created += created.len();
        Ok(())
    }

    fn event_payload(listing: &Listing) -> Value {
        json!({
            "listing_id": listing.id,
            "provider": listing.provider,
            "title": listing.title,
            "url": listing.url,
            "price": listing.price.to_string(),
            "currency": listing.currency,
        })
    }

    /// Compare the listing's current price against the last event reported
    /// for this pairing. Returns the change event to emit, or None when the
    /// price and currency are unchanged.
    fn price_change_type(prior: Option<&EventDB>, listing: &Listing) -> Option<EventType> {
        let prior = prior?;
        let payload = match prior.payload_json() {
            Some(p) => p,
            None => {
                warn!(
                    "Event {} has no readable payload; skipping price comparison",
                    prior.id
                );
                return None;
            }
        };
        let prior_price = payload
            .get("price")
            .and_then(Value::as_str)
            .and_then(|p| Decimal::from_str(p).ok())?;
        let prior_currency = payload.get("currency").and_then(Value::as_str)?;

        if prior_price == listing.price && prior_currency == listing.currency {
            return None;
        }
        if listing.price < prior_price {
            Some(EventType::ListingPriceDrop)
        } else {
            Some(EventType::ListingPriceRise)
        }
    }
}
