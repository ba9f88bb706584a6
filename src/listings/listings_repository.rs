use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;

use crate::errors::Result;
use crate::matching::MatchingError;
use crate::providers::NormalizedListing;
use crate::schema::{listings, price_snapshots};

use super::listings_model::{
    Listing, ListingDB, NewListingDB, NewPriceSnapshot, PriceSnapshotDB, UpsertResult,
};

pub struct ListingRepository;

impl ListingRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn find_by_key(
        &self,
        conn: &mut SqliteConnection,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<ListingDB>> {
        let listing = listings::table
            .filter(listings::provider.eq(provider))
            .filter(listings::external_id.eq(external_id))
            .first::<ListingDB>(conn)
            .optional()?;
        Ok(listing)
    }

    pub fn get_by_id(&self, conn: &mut SqliteConnection, id: &str) -> Result<Option<Listing>> {
        let listing = listings::table
            .filter(listings::id.eq(id))
            .first::<ListingDB>(conn)
            .optional()?;
        Ok(listing.map(Listing::from))
    }

    /// Canonicalize one provider listing against persisted state.
    ///
    /// Dedup key is `(provider, external_id)`. First sighting inserts the
    /// listing plus its initial snapshot; later sightings update mutable
    /// fields in place and append a snapshot only when price or currency
    /// moved relative to the immediately prior snapshot. Safe to call from
    /// concurrent runs: the insert races through `ON CONFLICT DO NOTHING`
    /// and the snapshot decision is re-checked against the stored history
    /// after the row is acquired.
    ///
    /// Must be called inside the run's enclosing transaction.
    pub fn upsert(
        &self,
        conn: &mut SqliteConnection,
        incoming: &NormalizedListing,
        normalized_title: String,
        now: NaiveDateTime,
    ) -> Result<UpsertResult> {
        if let Some(existing) = self.find_by_key(conn, &incoming.provider, &incoming.external_id)? {
            return self.update_existing(conn, existing, incoming, normalized_title, now);
        }

        let new_listing = NewListingDB::from_normalized(incoming, normalized_title.clone(), now);
        let inserted = diesel::insert_into(listings::table)
            .values(&new_listing)
            .on_conflict((listings::provider, listings::external_id))
            .do_nothing()
            .execute(conn)?;

        if inserted > 0 {
            // Always snapshot on create.
            self.insert_snapshot(
                conn,
                NewPriceSnapshot::new(&new_listing.id, incoming.price, &incoming.currency, now),
            )?;

            let listing = listings::table
                .filter(listings::id.eq(&new_listing.id))
                .first::<ListingDB>(conn)?;
            return Ok(UpsertResult {
                listing: Listing::from(listing),
                created_listing: true,
                created_snapshot: true,
            });
        }

        // Lost an insert race; another writer owns the row now.
        let existing = self
            .find_by_key(conn, &incoming.provider, &incoming.external_id)?
            .ok_or_else(|| {
                MatchingError::InvariantViolation(format!(
                    "listing insert conflict but row not found for ({}, {})",
                    incoming.provider, incoming.external_id
                ))
            })?;
        self.update_existing(conn, existing, incoming, normalized_title, now)
    }

    fn update_existing(
        &self,
        conn: &mut SqliteConnection,
        existing: ListingDB,
        incoming: &NormalizedListing,
        normalized_title: String,
        now: NaiveDateTime,
    ) -> Result<UpsertResult> {
        // Identity fields must never change once known.
        if let (Some(old), Some(new)) = (existing.discogs_release_id, incoming.discogs_release_id) {
            if old != new {
                return Err(MatchingError::IdentityConflict {
                    listing_id: existing.id.clone(),
                    field: "discogs_release_id".to_string(),
                    stored: old,
                    incoming: new,
                }
                .into());
            }
        }

        // Incoming None never erases a known mapping; enrichment may have
        // filled it from a source the provider does not echo back.
        let release_id = incoming.discogs_release_id.or(existing.discogs_release_id);
        let master_id = incoming.discogs_master_id.or(existing.discogs_master_id);
        // Same rule for the raw payload, which may carry an enrichment
        // decision the provider knows nothing about.
        let raw = incoming
            .raw
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok())
            .or_else(|| existing.raw.clone());

        diesel::update(listings::table.filter(listings::id.eq(&existing.id)))
            .set((
                listings::url.eq(&incoming.url),
                listings::title.eq(&incoming.title),
                listings::normalized_title.eq(Some(normalized_title)),
                listings::price.eq(incoming.price.to_string()),
                listings::currency.eq(&incoming.currency),
                listings::condition.eq(&incoming.condition),
                listings::seller.eq(&incoming.seller),
                listings::location.eq(&incoming.location),
                listings::discogs_release_id.eq(release_id),
                listings::discogs_master_id.eq(master_id),
                listings::last_seen_at.eq(now),
                listings::raw.eq(raw),
            ))
            .execute(conn)?;

        // Snapshot iff price or currency differs from the prior snapshot.
        // Checked against stored history rather than the pre-update row so a
        // replayed payload stays idempotent under concurrent writers.
        let created_snapshot = match self.latest_snapshot(conn, &existing.id)? {
            Some(prior)
                if prior.price_decimal() == incoming.price
                    && prior.currency == incoming.currency =>
            {
                false
            }
            prior => {
                if prior.is_none() {
                    warn!(
                        "listing {} had no prior snapshot; recording one now",
                        existing.id
                    );
                }
                self.insert_snapshot(
                    conn,
                    NewPriceSnapshot::new(&existing.id, incoming.price, &incoming.currency, now),
                )?;
                true
            }
        };

        let updated = listings::table
            .filter(listings::id.eq(&existing.id))
            .first::<ListingDB>(conn)?;
        Ok(UpsertResult {
            listing: Listing::from(updated),
            created_listing: false,
            created_snapshot,
        })
    }

    pub fn latest_snapshot(
        &self,
        conn: &mut SqliteConnection,
        listing_id: &str,
    ) -> Result<Option<PriceSnapshotDB>> {
        let snapshot = price_snapshots::table
            .filter(price_snapshots::listing_id.eq(listing_id))
            .order(price_snapshots::recorded_at.desc())
            .first::<PriceSnapshotDB>(conn)
            .optional()?;
        Ok(snapshot)
    }

    pub fn snapshots_for_listing(
        &self,
        conn: &mut SqliteConnection,
        listing_id: &str,
    ) -> Result<Vec<PriceSnapshotDB>> {
        let snapshots = price_snapshots::table
            .filter(price_snapshots::listing_id.eq(listing_id))
            .order(price_snapshots::recorded_at.asc())
            .load::<PriceSnapshotDB>(conn)?;
        Ok(snapshots)
    }

    /// Mapping update performed by release enrichment.
    pub fn set_release_mapping(
        &self,
        conn: &mut SqliteConnection,
        listing_id: &str,
        discogs_release_id: i64,
        discogs_master_id: Option<i64>,
        raw: Option<&serde_json::Value>,
    ) -> Result<()> {
        diesel::update(listings::table.filter(listings::id.eq(listing_id)))
            .set((
                listings::discogs_release_id.eq(Some(discogs_release_id)),
                listings::discogs_master_id.eq(discogs_master_id),
                listings::raw.eq(raw.and_then(|v| serde_json::to_string(v).ok())),
            ))
            .execute(conn)?;
        Ok(())
    }

    fn insert_snapshot(
        &self,
        conn: &mut SqliteConnection,
        snapshot: NewPriceSnapshot,
    ) -> Result<()> {
        diesel::insert_into(price_snapshots::table)
            .values(snapshot)
            .execute(conn)?;
        Ok(())
    }
}

impl Default for ListingRepository {
    fn default() -> Self {
        Self::new()
    }
}
