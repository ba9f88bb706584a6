use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::providers::NormalizedListing;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Ended,
    Unknown,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Ended => "ended",
            ListingStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for ListingStatus {
    fn from(value: &str) -> Self {
        match value {
            "active" => ListingStatus::Active,
            "ended" => ListingStatus::Ended,
            _ => ListingStatus::Unknown,
        }
    }
}

/// Database row for a canonical marketplace listing.
///
/// Prices are stored as decimal strings; the domain model carries
/// `rust_decimal::Decimal` so change detection is exact.
#[derive(Queryable, Identifiable, AsChangeset, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::listings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ListingDB {
    pub id: String,
    pub provider: String,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub normalized_title: Option<String>,
    pub price: String,
    pub currency: String,
    pub condition: Option<String>,
    pub seller: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub discogs_release_id: Option<i64>,
    pub discogs_master_id: Option<i64>,
    pub first_seen_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
    pub raw: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::listings)]
pub struct NewListingDB {
    pub id: String,
    pub provider: String,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub normalized_title: Option<String>,
    pub price: String,
    pub currency: String,
    pub condition: Option<String>,
    pub seller: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub discogs_release_id: Option<i64>,
    pub discogs_master_id: Option<i64>,
    pub first_seen_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
    pub raw: Option<String>,
}

impl NewListingDB {
    pub fn from_normalized(
        incoming: &NormalizedListing,
        normalized_title: String,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider: incoming.provider.clone(),
            external_id: incoming.external_id.clone(),
            url: incoming.url.clone(),
            title: incoming.title.clone(),
            normalized_title: Some(normalized_title),
            price: incoming.price.to_string(),
            currency: incoming.currency.clone(),
            condition: incoming.condition.clone(),
            seller: incoming.seller.clone(),
            location: incoming.location.clone(),
            status: ListingStatus::Active.as_str().to_string(),
            discogs_release_id: incoming.discogs_release_id,
            discogs_master_id: incoming.discogs_master_id,
            first_seen_at: now,
            last_seen_at: now,
            raw: incoming
                .raw
                .as_ref()
                .and_then(|v| serde_json::to_string(v).ok()),
        }
    }
}

/// Domain view of a listing with exact decimal price.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub provider: String,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub normalized_title: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub condition: Option<String>,
    pub seller: Option<String>,
    pub location: Option<String>,
    pub status: ListingStatus,
    pub discogs_release_id: Option<i64>,
    pub discogs_master_id: Option<i64>,
    pub first_seen_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
    pub raw: Option<serde_json::Value>,
}

impl From<ListingDB> for Listing {
    fn from(db: ListingDB) -> Self {
        Self {
            price: Decimal::from_str(&db.price).unwrap_or_default(),
            status: ListingStatus::from(db.status.as_str()),
            raw: db.raw.as_deref().and_then(|r| serde_json::from_str(r).ok()),
            id: db.id,
            provider: db.provider,
            external_id: db.external_id,
            url: db.url,
            title: db.title,
            normalized_title: db.normalized_title,
            currency: db.currency,
            condition: db.condition,
            seller: db.seller,
            location: db.location,
            discogs_release_id: db.discogs_release_id,
            discogs_master_id: db.discogs_master_id,
            first_seen_at: db.first_seen_at,
            last_seen_at: db.last_seen_at,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::price_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshotDB {
    pub id: String,
    pub listing_id: String,
    pub price: String,
    pub currency: String,
    pub recorded_at: NaiveDateTime,
}

impl PriceSnapshotDB {
    pub fn price_decimal(&self) -> Decimal {
        Decimal::from_str(&self.price).unwrap_or_default()
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::price_snapshots)]
pub struct NewPriceSnapshot {
    pub id: String,
    pub listing_id: String,
    pub price: String,
    pub currency: String,
    pub recorded_at: NaiveDateTime,
}

impl NewPriceSnapshot {
    pub fn new(listing_id: &str, price: Decimal, currency: &str, recorded_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            listing_id: listing_id.to_string(),
            price: price.to_string(),
            currency: currency.to_string(),
            recorded_at,
        }
    }
}

/// Result of feeding one provider listing through the dedup path.
#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub listing: Listing,
    pub created_listing: bool,
    pub created_snapshot: bool,
}
