use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::listings::Listing;

/// How a watched release is compared against listing identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    ExactRelease,
    MasterRelease,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::ExactRelease => "exact_release",
            MatchMode::MasterRelease => "master_release",
        }
    }
}

impl From<&str> for MatchMode {
    fn from(value: &str) -> Self {
        match value {
            "master_release" => MatchMode::MasterRelease,
            _ => MatchMode::ExactRelease,
        }
    }
}

/// Watch on a specific catalog release, anchored on its Discogs release id.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_releases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct WatchRelease {
    pub id: String,
    pub user_id: String,
    pub discogs_release_id: i64,
    pub discogs_master_id: Option<i64>,
    pub match_mode: String,
    pub title: String,
    pub artist: Option<String>,
    pub year: Option<i32>,
    pub target_price: Option<String>,
    pub currency: String,
    pub min_condition: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl WatchRelease {
    pub fn match_mode(&self) -> MatchMode {
        MatchMode::from(self.match_mode.as_str())
    }

    /// Whether a listing's normalized identity satisfies this watch.
    ///
    /// `exact_release` requires the listing's release id to equal the
    /// watched release id. `master_release` requires both sides to expose a
    /// master id and those to be equal; a listing without a master id can
    /// never satisfy a master-mode watch.
    pub fn matches_listing(&self, listing: &Listing) -> bool {
        match self.match_mode() {
            MatchMode::MasterRelease => match (self.discogs_master_id, listing.discogs_master_id) {
                (Some(watched), Some(seen)) => watched == seen,
                _ => false,
            },
            MatchMode::ExactRelease => listing
                .discogs_release_id
                .map(|seen| seen == self.discogs_release_id)
                .unwrap_or(false),
        }
    }
}

#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::watch_releases)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchRelease {
    pub id: String,
    pub user_id: String,
    pub discogs_release_id: i64,
    pub discogs_master_id: Option<i64>,
    pub match_mode: String,
    pub title: String,
    pub artist: Option<String>,
    pub year: Option<i32>,
    pub target_price: Option<String>,
    pub currency: String,
    pub min_condition: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewWatchRelease {
    pub fn new(
        user_id: &str,
        discogs_release_id: i64,
        discogs_master_id: Option<i64>,
        match_mode: MatchMode,
        title: &str,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            discogs_release_id,
            discogs_master_id,
            match_mode: match_mode.as_str().to_string(),
            title: title.to_string(),
            artist: None,
            year: None,
            target_price: None,
            currency: "USD".to_string(),
            min_condition: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::ListingStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn listing(release_id: Option<i64>, master_id: Option<i64>) -> Listing {
        Listing {
            id: "l-1".to_string(),
            provider: "mock".to_string(),
            external_id: "x-1".to_string(),
            url: "https://example.com/x-1".to_string(),
            title: "Test".to_string(),
            normalized_title: None,
            price: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            condition: None,
            seller: None,
            location: None,
            status: ListingStatus::Active,
            discogs_release_id: release_id,
            discogs_master_id: master_id,
            first_seen_at: Utc::now().naive_utc(),
            last_seen_at: Utc::now().naive_utc(),
            raw: None,
        }
    }

    fn watch(mode: MatchMode, release_id: i64, master_id: Option<i64>) -> WatchRelease {
        let now = Utc::now().naive_utc();
        WatchRelease {
            id: "w-1".to_string(),
            user_id: "u-1".to_string(),
            discogs_release_id: release_id,
            discogs_master_id: master_id,
            match_mode: mode.as_str().to_string(),
            title: "Test".to_string(),
            artist: None,
            year: None,
            target_price: None,
            currency: "USD".to_string(),
            min_condition: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exact_mode_requires_identical_release_id() {
        let w = watch(MatchMode::ExactRelease, 1001, Some(5001));
        assert!(w.matches_listing(&listing(Some(1001), Some(5001))));
        // Sharing a master id is not enough in exact mode.
        assert!(!w.matches_listing(&listing(Some(1002), Some(5001))));
        assert!(!w.matches_listing(&listing(None, Some(5001))));
    }

    #[test]
    fn master_mode_matches_any_pressing_of_the_master() {
        let w = watch(MatchMode::MasterRelease, 1001, Some(5001));
        assert!(w.matches_listing(&listing(Some(1001), Some(5001))));
        assert!(w.matches_listing(&listing(Some(1002), Some(5001))));
        // Listings without a master id never satisfy master mode.
        assert!(!w.matches_listing(&listing(Some(1001), None)));
    }

    #[test]
    fn master_mode_without_watched_master_id_never_matches() {
        let w = watch(MatchMode::MasterRelease, 1001, None);
        assert!(!w.matches_listing(&listing(Some(1001), Some(5001))));
    }
}
