use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a provider pages through result sets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaginationModel {
    Offset,
    Cursor,
    None,
}

/// Describes the feature surface a provider implementation supports.
///
/// Resolved once at startup through the registry; selection never relies
/// on runtime reflection.
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilityContract {
    pub supports_search: bool,
    pub requires_auth: bool,
    pub pagination_model: PaginationModel,
}

/// Normalized rule query blob stored on a watch rule and handed to adapters.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub max_price: Option<Decimal>,
    pub currency: Option<String>,
    pub min_condition: Option<String>,
    pub sources: Vec<String>,
    /// Stable seed for deterministic providers; runners pass the rule id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl SearchQuery {
    /// Lower-cased, trimmed source list; empty when the rule names none.
    pub fn normalized_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn normalized_keywords(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Canonical listing shape every adapter must produce.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedListing {
    pub provider: String,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub condition: Option<String>,
    pub seller: Option<String>,
    pub location: Option<String>,
    pub discogs_release_id: Option<i64>,
    pub discogs_master_id: Option<i64>,
    pub raw: Option<serde_json::Value>,
}

/// One row per outbound provider call attempt.
#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::provider_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequestDB {
    pub id: String,
    pub provider: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub attempt: i32,
    pub attempts_total: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::provider_requests)]
pub struct NewProviderRequest {
    pub id: String,
    pub provider: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub attempt: i32,
    pub attempts_total: i32,
    pub created_at: NaiveDateTime,
}

impl NewProviderRequest {
    pub fn new(
        provider: &str,
        endpoint: &str,
        attempt: u32,
        attempts_total: u32,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider: provider.to_string(),
            endpoint: endpoint.to_string(),
            method: "GET".to_string(),
            status_code: None,
            duration_ms: None,
            error: None,
            attempt: attempt as i32,
            attempts_total: attempts_total as i32,
            created_at,
        }
    }

    pub fn with_success(mut self, status_code: u16, duration_ms: i64) -> Self {
        self.status_code = Some(status_code as i32);
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(
        mut self,
        status_code: Option<u16>,
        duration_ms: i64,
        error: &str,
    ) -> Self {
        self.status_code = status_code.map(|s| s as i32);
        self.duration_ms = Some(duration_ms);
        self.error = Some(error.to_string());
        self
    }
}
