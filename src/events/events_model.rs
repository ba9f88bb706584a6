use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Domain events recorded by the matching pipeline. Every notification is
/// traceable back to exactly one of these rows.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NewMatch,
    ListingPriceDrop,
    ListingPriceRise,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NewMatch => "NEW_MATCH",
            EventType::ListingPriceDrop => "LISTING_PRICE_DROP",
            EventType::ListingPriceRise => "LISTING_PRICE_RISE",
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "LISTING_PRICE_DROP" => EventType::ListingPriceDrop,
            "LISTING_PRICE_RISE" => EventType::ListingPriceRise,
            _ => EventType::NewMatch,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct EventDB {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub rule_id: Option<String>,
    pub watch_release_id: Option<String>,
    pub listing_id: Option<String>,
    pub payload: Option<String>,
    pub created_at: NaiveDateTime,
}

impl EventDB {
    pub fn event_type(&self) -> EventType {
        EventType::from(self.event_type.as_str())
    }

    pub fn payload_json(&self) -> Option<Value> {
        self.payload
            .as_deref()
            .and_then(|p| serde_json::from_str(p).ok())
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::events)]
pub struct NewEvent {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub rule_id: Option<String>,
    pub watch_release_id: Option<String>,
    pub listing_id: Option<String>,
    pub payload: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NewEvent {
    pub fn new(
        user_id: &str,
        event_type: EventType,
        payload: Option<&Value>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            event_type: event_type.as_str().to_string(),
            rule_id: None,
            watch_release_id: None,
            listing_id: None,
            payload: payload.map(|p| p.to_string()),
            created_at: now,
        }
    }

    pub fn for_rule(mut self, rule_id: &str, listing_id: &str) -> Self {
        self.rule_id = Some(rule_id.to_string());
        self.listing_id = Some(listing_id.to_string());
        self
    }

    pub fn for_watch_release(mut self, watch_release_id: &str, listing_id: &str) -> Self {
        self.watch_release_id = Some(watch_release_id.to_string());
        self.listing_id = Some(listing_id.to_string());
        self
    }
}
