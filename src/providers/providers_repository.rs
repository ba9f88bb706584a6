use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::provider_requests;

use super::providers_model::{NewProviderRequest, ProviderRequestDB};

/// Append-only log of outbound provider call attempts.
#[derive(Debug, Default)]
pub struct ProviderRequestRepository;

impl ProviderRequestRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn log_request(
        &self,
        conn: &mut SqliteConnection,
        request: NewProviderRequest,
    ) -> Result<()> {
        diesel::insert_into(provider_requests::table)
            .values(request)
            .execute(conn)?;
        Ok(())
    }

    pub fn recent_for_provider(
        &self,
        conn: &mut SqliteConnection,
        provider: &str,
        limit: i64,
    ) -> Result<Vec<ProviderRequestDB>> {
        let rows = provider_requests::table
            .filter(provider_requests::provider.eq(provider))
            .order(provider_requests::created_at.desc())
            .limit(limit)
            .load::<ProviderRequestDB>(conn)?;
        Ok(rows)
    }

    pub fn count_for_provider(&self, conn: &mut SqliteConnection, provider: &str) -> Result<i64> {
        let count = provider_requests::table
            .filter(provider_requests::provider.eq(provider))
            .count()
            .get_result(conn)?;
        Ok(count)
    }
}
