use async_trait::async_trait;

use super::providers_errors::ProviderError;
use super::providers_model::{NormalizedListing, ProviderCapabilityContract, SearchQuery};

/// Trait for marketplace providers.
///
/// Implement this trait to add support for a new marketplace source. The
/// registry resolves implementations by id from enabled configuration; the
/// rule runner owns retries and per-call request logging, so adapters only
/// perform one attempt per `search` call.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Unique identifier, e.g. "discogs", "ebay", "mock".
    fn id(&self) -> &'static str;

    /// Endpoint recorded in the provider request log.
    fn default_endpoint(&self) -> &'static str;

    /// Capability surface this implementation supports.
    fn capability_contract(&self) -> ProviderCapabilityContract;

    /// Perform one search attempt against the provider.
    ///
    /// Returns normalized listings on success. Raise a `ProviderError` for
    /// failures the caller should handle; retryable errors are re-attempted
    /// by the shared retry wrapper up to the configured ceiling.
    async fn search(
        &self,
        query: &SearchQuery,
        limit: u32,
    ) -> Result<Vec<NormalizedListing>, ProviderError>;
}
