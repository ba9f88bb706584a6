pub(crate) mod mock_provider;
pub(crate) mod providers_errors;
pub(crate) mod providers_model;
pub(crate) mod providers_repository;
pub(crate) mod providers_traits;
pub(crate) mod registry;
pub(crate) mod retry;

// Re-export the public interface
pub use mock_provider::MockProvider;
pub use providers_errors::ProviderError;
pub use providers_model::{
    NewProviderRequest, NormalizedListing, PaginationModel, ProviderCapabilityContract,
    ProviderRequestDB, SearchQuery,
};
pub use providers_repository::ProviderRequestRepository;
pub use providers_traits::ProviderClient;
pub use registry::ProviderRegistry;
pub use retry::{RetryPolicy, RetryableError};
