use thiserror::Error;

/// Controlled failure surface for one outbound provider call.
///
/// Exhausted retries surface as a provider-failure outcome for the current
/// rule run only; nothing here ever propagates to the scheduler.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("{provider} network error: {message}")]
    Network { provider: String, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} rate limited")]
    RateLimited {
        provider: String,
        retry_after_ms: Option<u64>,
    },

    #[error("{provider} returned a malformed payload: {message}")]
    Payload { provider: String, message: String },

    #[error("provider '{provider}' is disabled: {reason}")]
    Disabled { provider: String, reason: String },

    #[error("unknown provider: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// HTTP status associated with this failure, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether another attempt against the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network { .. } | ProviderError::RateLimited { .. } => true,
            ProviderError::Http { status, .. } => *status >= 500,
            ProviderError::Payload { .. }
            | ProviderError::Disabled { .. }
            | ProviderError::Unknown(_) => false,
        }
    }
}
