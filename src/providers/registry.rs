use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::settings::ProviderSettings;

use super::mock_provider::MockProvider;
use super::providers_errors::ProviderError;
use super::providers_traits::ProviderClient;
use super::retry::RetryPolicy;

/// Interface map from provider id to implementation, built once at startup
/// from enabled configuration.
///
/// A provider that is registered but disabled in settings resolves to
/// `ProviderError::Disabled` so callers skip it without attempting a call.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    settings: ProviderSettings,
}

impl ProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            providers: HashMap::new(),
            settings,
        }
    }

    /// Registry with the built-in deterministic mock adapter registered.
    pub fn with_builtin_providers(settings: ProviderSettings) -> Self {
        let mut registry = Self::new(settings);
        registry.register(Arc::new(MockProvider::default()));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ProviderClient>) {
        let id = provider.id().to_string();
        info!(
            "Registered provider '{}' (supports_search={}, requires_auth={})",
            id,
            provider.capability_contract().supports_search,
            provider.capability_contract().requires_auth,
        );
        self.providers.insert(id, provider);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(ProviderError::Unknown("<empty>".to_string()));
        }

        if !self.settings.is_enabled(&key) {
            return Err(ProviderError::Disabled {
                provider: key,
                reason: "disabled by configuration".to_string(),
            });
        }

        self.providers
            .get(&key)
            .cloned()
            .ok_or(ProviderError::Unknown(key))
    }

    pub fn retry_policy(&self, name: &str) -> RetryPolicy {
        self.settings.retry_for(name).into()
    }

    /// Sources used when a rule's query names none.
    pub fn default_sources(&self) -> Vec<String> {
        self.settings.default_sources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_resolves_to_disabled_error() {
        let mut settings = ProviderSettings::default();
        settings.enabled.insert("mock".to_string(), false);
        let registry = ProviderRegistry::with_builtin_providers(settings);

        match registry.resolve("mock") {
            Err(ProviderError::Disabled { provider, .. }) => assert_eq!(provider, "mock"),
            other => panic!("expected Disabled, got {:?}", other.map(|p| p.id())),
        }
    }

    #[test]
    fn unknown_provider_resolves_to_unknown_error() {
        let registry = ProviderRegistry::with_builtin_providers(ProviderSettings::default());
        assert!(matches!(
            registry.resolve("craigslist"),
            Err(ProviderError::Unknown(_))
        ));
    }

    #[test]
    fn resolve_normalizes_case_and_whitespace() {
        let registry = ProviderRegistry::with_builtin_providers(ProviderSettings::default());
        let provider = registry.resolve("  Mock ").unwrap();
        assert_eq!(provider.id(), "mock");
    }
}
