use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry tuning for one provider's outbound calls.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms))
    }
}

/// Per-provider configuration owned by the hosting application.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Providers that may be called. A provider missing from this map,
    /// or mapped to `false`, is skipped without being attempted.
    pub enabled: HashMap<String, bool>,
    pub retry: HashMap<String, RetrySettings>,
    /// Sources assumed when a rule's query names none.
    pub default_sources: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: HashMap::from([("mock".to_string(), true)]),
            retry: HashMap::new(),
            default_sources: vec!["mock".to_string()],
            timeout_seconds: 10,
        }
    }
}

impl ProviderSettings {
    pub fn is_enabled(&self, provider: &str) -> bool {
        self.enabled.get(provider).copied().unwrap_or(false)
    }

    pub fn retry_for(&self, provider: &str) -> RetrySettings {
        self.retry.get(provider).copied().unwrap_or_default()
    }
}

/// Scheduler cadence and batching knobs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub tick_interval_seconds: u64,
    /// Upper bound on due rules dispatched per tick.
    pub batch_size: i64,
    /// Per-rule listing fetch limit handed to providers.
    pub rule_limit: u32,
    /// Window after a run completes during which the rule is not re-claimed.
    pub cooldown_seconds: i64,
    /// A lock older than this is considered abandoned and may be stolen.
    pub lock_timeout_seconds: i64,
    pub max_concurrent_runs: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 15,
            batch_size: 100,
            rule_limit: 20,
            cooldown_seconds: 30,
            lock_timeout_seconds: 600,
            max_concurrent_runs: 8,
        }
    }
}
