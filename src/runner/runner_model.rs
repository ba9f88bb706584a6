use serde::{Deserialize, Serialize};

use crate::matching::IngestStats;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failed => "failed",
        }
    }
}

/// Per-provider result within one rule run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProviderRunStatus {
    Succeeded { fetched: usize },
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub provider: String,
    #[serde(flatten)]
    pub status: ProviderRunStatus,
}

impl ProviderOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.status, ProviderRunStatus::Failed { .. })
    }
}

/// What one end-to-end rule execution did, fed into scheduler telemetry.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RuleRunSummary {
    pub rule_id: String,
    pub outcome: RunOutcome,
    pub stats: IngestStats,
    pub providers: Vec<ProviderOutcome>,
}

impl RuleRunSummary {
    /// A run is failed iff any configured provider failed; skipped
    /// providers (disabled in config) do not count against the run.
    pub fn outcome_from(providers: &[ProviderOutcome]) -> RunOutcome {
        if providers.iter().any(ProviderOutcome::failed) {
            RunOutcome::Failed
        } else {
            RunOutcome::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ProviderRunStatus) -> ProviderOutcome {
        ProviderOutcome {
            provider: "mock".to_string(),
            status,
        }
    }

    #[test]
    fn any_provider_failure_fails_the_run() {
        let providers = vec![
            outcome(ProviderRunStatus::Succeeded { fetched: 3 }),
            outcome(ProviderRunStatus::Failed {
                error: "timeout".to_string(),
            }),
        ];
        assert_eq!(RuleRunSummary::outcome_from(&providers), RunOutcome::Failed);
    }

    #[test]
    fn skipped_providers_do_not_fail_the_run() {
        let providers = vec![
            outcome(ProviderRunStatus::Succeeded { fetched: 3 }),
            outcome(ProviderRunStatus::Skipped {
                reason: "disabled".to_string(),
            }),
        ];
        assert_eq!(RuleRunSummary::outcome_from(&providers), RunOutcome::Success);
    }
}
