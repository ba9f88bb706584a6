pub(crate) mod runner_model;
pub(crate) mod runner_service;

pub use runner_model::{ProviderOutcome, ProviderRunStatus, RuleRunSummary, RunOutcome};
pub use runner_service::RuleRunner;
