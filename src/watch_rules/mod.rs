pub(crate) mod watch_rules_model;
pub(crate) mod watch_rules_repository;

pub use watch_rules_model::{NewWatchSearchRule, WatchSearchRule};
pub use watch_rules_repository::WatchRuleRepository;
