pub mod db;

pub mod clock;
pub mod constants;
pub mod errors;
pub mod events;
pub mod listings;
pub mod matching;
pub mod notifications;
pub mod providers;
pub mod runner;
pub mod scheduler;
pub mod schema;
pub mod settings;
pub mod users;
pub mod watch_releases;
pub mod watch_rules;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{Error, Result};
pub use matching::MatchingService;
pub use notifications::NotificationDispatcher;
pub use runner::RuleRunner;
pub use scheduler::SchedulerService;
