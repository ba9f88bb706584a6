pub(crate) mod settings_model;

pub use settings_model::{ProviderSettings, RetrySettings, SchedulerSettings};
