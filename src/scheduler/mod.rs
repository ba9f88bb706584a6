pub(crate) mod scheduler_repository;
pub(crate) mod scheduler_service;

pub use scheduler_repository::{SchedulerLock, SchedulerLockRepository};
pub use scheduler_service::{SchedulerHealth, SchedulerService};
