pub(crate) mod watch_releases_model;
pub(crate) mod watch_releases_repository;

pub use watch_releases_model::{MatchMode, NewWatchRelease, WatchRelease};
pub use watch_releases_repository::WatchReleaseRepository;
