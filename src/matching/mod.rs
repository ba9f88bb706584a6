pub(crate) mod enrichment;
pub(crate) mod matching_errors;
pub(crate) mod matching_model;
pub(crate) mod matching_repository;
pub(crate) mod matching_service;

pub use enrichment::{best_candidate, normalize_title, CandidateScore};
pub use matching_errors::MatchingError;
pub use matching_model::{IngestStats, NewWatchMatch, WatchMatchDB};
pub use matching_repository::WatchMatchRepository;
pub use matching_service::MatchingService;
