pub(crate) mod events_model;
pub(crate) mod events_repository;

pub use events_model::{EventDB, EventType, NewEvent};
pub use events_repository::EventRepository;
