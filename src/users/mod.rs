pub(crate) mod users_model;
pub(crate) mod users_repository;

pub use users_model::{NewUser, User};
pub use users_repository::UserRepository;
