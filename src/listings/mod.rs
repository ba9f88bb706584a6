pub(crate) mod listings_model;
pub(crate) mod listings_repository;

pub use listings_model::{
    Listing, ListingDB, ListingStatus, NewListingDB, NewPriceSnapshot, PriceSnapshotDB,
    UpsertResult,
};
pub use listings_repository::ListingRepository;
