use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchingError {
    /// A data-integrity assumption broke. Surfaced to operators, never
    /// papered over by the engine.
    #[error("Matching invariant violation: {0}")]
    InvariantViolation(String),

    /// An immutable identity field on a stored listing disagrees with a
    /// fresh sighting of the same dedup key. Fatal for that record.
    #[error("Identity conflict on listing {listing_id}: {field} stored={stored} incoming={incoming}")]
    IdentityConflict {
        listing_id: String,
        field: String,
        stored: i64,
        incoming: i64,
    },
}
