//! Error types for bracket operations.

use thiserror::Error;

use crate::model::MatchId;

/// Errors surfaced by bracket operations.
///
/// Validation errors abort before any storage write. Storage errors may
/// leave a propagation partially applied; repeating the same update is
/// idempotent and re-converges the state.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed creation options or operation input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A provided opponent id does not match the participant occupying that slot.
    #[error("invalid opponent: {0}")]
    InvalidOpponent(String),

    /// A score is out of range for the match being updated.
    #[error("invalid score: {0}")]
    InvalidScore(String),

    /// The declared results are contradictory.
    #[error("invalid result: {0}")]
    InvalidResult(String),

    /// The operation is not allowed in the entity's current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A downstream match has a recorded outcome; it must be reset first.
    #[error("cannot reset: downstream match {0} is already completed")]
    CannotResetDownstreamCompleted(MatchId),

    /// The match is decided by its child games; update those instead.
    #[error("match {0} aggregates child games; update the games instead")]
    UseMatchGameUpdate(MatchId),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    pub(crate) fn not_found(entity: &str, id: i64) -> Self {
        Error::NotFound(format!("{entity} {id}"))
    }
}

/// Opaque failure reported by a storage backend.
///
/// Backends map their own error shapes into this type; the core never
/// inspects anything beyond the message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Result type for bracket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for storage backends.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
