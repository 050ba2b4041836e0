//! Common error types for the Re-Chat battle services

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Common result type for battle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy across the battle protocol crates
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid verse set or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session or chain record for the requested battle
    #[error("Battle {0} not found")]
    NotFound(u64),

    /// Operation not permitted in the session's current status
    #[error("Illegal state for battle {battle_id}: {reason}")]
    IllegalState { battle_id: u64, reason: String },

    /// Reveal window elapsed before the entry was revealed
    #[error("Battle {battle_id} reveal window expired at {deadline}")]
    Expired {
        battle_id: u64,
        deadline: DateTime<Utc>,
    },

    /// Chain client failure, message passed through verbatim
    #[error("Chain error: {0}")]
    Chain(String),

    /// Social client failure, message passed through verbatim
    #[error("Social error: {0}")]
    Social(String),

    /// Transcript source failure, message passed through verbatim
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant breach inside the library
    #[error("Internal error: {0}")]
    Internal(String),
}
