//! Core identifier types for FieldCast.
//!
//! This crate defines the process-local identifier machinery used throughout
//! the replication core:
//! - 128-bit lexicographically sortable identifiers (48-bit millisecond
//!   timestamp + 80-bit monotonic randomness), rendered as 26 characters of
//!   Crockford base32
//! - The prefixed object identifier (`<prefix>:<sortable-id>`) that keys
//!   persisted records, broadcast payloads, and mirror registrations
//! - Wall-clock helpers for the persisted `created_at`/`updated_at` stamps
//!
//! Identifier generation is pure and process-local; nothing in this crate
//! touches the store or the transport.

mod clock;
mod ids;

pub use clock::{unix_millis, unix_seconds};
pub use ids::{ObjectId, Ulid, UlidGenerator};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur parsing identifiers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid identifier length: expected {expected} characters, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid character {0:?} in identifier")]
    InvalidChar(char),

    #[error("identifier value does not fit in 128 bits")]
    Overflow,

    #[error("identifier {0:?} is missing its prefix qualifier")]
    MissingPrefix(String),

    #[error("identifier {0:?} has an empty prefix")]
    EmptyPrefix(String),
}
