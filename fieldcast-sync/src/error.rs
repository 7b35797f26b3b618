//! Error types for replication operations.

use fieldcast_store::StoreError;
use thiserror::Error;

/// Result type for replication operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while saving, loading, or listening.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A load targeted an identifier with no persisted record.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A load targeted a handle that is already bound to another object.
    #[error("handle already bound to {bound}, cannot load {requested}")]
    AlreadyBound {
        /// Identifier the handle is bound to.
        bound: String,
        /// Identifier the load asked for.
        requested: String,
    },

    /// The store failed a read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The transport failed a publish or subscribe.
    #[error("transport error: {0}")]
    Transport(String),

    /// A listener was asked to start after it had been stopped.
    #[error("listener already stopped")]
    ListenerStopped,

    /// A change-set could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
