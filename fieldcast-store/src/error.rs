/// Errors surfaced by store and transport backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists under the identifier.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The backend failed or is unreachable.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store and transport operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
