//! The flat hash-field store contract.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Attribute-name to text-value mapping: a persisted record, a read result,
/// or a change-set. Values are flat text regardless of a field's native type.
pub type AttrMap = HashMap<String, String>;

/// A store exposing per-key flat hash-field records, addressed by object
/// identifier.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Merges `fields` into the record at `key`, creating the record if it
    /// does not exist. Fields the map does not name are left untouched, so
    /// writers touching disjoint attributes do not clobber each other.
    async fn write_fields(&self, key: &str, fields: &AttrMap) -> StoreResult<()>;

    /// Reads every field of the record at `key`.
    ///
    /// A key with no record fails with [`StoreError::NotFound`]; an empty
    /// result is never silently treated as success.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn read_fields(&self, key: &str) -> StoreResult<AttrMap>;
}
