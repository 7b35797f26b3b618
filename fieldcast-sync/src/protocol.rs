//! Wire format for broadcast change-sets.
//!
//! Every successful save publishes exactly one message: the object's
//! identifier plus the attributes that save wrote. A channel may carry
//! messages for objects a given process never mirrors, so consumers treat
//! unknown identifiers as noise and discard payloads they cannot parse.

use fieldcast_store::AttrMap;
use fieldcast_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// A broadcast change-set, `{"id": ..., "changes": {...}}` on the wire.
///
/// Unknown keys in the payload are ignored on decode, so the format can
/// grow without breaking older consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    /// Identifier of the object the changes belong to.
    pub id: ObjectId,
    /// Attribute-to-value pairs this save wrote.
    pub changes: AttrMap,
}

impl ChangeMessage {
    /// Creates the message for one save.
    #[must_use]
    pub fn new(id: ObjectId, changes: AttrMap) -> Self {
        Self { id, changes }
    }

    /// Renders the JSON wire form.
    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the JSON wire form.
    pub fn decode(payload: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
