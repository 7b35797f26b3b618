//! Best-effort publication of change-sets.

use std::sync::Arc;

use fieldcast_store::{AttrMap, PubSub};
use fieldcast_types::ObjectId;

use crate::error::{SyncError, SyncResult};
use crate::protocol::ChangeMessage;

/// Publishes change-sets on a fixed channel.
///
/// Broadcast happens after the store write succeeded, so the save is
/// already durable when a publish fails. Callers log the failure and move
/// on; peers that missed the message still converge on their next load.
#[derive(Clone)]
pub struct Broadcaster {
    bus: Arc<dyn PubSub>,
    channel: String,
}

impl Broadcaster {
    /// Creates a broadcaster bound to `channel`.
    pub fn new(bus: Arc<dyn PubSub>, channel: impl Into<String>) -> Self {
        Self {
            bus,
            channel: channel.into(),
        }
    }

    /// The channel this broadcaster publishes on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Serializes and publishes one change-set.
    pub async fn publish(&self, id: &ObjectId, changes: &AttrMap) -> SyncResult<()> {
        let payload = ChangeMessage::new(id.clone(), changes.clone()).encode()?;
        self.bus
            .publish(&self.channel, &payload)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(())
    }
}
