//! In-process backend implementing both contracts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::pubsub::{PubSub, Subscription};
use crate::store::{AttrMap, HashStore};

/// Buffered messages per channel before slow subscribers start dropping.
const CHANNEL_CAPACITY: usize = 256;

/// In-process store and transport backed by maps and broadcast channels.
///
/// Gives tests and single-process deployments the full contract surface
/// without an external service: records merge hash-field style, publishes
/// fan out to every live subscriber of a channel. A subscriber that falls
/// more than [`CHANNEL_CAPACITY`] messages behind loses the oldest ones,
/// matching the no-guaranteed-delivery contract.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, AttrMap>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record at `key`, if any. Test hook.
    pub async fn record(&self, key: &str) -> Option<AttrMap> {
        self.records.read().await.get(key).cloned()
    }

    async fn channel(&self, name: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl HashStore for MemoryBackend {
    async fn write_fields(&self, key: &str, fields: &AttrMap) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut records = self.records.write().await;
        let record = records.entry(key.to_string()).or_default();
        for (attribute, value) in fields {
            record.insert(attribute.clone(), value.clone());
        }
        Ok(())
    }

    async fn read_fields(&self, key: &str) -> StoreResult<AttrMap> {
        let records = self.records.read().await;
        records
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl PubSub for MemoryBackend {
    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        let sender = self.channel(channel).await;
        // A send with no subscribers is a successful publish into the void.
        let _ = sender.send(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<Box<dyn Subscription>> {
        let receiver = self.channel(channel).await.subscribe();
        Ok(Box::new(MemorySubscription { receiver }))
    }
}

struct MemorySubscription {
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("subscriber lagged, {skipped} message(s) dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
