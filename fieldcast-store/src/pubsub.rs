//! The publish/subscribe transport contract.

use async_trait::async_trait;

use crate::error::StoreResult;

/// A named-channel publish/subscribe transport.
///
/// Delivery is best-effort: no acknowledgement, no replay for subscribers
/// that were not listening, no ordering guarantee beyond what the transport
/// naturally preserves per channel.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publishes a payload to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()>;

    /// Opens a subscription on `channel`.
    async fn subscribe(&self, channel: &str) -> StoreResult<Box<dyn Subscription>>;
}

/// A live subscription feed.
#[async_trait]
pub trait Subscription: Send {
    /// Returns the next payload in the transport's delivery order.
    /// Returns `None` once the transport is shutting down.
    async fn recv(&mut self) -> Option<String>;
}
