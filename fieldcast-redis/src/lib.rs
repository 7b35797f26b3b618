//! Redis-backed store and transport.
//!
//! [`RedisBackend`] maps the store traits onto Redis primitives: records
//! are hashes written with `HSET` and read with `HGETALL`, broadcast rides
//! on pub/sub channels. One backend serves both roles, so a single URL
//! wires up a whole process.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Msg};
use tracing::{debug, warn};

use fieldcast_store::{AttrMap, HashStore, PubSub, StoreError, StoreResult, Subscription};

fn backend_err(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// A Redis connection serving as both hash-field store and broadcast bus.
///
/// Commands share one multiplexed connection; each subscription gets a
/// dedicated connection because Redis parks it in subscriber mode.
pub struct RedisBackend {
    client: Client,
    connection: MultiplexedConnection,
}

impl RedisBackend {
    /// Connects to the Redis instance at `url`, for example
    /// `redis://127.0.0.1:6379`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(backend_err)?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(backend_err)?;
        debug!("connected to redis at {url}");
        Ok(Self { client, connection })
    }
}

#[async_trait]
impl HashStore for RedisBackend {
    async fn write_fields(&self, key: &str, fields: &AttrMap) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(attribute, value)| (attribute.as_str(), value.as_str()))
            .collect();
        let mut connection = self.connection.clone();
        let _: () = connection
            .hset_multiple(key, &items)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn read_fields(&self, key: &str) -> StoreResult<AttrMap> {
        let mut connection = self.connection.clone();
        let record: HashMap<String, String> =
            connection.hgetall(key).await.map_err(backend_err)?;
        if record.is_empty() {
            return Err(StoreError::NotFound(key.to_owned()));
        }
        Ok(record)
    }
}

#[async_trait]
impl PubSub for RedisBackend {
    async fn publish(&self, channel: &str, payload: &str) -> StoreResult<()> {
        let mut connection = self.connection.clone();
        let _: () = connection
            .publish(channel, payload)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<Box<dyn Subscription>> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(backend_err)?;
        pubsub.subscribe(channel).await.map_err(backend_err)?;
        Ok(Box::new(RedisSubscription {
            stream: Box::pin(pubsub.into_on_message()),
        }))
    }
}

struct RedisSubscription {
    stream: Pin<Box<dyn Stream<Item = Msg> + Send>>,
}

#[async_trait]
impl Subscription for RedisSubscription {
    async fn recv(&mut self) -> Option<String> {
        loop {
            let message = self.stream.next().await?;
            match message.get_payload::<String>() {
                Ok(payload) => return Some(payload),
                Err(e) => warn!("dropping undecodable pub/sub payload: {e}"),
            }
        }
    }
}
