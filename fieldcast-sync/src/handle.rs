//! The object handle: identity, save, and load.

use std::sync::Arc;

use fieldcast_model::Replicated;
use fieldcast_store::{AttrMap, HashStore, PubSub, StoreError};
use fieldcast_types::{ObjectId, UlidGenerator, unix_seconds};
use tracing::{debug, warn};

use crate::broadcast::Broadcaster;
use crate::error::{SyncError, SyncResult};
use crate::tracker::ChangeTracker;

/// Configuration fixed at handle construction.
#[derive(Debug, Clone)]
pub struct HandleConfig {
    /// Prefix minted into this handle's identifiers.
    pub prefix: String,
    /// Channel change-sets are broadcast on.
    pub channel: String,
}

impl HandleConfig {
    /// A config for `prefix` with the conventional `<prefix>-updates`
    /// broadcast channel.
    pub fn for_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let channel = format!("{prefix}-updates");
        Self { prefix, channel }
    }

    /// Overrides the broadcast channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self::for_prefix("obj")
    }
}

/// One process's handle on a replicated object.
///
/// The handle carries identity and the snapshot its diffs compare against;
/// it does not carry the object. `save` reads any [`Replicated`] value
/// through its schema and `load` writes one back the same way, so the
/// handle stays decoupled from the concrete type it replicates.
///
/// A handle starts unbound. The first successful `save` mints an identifier
/// and binds to it; `load` binds to the identifier it was given. Once
/// bound, the identifier never changes for the life of the handle.
pub struct ObjectHandle {
    store: Arc<dyn HashStore>,
    broadcaster: Broadcaster,
    config: HandleConfig,
    ids: UlidGenerator,
    id: Option<ObjectId>,
    tracker: ChangeTracker,
}

impl ObjectHandle {
    /// Creates an unbound handle over the given store and transport.
    pub fn new(store: Arc<dyn HashStore>, bus: Arc<dyn PubSub>, config: HandleConfig) -> Self {
        let broadcaster = Broadcaster::new(bus, config.channel.clone());
        Self {
            store,
            broadcaster,
            config,
            ids: UlidGenerator::new(),
            id: None,
            tracker: ChangeTracker::new(),
        }
    }

    /// The bound identifier, or `None` before the first save or load.
    #[must_use]
    pub fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    /// The prefix minted into this handle's identifiers.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// The channel this handle broadcasts on.
    #[must_use]
    pub fn channel(&self) -> &str {
        self.broadcaster.channel()
    }

    /// The attribute values this handle last wrote or loaded.
    #[must_use]
    pub fn snapshot(&self) -> &AttrMap {
        self.tracker.snapshot()
    }

    /// Forces an attribute into the next save's change-set. Idempotent.
    pub fn mark_changed(&mut self, attribute: impl Into<String>) {
        self.tracker.mark_changed(attribute);
    }

    /// Persists `object`'s changes and broadcasts them.
    ///
    /// The change-set holds every attribute that is new or changed since
    /// this handle's last save or load, plus any attribute forced in with
    /// [`mark_changed`](Self::mark_changed), plus the timestamp
    /// bookkeeping. A first save mints the identifier but binds it only
    /// once the write succeeds, so a failed first save leaves the handle
    /// unbound and the retry mints afresh.
    ///
    /// A broadcast failure does not fail the save; the write is already
    /// durable and peers converge on their next load.
    pub async fn save<T>(&mut self, object: &T) -> SyncResult<()>
    where
        T: Replicated + ?Sized,
    {
        let id = match &self.id {
            Some(id) => id.clone(),
            None => ObjectId::generate(self.config.prefix.clone(), &mut self.ids),
        };

        let schema = object.schema();
        let mut current = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            if let Some(value) = object.field(&field.name) {
                current.push((field.attribute.as_str(), value));
            }
        }
        let changes = self.tracker.diff(current, unix_seconds());

        let key = id.to_string();
        self.store.write_fields(&key, &changes).await?;
        if self.id.is_none() {
            self.id = Some(id.clone());
        }

        if let Err(e) = self.broadcaster.publish(&id, &changes).await {
            warn!("broadcast for {key} failed after durable save: {e}");
        }

        self.tracker.record_write(&changes);
        debug!("saved {} attribute(s) for {key}", changes.len());
        Ok(())
    }

    /// Loads the record at `id` into `object` and binds the handle to it.
    ///
    /// Attributes in the record that do not map to a field of `object`'s
    /// type are ignored; fields with no attribute in the record keep their
    /// current value. Reloading the identifier a handle is already bound to
    /// refreshes its snapshot; loading a different one fails with
    /// [`SyncError::AlreadyBound`].
    ///
    /// Fails with [`SyncError::NotFound`] when no record exists, leaving
    /// `object` and the handle untouched.
    pub async fn load<T>(&mut self, id: ObjectId, object: &mut T) -> SyncResult<()>
    where
        T: Replicated + ?Sized,
    {
        if let Some(bound) = &self.id {
            if *bound != id {
                return Err(SyncError::AlreadyBound {
                    bound: bound.to_string(),
                    requested: id.to_string(),
                });
            }
        }

        let key = id.to_string();
        let record = match self.store.read_fields(&key).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Err(SyncError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };

        let schema = object.schema();
        for field in schema.fields() {
            if let Some(value) = record.get(&field.attribute) {
                object.set_field(&field.name, value);
            }
        }

        let loaded = record.len();
        self.id = Some(id);
        self.tracker.replace(record);
        debug!("loaded {loaded} attribute(s) from {key}");
        Ok(())
    }
}
