//! Identifier-to-mirror associations and remote change application.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use fieldcast_model::Replicated;
use fieldcast_types::ObjectId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::protocol::ChangeMessage;

/// A registered mirror: owned by the caller, written by the registry.
pub type SharedMirror = Arc<RwLock<dyn Replicated>>;

/// Maps identifiers to locally registered mirrors.
///
/// The registry never owns a mirror. It holds a `Weak` reference plus the
/// right to write fields in place when a matching change-set arrives, and
/// dropping the owning `Arc` retires the registration. Dead entries are
/// pruned when a message next targets them. At most one mirror per
/// identifier; registering again replaces the previous entry.
#[derive(Default)]
pub struct MirrorRegistry {
    mirrors: RwLock<HashMap<ObjectId, Weak<RwLock<dyn Replicated>>>>,
}

impl MirrorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `id` with `mirror`. The last registration for an
    /// identifier wins.
    pub async fn register(&self, id: ObjectId, mirror: SharedMirror) {
        self.mirrors.write().await.insert(id, Arc::downgrade(&mirror));
    }

    /// Removes the registration for `id`. Returns whether one existed.
    pub async fn unregister(&self, id: &ObjectId) -> bool {
        self.mirrors.write().await.remove(id).is_some()
    }

    /// Number of registrations, dead entries included until pruned.
    pub async fn len(&self) -> usize {
        self.mirrors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mirrors.read().await.is_empty()
    }

    /// Applies a change-set to the mirror registered for its identifier.
    ///
    /// Returns `None` when no live mirror is registered for the message's
    /// identifier, otherwise the number of fields written. Attributes that
    /// do not map to a field of the mirror's type are skipped, as are
    /// values the mirror's field cannot parse.
    pub async fn apply(&self, message: &ChangeMessage) -> Option<usize> {
        let entry = {
            let mirrors = self.mirrors.read().await;
            mirrors.get(&message.id)?.clone()
        };

        let Some(mirror) = entry.upgrade() else {
            // The owning Arc is gone; retire the entry unless a newer
            // registration raced in behind our read lock.
            let mut mirrors = self.mirrors.write().await;
            if let Some(current) = mirrors.get(&message.id) {
                if current.strong_count() == 0 {
                    mirrors.remove(&message.id);
                    debug!("pruned dead mirror for {}", message.id);
                }
            }
            return None;
        };

        let mut object = mirror.write().await;
        let schema = object.schema();
        let mut applied = 0;
        for (attribute, value) in &message.changes {
            let Some(field) = schema.field_by_attribute(attribute) else {
                continue;
            };
            if object.set_field(&field.name, value) {
                applied += 1;
            } else {
                debug!(
                    "mirror for {} rejected value for field {}",
                    message.id, field.name
                );
            }
        }
        Some(applied)
    }
}
