//! Field-level replication of named objects across processes.
//!
//! One process mutates an object, persists only the fields that changed to
//! a shared hash-field store, and broadcasts that change-set; every other
//! process holding a registered mirror of the object has the fields applied
//! in place without re-reading the store.
//!
//! # Architecture
//!
//! - [`ObjectHandle`] carries identity plus the snapshot its saves diff
//!   against, and drives any [`fieldcast_model::Replicated`] value
//! - [`ChangeTracker`] decides what a save must write
//! - [`ChangeMessage`] is the broadcast wire payload
//! - [`Broadcaster`] publishes after the write is durable
//! - [`MirrorRegistry`] and [`ChangeListener`] apply remote change-sets to
//!   local mirrors from a background task
//!
//! # Consistency
//!
//! Writes resolve per attribute, last writer wins. Two handles bound to the
//! same object diff against their own snapshots and overwrite each other
//! without detection, so writers that share an object should own disjoint
//! attributes or coordinate externally. A save is durable once the store
//! write succeeds; broadcast is advisory.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use fieldcast_store::MemoryBackend;
//! use fieldcast_sync::{HandleConfig, ObjectHandle};
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let handle = ObjectHandle::new(
//!     backend.clone(),
//!     backend,
//!     HandleConfig::for_prefix("user"),
//! );
//! assert!(handle.id().is_none());
//! ```

mod broadcast;
mod error;
mod handle;
mod listener;
mod protocol;
mod registry;
mod tracker;

pub use broadcast::Broadcaster;
pub use error::{SyncError, SyncResult};
pub use handle::{HandleConfig, ObjectHandle};
pub use listener::ChangeListener;
pub use protocol::ChangeMessage;
pub use registry::{MirrorRegistry, SharedMirror};
pub use tracker::{CREATED_AT, ChangeTracker, UPDATED_AT};
