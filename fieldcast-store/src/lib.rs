//! External-collaborator contracts for FieldCast.
//!
//! The replication core talks to two services, both injected as trait
//! objects:
//! - [`HashStore`]: a flat hash-field key-value store (write merges fields,
//!   read returns the whole record, missing records are a distinguished
//!   not-found)
//! - [`PubSub`]: a named-channel publish/subscribe transport with
//!   best-effort delivery
//!
//! [`MemoryBackend`] implements both in-process and is what the test suites
//! and single-process deployments run against; `fieldcast-redis` provides the
//! same contracts over a real Redis.

mod error;
mod memory;
mod pubsub;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use pubsub::{PubSub, Subscription};
pub use store::{AttrMap, HashStore};
