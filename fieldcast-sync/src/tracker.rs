//! Snapshot and dirty-set bookkeeping behind every save.

use std::collections::HashSet;

use fieldcast_store::AttrMap;

/// Attribute recording when the object was first persisted.
pub const CREATED_AT: &str = "created_at";

/// Attribute recording when the object was last persisted.
pub const UPDATED_AT: &str = "updated_at";

/// Tracks what one handle believes the store holds for its object.
///
/// The snapshot is the handle's local belief about the last-persisted
/// attribute values. It is the baseline every diff compares against and is
/// never re-read from the store, so two handles bound to the same object
/// each diff against their own history. The dirty-set names attributes whose
/// inclusion in the next diff is forced regardless of value comparison,
/// which is how in-place mutations of unobservable interior state still
/// reach the store.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    snapshot: AttrMap,
    dirty: HashSet<String>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces an attribute into the next diff. Idempotent.
    pub fn mark_changed(&mut self, attribute: impl Into<String>) {
        self.dirty.insert(attribute.into());
    }

    /// The last-persisted attribute values as this tracker believes them.
    #[must_use]
    pub fn snapshot(&self) -> &AttrMap {
        &self.snapshot
    }

    /// Computes what a save must write.
    ///
    /// An attribute from `current` is included when the snapshot has no
    /// value for it, when its value differs from the snapshot's, or when it
    /// is marked dirty. `updated_at` is stamped with `now` (seconds since
    /// the Unix epoch) on every diff; `created_at` is stamped only when the
    /// snapshot has never seen one, so it survives every later save.
    pub fn diff<'a, I>(&self, current: I, now: u64) -> AttrMap
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut changes = AttrMap::new();
        for (attribute, value) in current {
            let include = match self.snapshot.get(attribute) {
                None => true,
                Some(previous) => *previous != value || self.dirty.contains(attribute),
            };
            if include {
                changes.insert(attribute.to_owned(), value);
            }
        }

        let stamp = now.to_string();
        if !self.snapshot.contains_key(CREATED_AT) {
            changes.insert(CREATED_AT.to_owned(), stamp.clone());
        }
        changes.insert(UPDATED_AT.to_owned(), stamp);
        changes
    }

    /// Commits a completed write: the snapshot absorbs exactly the written
    /// pairs and the dirty-set clears.
    pub fn record_write(&mut self, written: &AttrMap) {
        for (attribute, value) in written {
            self.snapshot.insert(attribute.clone(), value.clone());
        }
        self.dirty.clear();
    }

    /// Resets the tracker to a freshly loaded record.
    pub fn replace(&mut self, record: AttrMap) {
        self.snapshot = record;
        self.dirty.clear();
    }
}
