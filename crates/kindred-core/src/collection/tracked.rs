//! Change-tracked child collection
//!
//! The live map is authoritative; three dirty sets record which ids need an
//! INSERT, UPDATE or DELETE at the next sync. Nothing here performs I/O: the
//! store crate reads the pending sets and acknowledges each phase once its
//! statements succeed.
//!
//! Not thread-safe (no locking); every mutation takes `&mut self`, so one
//! owner per parent entity.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::errors::{KindredError, Result};
use crate::model::TrackedRecord;

/// Where a collection persists: set once, on first parent insert or load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub connection_string: String,
    pub parent_id: i64,
    pub table_name: String,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Dirty-tracked, in-memory-authoritative set of child records
///
/// Invariants:
/// - `added` ⊆ keys of `items`
/// - `added ∩ modified = ∅`
/// - `added ∩ deleted = ∅`
/// - ids in `deleted` are never in `items`
#[derive(Debug, Clone)]
pub struct TrackedCollection<T: TrackedRecord> {
    items: BTreeMap<String, T>,
    added: BTreeSet<String>,
    modified: BTreeSet<String>,
    deleted: BTreeSet<String>,
    binding: Option<Binding>,
}

impl<T: TrackedRecord> Default for TrackedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TrackedRecord> TrackedCollection<T> {
    /// Create an empty, unbound collection
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            added: BTreeSet::new(),
            modified: BTreeSet::new(),
            deleted: BTreeSet::new(),
            binding: None,
        }
    }

    // ===== Binding =====

    /// Bind to a database, parent and child table
    ///
    /// First bind wins; later calls are ignored and return `false`. Binding
    /// backfills `parent_id` on every live record, since records added
    /// before the parent was inserted carry no parent id yet.
    pub fn bind(
        &mut self,
        connection_string: impl Into<String>,
        parent_id: i64,
        table_name: impl Into<String>,
    ) -> bool {
        if self.binding.is_some() {
            return false;
        }

        for item in self.items.values_mut() {
            item.set_parent_id(parent_id);
        }

        self.binding = Some(Binding {
            connection_string: connection_string.into(),
            parent_id,
            table_name: table_name.into(),
        });
        true
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Owning parent id, 0 while unbound
    pub fn parent_id(&self) -> i64 {
        self.binding.as_ref().map(|b| b.parent_id).unwrap_or(0)
    }

    // ===== Mutation =====

    /// Add a record, assigning an id and timestamps if missing
    ///
    /// Always overwrites `parent_id`. Returns the record's id.
    ///
    /// Re-adding an id that is already persisted (live and clean, or removed
    /// earlier in this cycle) schedules an UPDATE rather than an INSERT.
    pub fn add(&mut self, item: T) -> String {
        self.add_at(item, now_ms())
    }

    /// Add several records with one shared timestamp
    pub fn add_range<I>(&mut self, items: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
    {
        let now = now_ms();
        items
            .into_iter()
            .map(|item| self.add_at(item, now))
            .collect()
    }

    fn add_at(&mut self, mut item: T, now: i64) -> String {
        if item.id().is_empty() {
            item.set_id(Uuid::now_v7().to_string());
        }
        if item.created_at() == 0 {
            item.set_created_at(now);
        }
        if item.updated_at() == 0 {
            item.set_updated_at(now);
        }
        item.set_parent_id(self.parent_id());

        let id = item.id().to_string();
        let persisted = self.deleted.remove(&id)
            || (self.items.contains_key(&id) && !self.added.contains(&id));

        if persisted {
            self.modified.insert(id.clone());
        } else {
            self.added.insert(id.clone());
        }
        self.items.insert(id.clone(), item);
        id
    }

    /// Replace a live record and schedule an UPDATE
    ///
    /// Refreshes `updated_at`. `created_at` and `parent_id` are kept from
    /// the live record, whatever the replacement carries. A record still
    /// pending INSERT stays in the insert set only.
    ///
    /// # Errors
    ///
    /// Returns `MissingRecordId` for an empty id, or `RecordNotFound` if the
    /// id is not in the live map.
    pub fn update(&mut self, mut item: T) -> Result<()> {
        if item.id().is_empty() {
            return Err(KindredError::MissingRecordId);
        }
        let Some(current) = self.items.get(item.id()) else {
            return Err(KindredError::RecordNotFound {
                id: item.id().to_string(),
            });
        };

        item.set_created_at(current.created_at());
        item.set_parent_id(self.parent_id());
        item.set_updated_at(now_ms());
        let id = item.id().to_string();
        self.mark_modified(&id);
        self.items.insert(id, item);
        Ok(())
    }

    /// Mutate a live record in place, then treat it as updated
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the id is not in the live map.
    pub fn modify<F>(&mut self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| KindredError::RecordNotFound { id: id.to_string() })?;

        f(item);
        // the closure must not re-key the record
        item.set_id(id.to_string());
        item.set_updated_at(now_ms());
        self.mark_modified(id);
        Ok(())
    }

    fn mark_modified(&mut self, id: &str) {
        if !self.added.contains(id) {
            self.modified.insert(id.to_string());
        }
    }

    /// Remove a record by value; see [`remove_by_id`](Self::remove_by_id)
    pub fn remove(&mut self, item: &T) -> bool {
        self.remove_by_id(item.id())
    }

    /// Remove a record from the live map
    ///
    /// A record that was never synced is simply dropped; a persisted one is
    /// scheduled for DELETE. Returns `false` if the id was not live.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        if id.is_empty() || self.items.remove(id).is_none() {
            return false;
        }

        self.modified.remove(id);
        if !self.added.remove(id) {
            self.deleted.insert(id.to_string());
        }
        true
    }

    /// Remove every live record
    pub fn clear(&mut self) {
        for id in std::mem::take(&mut self.items).into_keys() {
            if !self.added.contains(&id) {
                self.deleted.insert(id);
            }
        }
        self.added.clear();
        self.modified.clear();
    }

    /// Insert a record materialized from storage without tracking it
    ///
    /// Used by the load path only. Records without an id are ignored, as
    /// are ids with a pending change: a pending DELETE must stay
    /// unreachable, and a pending INSERT or UPDATE is newer than storage.
    /// Returns whether the record was taken.
    pub fn load_from_database(&mut self, item: T) -> bool {
        let id = item.id();
        if id.is_empty()
            || self.deleted.contains(id)
            || self.added.contains(id)
            || self.modified.contains(id)
        {
            return false;
        }
        self.items.insert(id.to_string(), item);
        true
    }

    /// Drop all in-memory state, including the binding. No I/O.
    pub fn dispose(&mut self) {
        self.items.clear();
        self.added.clear();
        self.modified.clear();
        self.deleted.clear();
        self.binding = None;
    }

    // ===== Queries over the live snapshot =====

    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live records in id order
    pub fn iter(&self) -> btree_map::Values<'_, String, T> {
        self.items.values()
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.values().filter(|item| predicate(item)).collect()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.values().next()
    }

    pub fn find<P>(&self, predicate: P) -> Option<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.values().find(|item| predicate(item))
    }

    pub fn any<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool,
    {
        self.items.values().any(predicate)
    }

    pub fn group_by<K, F>(&self, key: F) -> BTreeMap<K, Vec<&T>>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut groups: BTreeMap<K, Vec<&T>> = BTreeMap::new();
        for item in self.items.values() {
            groups.entry(key(item)).or_default().push(item);
        }
        groups
    }

    pub fn sorted_by_key<K, F>(&self, key: F) -> Vec<&T>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut out: Vec<&T> = self.items.values().collect();
        out.sort_by_key(|item| key(item));
        out
    }

    pub fn sorted_by_key_desc<K, F>(&self, key: F) -> Vec<&T>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut out: Vec<&T> = self.items.values().collect();
        out.sort_by(|a, b| key(b).cmp(&key(a)));
        out
    }

    pub fn map<R, F>(&self, f: F) -> Vec<R>
    where
        F: Fn(&T) -> R,
    {
        self.items.values().map(f).collect()
    }

    // ===== Pending changes, read by the sync path =====

    /// True if any dirty set is non-empty
    pub fn is_dirty(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }

    pub fn added_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.added.iter().map(String::as_str)
    }

    pub fn modified_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.modified.iter().map(String::as_str)
    }

    pub fn deleted_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.deleted.iter().map(String::as_str)
    }

    /// Records pending INSERT, in id order
    pub fn pending_inserts(&self) -> Vec<&T> {
        self.added
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    /// Records pending UPDATE, in id order
    pub fn pending_updates(&self) -> Vec<&T> {
        self.modified
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    /// Clear the insert set after the insert phase committed its statements
    pub fn acknowledge_inserts(&mut self) {
        self.added.clear();
    }

    /// Clear the update set after the update phase committed its statements
    pub fn acknowledge_updates(&mut self) {
        self.modified.clear();
    }

    /// Clear the delete set after the delete phase committed its statements
    pub fn acknowledge_deletes(&mut self) {
        self.deleted.clear();
    }
}

impl<'a, T: TrackedRecord> IntoIterator for &'a TrackedCollection<T> {
    type Item = &'a T;
    type IntoIter = btree_map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
