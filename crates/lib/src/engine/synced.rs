//! Synchronized string collections backed by Y-CRDT root types.
//!
//! A [`SyncedMap`] is the `SyncedMap<String, String>` primitive the object layer is
//! built on: a string-keyed map whose concurrent mutations are merged by `yrs`, and
//! whose externally-originated changes are observable. [`SyncedList`] is its ordered
//! counterpart.
//!
//! Every handle tags the transactions it opens with a unique origin. Subscriptions
//! registered through a handle only fire for transactions that did *not* originate
//! from that same handle, which is how callers tell remote changes apart from their
//! own writes.

use std::fmt;

use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;
use yrs::{Array, ArrayRef, Doc, Map, MapRef, Observable, Origin, Subscription, Transact};

use crate::{
    Result,
    config::{EntryLayout, ItemLayout},
    engine::EngineError,
};

fn fresh_origin() -> Origin {
    Origin::from(Uuid::new_v4().to_string().as_str())
}

fn corrupted(reason: impl Into<String>) -> crate::Error {
    EngineError::SnapshotCorrupted {
        reason: reason.into(),
    }
    .into()
}

/// A synchronized `String -> String` map inside one document.
#[derive(Clone)]
pub struct SyncedMap {
    doc: Doc,
    map: MapRef,
    layout: EntryLayout,
    origin: Origin,
}

impl fmt::Debug for SyncedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedMap")
            .field("layout", &self.layout)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SyncedMap {
    pub(crate) fn new(doc: Doc, name: &str, layout: EntryLayout) -> Self {
        let map = doc.get_or_insert_map(name);
        Self {
            doc,
            map,
            layout,
            origin: fresh_origin(),
        }
    }

    pub fn layout(&self) -> &EntryLayout {
        &self.layout
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let txn = self.doc.transact();
        self.map.get(&txn, key).map(|value| value.to_string(&txn))
    }

    /// Writes `value` under `key`, returning the token it replaced.
    pub fn put(&self, key: &str, value: &str) -> Option<String> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let previous = self.map.get(&txn, key).map(|old| old.to_string(&txn));
        self.map.insert(&mut txn, key.to_string(), value.to_string());
        previous
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let removed = self.map.remove(&mut txn, key);
        removed.map(|old| old.to_string(&txn))
    }

    pub fn has(&self, key: &str) -> bool {
        let txn = self.doc.transact();
        self.map.contains_key(&txn, key)
    }

    /// Current keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let txn = self.doc.transact();
        let mut keys: Vec<String> = self.map.keys(&txn).map(|key| key.to_string()).collect();
        keys.sort();
        keys
    }

    /// Current `(key, token)` pairs, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let txn = self.doc.transact();
        let mut entries: Vec<(String, String)> = self
            .map
            .iter(&txn)
            .map(|(key, value)| (key.to_string(), value.to_string(&txn)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        let txn = self.doc.transact();
        self.map.len(&txn) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        self.map.clear(&mut txn);
    }

    /// Registers `callback` for changes made by anyone other than this handle.
    ///
    /// The callback receives the keys touched by each foreign transaction. It runs
    /// while the committing transaction is still being finalized, so it must not
    /// open transactions on the same document.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Vec<String>) + Send + Sync + 'static,
    {
        let own = self.origin.clone();
        self.map.observe(move |txn, event| {
            if txn.origin() == Some(&own) {
                return;
            }
            let keys = event.keys(txn).keys().map(|key| key.to_string()).collect();
            callback(keys);
        })
    }

    /// Persisted representation: `{"<root>": [{"<entry>": {"<k>": .., "<v>": ..}}]}`.
    pub fn snapshot(&self) -> JsonValue {
        let entries = self
            .entries()
            .into_iter()
            .map(|(key, value)| {
                let mut attrs = JsonMap::new();
                attrs.insert(self.layout.key_attr.clone(), JsonValue::String(key));
                attrs.insert(self.layout.value_attr.clone(), JsonValue::String(value));
                let mut element = JsonMap::new();
                element.insert(self.layout.entry.clone(), JsonValue::Object(attrs));
                JsonValue::Object(element)
            })
            .collect();
        let mut root = JsonMap::new();
        root.insert(self.layout.root.clone(), JsonValue::Array(entries));
        JsonValue::Object(root)
    }

    /// Replaces the map contents with the entries of a [`snapshot`](Self::snapshot).
    ///
    /// The snapshot is validated completely before anything is written.
    ///
    /// # Returns
    /// The number of entries restored.
    pub fn restore(&self, snapshot: &JsonValue) -> Result<usize> {
        let elements = snapshot
            .get(&self.layout.root)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| corrupted(format!("missing '{}' element", self.layout.root)))?;

        let mut entries = Vec::with_capacity(elements.len());
        for element in elements {
            let attrs = element
                .get(&self.layout.entry)
                .ok_or_else(|| corrupted(format!("expected '{}' element", self.layout.entry)))?;
            let key = attrs
                .get(&self.layout.key_attr)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| corrupted(format!("missing '{}' attribute", self.layout.key_attr)))?;
            let value = attrs
                .get(&self.layout.value_attr)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    corrupted(format!("missing '{}' attribute", self.layout.value_attr))
                })?;
            entries.push((key.to_string(), value.to_string()));
        }

        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        self.map.clear(&mut txn);
        for (key, value) in &entries {
            self.map.insert(&mut txn, key.clone(), value.clone());
        }
        Ok(entries.len())
    }
}

/// A synchronized ordered list of string tokens inside one document.
#[derive(Clone)]
pub struct SyncedList {
    doc: Doc,
    array: ArrayRef,
    layout: ItemLayout,
    origin: Origin,
}

impl fmt::Debug for SyncedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedList")
            .field("layout", &self.layout)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SyncedList {
    pub(crate) fn new(doc: Doc, name: &str, layout: ItemLayout) -> Self {
        let array = doc.get_or_insert_array(name);
        Self {
            doc,
            array,
            layout,
            origin: fresh_origin(),
        }
    }

    pub fn layout(&self) -> &ItemLayout {
        &self.layout
    }

    pub fn get(&self, index: usize) -> Option<String> {
        let index = u32::try_from(index).ok()?;
        let txn = self.doc.transact();
        self.array.get(&txn, index).map(|value| value.to_string(&txn))
    }

    pub fn len(&self) -> usize {
        let txn = self.doc.transact();
        self.array.len(&txn) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `value`, returning its index.
    pub fn push(&self, value: &str) -> usize {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let index = self.array.len(&txn) as usize;
        self.array.push_back(&mut txn, value.to_string());
        index
    }

    /// Inserts `value` before position `index`; `index == len` appends.
    pub fn insert(&self, index: usize, value: &str) -> Result<()> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let len = self.array.len(&txn) as usize;
        if index > len {
            return Err(EngineError::IndexOutOfBounds { index, len }.into());
        }
        self.array.insert(&mut txn, index as u32, value.to_string());
        Ok(())
    }

    /// Replaces the item at `index`, returning the token it replaced.
    pub fn set(&self, index: usize, value: &str) -> Result<String> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let len = self.array.len(&txn) as usize;
        if index >= len {
            return Err(EngineError::IndexOutOfBounds { index, len }.into());
        }
        let position = index as u32;
        let previous = self
            .array
            .get(&txn, position)
            .map(|old| old.to_string(&txn))
            .unwrap_or_default();
        self.array.remove_range(&mut txn, position, 1);
        self.array.insert(&mut txn, position, value.to_string());
        Ok(previous)
    }

    pub fn remove(&self, index: usize) -> Option<String> {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let len = self.array.len(&txn) as usize;
        if index >= len {
            return None;
        }
        let position = index as u32;
        let previous = self.array.get(&txn, position).map(|old| old.to_string(&txn));
        self.array.remove_range(&mut txn, position, 1);
        previous
    }

    pub fn clear(&self) {
        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let len = self.array.len(&txn);
        if len > 0 {
            self.array.remove_range(&mut txn, 0, len);
        }
    }

    pub fn items(&self) -> Vec<String> {
        let txn = self.doc.transact();
        let len = self.array.len(&txn);
        (0..len)
            .filter_map(|index| self.array.get(&txn, index).map(|value| value.to_string(&txn)))
            .collect()
    }

    /// Registers `callback` for changes made by anyone other than this handle.
    ///
    /// List changes shift positions, so no per-index detail is reported.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let own = self.origin.clone();
        self.array.observe(move |txn, _event| {
            if txn.origin() != Some(&own) {
                callback();
            }
        })
    }

    /// Persisted representation: `{"<root>": [{"<item>": {"<v>": ..}}]}`.
    pub fn snapshot(&self) -> JsonValue {
        let items = self
            .items()
            .into_iter()
            .map(|value| {
                let mut attrs = JsonMap::new();
                attrs.insert(self.layout.value_attr.clone(), JsonValue::String(value));
                let mut element = JsonMap::new();
                element.insert(self.layout.item.clone(), JsonValue::Object(attrs));
                JsonValue::Object(element)
            })
            .collect();
        let mut root = JsonMap::new();
        root.insert(self.layout.root.clone(), JsonValue::Array(items));
        JsonValue::Object(root)
    }

    /// Replaces the list contents with the items of a [`snapshot`](Self::snapshot).
    pub fn restore(&self, snapshot: &JsonValue) -> Result<usize> {
        let elements = snapshot
            .get(&self.layout.root)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| corrupted(format!("missing '{}' element", self.layout.root)))?;

        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let value = element
                .get(&self.layout.item)
                .and_then(|attrs| attrs.get(&self.layout.value_attr))
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    corrupted(format!(
                        "expected '{}' element with '{}' attribute",
                        self.layout.item, self.layout.value_attr
                    ))
                })?;
            items.push(value.to_string());
        }

        let mut txn = self.doc.transact_mut_with(self.origin.clone());
        let len = self.array.len(&txn);
        if len > 0 {
            self.array.remove_range(&mut txn, 0, len);
        }
        for value in &items {
            self.array.push_back(&mut txn, value.clone());
        }
        Ok(items.len())
    }
}
