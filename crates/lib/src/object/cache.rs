//! Materialized child cache with deferred invalidation.
//!
//! Substrate observers run while a foreign transaction is committing, where no
//! storage access is allowed. They only record which slots went stale through an
//! [`Invalidator`]; the owning node absorbs those marks at the start of its next
//! operation.

use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
    hash::Hash,
    mem,
    sync::{Arc, Mutex},
};

use super::{NodeValue, lock};

#[derive(Debug)]
struct Pending<K> {
    keys: HashSet<K>,
    all: bool,
}

impl<K> Default for Pending<K> {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
            all: false,
        }
    }
}

/// Marks cached slots stale. Safe to call from substrate callbacks.
#[derive(Debug)]
pub(crate) struct Invalidator<K> {
    pending: Arc<Mutex<Pending<K>>>,
}

impl<K> Clone for Invalidator<K> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<K: Eq + Hash> Invalidator<K> {
    pub(crate) fn keys(&self, keys: impl IntoIterator<Item = K>) {
        lock(&self.pending).keys.extend(keys);
    }

    pub(crate) fn all(&self) {
        lock(&self.pending).all = true;
    }
}

#[derive(Debug)]
pub(crate) struct MaterializationCache<K> {
    entries: Mutex<HashMap<K, NodeValue>>,
    invalidator: Invalidator<K>,
}

impl<K: Eq + Hash + Clone> MaterializationCache<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            invalidator: Invalidator {
                pending: Arc::new(Mutex::new(Pending::default())),
            },
        }
    }

    pub(crate) fn invalidator(&self) -> Invalidator<K> {
        self.invalidator.clone()
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<NodeValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.entries).get(key).cloned()
    }

    pub(crate) fn insert(&self, key: K, value: NodeValue) {
        lock(&self.entries).insert(key, value);
    }

    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<NodeValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.entries).remove(key)
    }

    /// Drops every cached value, returning what was evicted.
    pub(crate) fn clear(&self) -> Vec<(K, NodeValue)> {
        lock(&self.entries).drain().collect()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Applies pending invalidations, returning the evicted values.
    pub(crate) fn absorb(&self) -> Vec<(K, NodeValue)> {
        let pending = mem::take(&mut *lock(&self.invalidator.pending));
        if pending.all {
            return self.clear();
        }
        if pending.keys.is_empty() {
            return Vec::new();
        }
        let mut entries = lock(&self.entries);
        pending
            .keys
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|value| (key, value)))
            .collect()
    }
}
