//! Attached maps.
//!
//! A [`SubstrateMap`] owns one address and lazily binds to the synchronized map in
//! the document that address names. Decoded child nodes are kept in a
//! materialization cache; changes made by any other handle on the same document
//! (another session, or a merged remote update) evict the affected keys before the
//! next read.

use std::{
    fmt,
    sync::{Arc, Mutex, Weak},
};

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::{
    ListNode, MapNode, NodeValue, ObjectError, Placement, SubstrateAddress, SubstrateList,
    attach::AttachmentTransformer,
    cache::MaterializationCache,
    codec, json, lock,
    owner::Owner,
    session::Session,
};
use crate::{
    Result,
    engine::{Subscription, SyncedMap},
};

struct MapBinding {
    synced: SyncedMap,
    _subscription: Subscription,
}

pub(crate) struct MapShared {
    session: Arc<Session>,
    address: SubstrateAddress,
    binding: Mutex<Option<Arc<MapBinding>>>,
    cache: MaterializationCache<String>,
}

/// A handle on an attached map.
///
/// Handles are cheap to clone. Within one [`ObjectRoot`](crate::ObjectRoot) every
/// handle for the same address shares its cache.
#[derive(Clone)]
pub struct SubstrateMap {
    shared: Arc<MapShared>,
}

impl fmt::Debug for SubstrateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstrateMap")
            .field("address", &self.shared.address)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Two handles are equal when they refer to the same address.
impl PartialEq for SubstrateMap {
    fn eq(&self, other: &Self) -> bool {
        self.shared.address == other.shared.address
    }
}

impl SubstrateMap {
    pub(crate) fn unopened(session: Arc<Session>, address: SubstrateAddress) -> Self {
        Self {
            shared: Arc::new(MapShared {
                session,
                address,
                binding: Mutex::new(None),
                cache: MaterializationCache::new(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<MapShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<MapShared> {
        Arc::downgrade(&self.shared)
    }

    pub fn address(&self) -> &SubstrateAddress {
        &self.shared.address
    }

    pub fn container_id(&self) -> &str {
        self.shared.address.container_id()
    }

    /// Whether this handle has bound to its backing document yet.
    pub fn is_open(&self) -> bool {
        lock(&self.shared.binding).is_some()
    }

    /// Binds to the backing synchronized map on first use.
    fn binding(&self) -> Result<Arc<MapBinding>> {
        let mut binding = lock(&self.shared.binding);
        if let Some(open) = binding.as_ref() {
            return Ok(Arc::clone(open));
        }

        let document = self.shared.session.bind_document(&self.shared.address)?;
        let synced = document.get_or_create_synced_map(&self.shared.session.config().map_layout);
        let invalidator = self.shared.cache.invalidator();
        let address = self.shared.address.clone();
        let subscription = synced.subscribe(move |keys| {
            trace!(map = %address, ?keys, "Remote change");
            invalidator.keys(keys);
        });

        let open = Arc::new(MapBinding {
            synced,
            _subscription: subscription,
        });
        *binding = Some(Arc::clone(&open));
        debug!(map = %self.shared.address, "Opened map");
        Ok(open)
    }

    fn slot(&self, key: &str) -> Owner {
        Owner::key(&self.shared.address, key)
    }

    /// Binds and applies any invalidations recorded since the last operation.
    fn refresh(&self) -> Result<Arc<MapBinding>> {
        let binding = self.binding()?;
        let evicted = self.shared.cache.absorb();
        if !evicted.is_empty() {
            trace!(map = %self.shared.address, evicted = evicted.len(), "Evicted stale entries");
        }
        Ok(binding)
    }

    /// The raw token stored under `key`.
    pub(crate) fn stored_token(&self, key: &str) -> Result<Option<String>> {
        Ok(self.refresh()?.synced.get(key))
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    /// `DanglingReference` or `MalformedToken` when the stored token cannot be decoded,
    /// and engine errors when a referenced container cannot be opened.
    pub fn get(&self, key: &str) -> Result<Option<NodeValue>> {
        let binding = self.refresh()?;
        if let Some(cached) = self.shared.cache.get(key) {
            trace!(map = %self.shared.address, key, "Cache hit");
            return Ok(Some(cached));
        }
        let Some(token) = binding.synced.get(key) else {
            return Ok(None);
        };
        trace!(map = %self.shared.address, key, "Cache miss");
        let value = codec::decode(&token, &self.shared.session)?;
        if value.address().is_some() {
            self.shared.cache.insert(key.to_string(), value.clone());
        }
        Ok(Some(value))
    }

    /// Reads a nested map.
    ///
    /// # Errors
    /// `ObjectError::TypeMismatch` when `key` holds something other than a map.
    pub fn get_map(&self, key: &str) -> Result<Option<SubstrateMap>> {
        match self.get(key)? {
            None => Ok(None),
            Some(NodeValue::Map(MapNode::Remote(map))) => Ok(Some(map)),
            Some(other) => Err(ObjectError::TypeMismatch {
                key: key.to_string(),
                expected: "map",
                actual: other.type_name(),
            }
            .into()),
        }
    }

    /// Reads a nested list.
    pub fn get_list(&self, key: &str) -> Result<Option<SubstrateList>> {
        match self.get(key)? {
            None => Ok(None),
            Some(NodeValue::List(ListNode::Remote(list))) => Ok(Some(list)),
            Some(other) => Err(ObjectError::TypeMismatch {
                key: key.to_string(),
                expected: "list",
                actual: other.type_name(),
            }
            .into()),
        }
    }

    /// Stores `value` under `key`, attaching local maps and lists into this map's
    /// container. Returns the stored (attached) value.
    pub fn put(&self, key: &str, value: impl Into<NodeValue>) -> Result<NodeValue> {
        self.put_with(key, value, Placement::SameContainer)
    }

    /// Stores `value` under `key`.
    ///
    /// With [`Placement::NewContainer`] a local subtree is attached into a freshly
    /// created container instead of this map's own.
    ///
    /// # Errors
    /// `ObjectError::AlreadyAttached` when `value` is an attached node owned by
    /// another slot. Nothing is written in that case.
    pub fn put_with(
        &self,
        key: &str,
        value: impl Into<NodeValue>,
        placement: Placement,
    ) -> Result<NodeValue> {
        let binding = self.refresh()?;
        let slot = self.slot(key);

        let value = value.into();
        if let Some(address) = value.address() {
            self.shared.session.locate(address)?;
        }
        let attached =
            AttachmentTransformer::new(&self.shared.session).attach(value, self.container_id(), placement)?;
        let token = codec::encode(&attached)?;
        if let Some(address) = attached.address() {
            self.shared.session.claim(address, &slot)?;
        }

        let previous = binding.synced.put(key, &token);
        self.shared.cache.remove(key);
        if let Some(previous) = previous
            && previous != token
        {
            self.shared.session.release_token(&previous, &slot);
        }
        if attached.address().is_some() {
            self.shared.cache.insert(key.to_string(), attached.clone());
        }
        debug!(map = %self.shared.address, key, kind = %attached.kind(), "Put value");
        Ok(attached)
    }

    /// Stores a reference to an existing node without taking ownership of it.
    ///
    /// This is the only way to make one node reachable from two places. The entry
    /// reads back as the node itself, but never counts as the node's owner.
    ///
    /// # Errors
    /// `ObjectError::DanglingReference` when nothing is recorded at `address`.
    pub fn put_reference(&self, key: &str, address: &SubstrateAddress) -> Result<()> {
        let binding = self.refresh()?;
        self.shared.session.locate(address)?;
        let token = codec::encode_reference(address);
        let slot = self.slot(key);

        let previous = binding.synced.put(key, &token);
        self.shared.cache.remove(key);
        if let Some(previous) = previous
            && previous != token
        {
            self.shared.session.release_token(&previous, &slot);
        }
        debug!(map = %self.shared.address, key, target = %address, "Put reference");
        Ok(())
    }

    /// Deletes `key`, returning whether it was present.
    ///
    /// A removed child node is detached but its document stays in storage and can
    /// still be opened by address.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let binding = self.refresh()?;
        let removed = binding.synced.remove(key);
        self.shared.cache.remove(key);
        match removed {
            Some(token) => {
                self.shared.session.release_token(&token, &self.slot(key));
                debug!(map = %self.shared.address, key, "Removed entry");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.binding()?.synced.has(key))
    }

    /// Current keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.binding()?.synced.keys())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.binding()?.synced.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.binding()?.synced.is_empty())
    }

    /// Every `(key, value)` pair, sorted by key.
    pub fn entries(&self) -> Result<Vec<(String, NodeValue)>> {
        self.keys()?
            .into_iter()
            .filter_map(|key| self.get(&key).transpose().map(|value| value.map(|v| (key, v))))
            .collect()
    }

    /// Deletes every entry and empties the cache.
    pub fn clear(&self) -> Result<()> {
        let binding = self.refresh()?;
        let entries = binding.synced.entries();
        binding.synced.clear();
        self.shared.cache.clear();
        for (key, token) in &entries {
            self.shared.session.release_token(token, &self.slot(key));
        }
        debug!(map = %self.shared.address, entries = entries.len(), "Cleared map");
        Ok(())
    }

    /// Drops every cached child so the next reads decode from storage again.
    pub fn clear_cache(&self) {
        let evicted = self.shared.cache.clear();
        trace!(map = %self.shared.address, evicted = evicted.len(), "Cleared cache");
    }

    /// The persisted representation of this map's entries.
    pub fn snapshot(&self) -> Result<JsonValue> {
        Ok(self.binding()?.synced.snapshot())
    }

    /// Materializes the whole subtree below this map.
    ///
    /// # Errors
    /// `ObjectError::CyclicReference` when explicit references form a cycle.
    pub fn to_json(&self) -> Result<JsonValue> {
        json::map_to_json(self, &mut Vec::new())
    }
}
