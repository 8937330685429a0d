//! Attached lists.
//!
//! The list counterpart of [`SubstrateMap`](super::SubstrateMap). Positions shift
//! under inserts and removals, so any structural change, local or remote, drops the
//! whole materialization cache instead of individual slots.

use std::{
    fmt,
    sync::{Arc, Mutex, Weak},
};

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::{
    NodeValue, Placement, SubstrateAddress,
    attach::AttachmentTransformer,
    cache::MaterializationCache,
    codec, json, lock,
    owner::Owner,
    session::Session,
};
use crate::{
    Result,
    engine::{EngineError, Subscription, SyncedList},
};

struct ListBinding {
    synced: SyncedList,
    _subscription: Subscription,
}

pub(crate) struct ListShared {
    session: Arc<Session>,
    address: SubstrateAddress,
    binding: Mutex<Option<Arc<ListBinding>>>,
    cache: MaterializationCache<usize>,
}

/// A handle on an attached list.
#[derive(Clone)]
pub struct SubstrateList {
    shared: Arc<ListShared>,
}

impl fmt::Debug for SubstrateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstrateList")
            .field("address", &self.shared.address)
            .field("open", &self.is_open())
            .finish()
    }
}

impl PartialEq for SubstrateList {
    fn eq(&self, other: &Self) -> bool {
        self.shared.address == other.shared.address
    }
}

impl SubstrateList {
    pub(crate) fn unopened(session: Arc<Session>, address: SubstrateAddress) -> Self {
        Self {
            shared: Arc::new(ListShared {
                session,
                address,
                binding: Mutex::new(None),
                cache: MaterializationCache::new(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<ListShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<ListShared> {
        Arc::downgrade(&self.shared)
    }

    pub fn address(&self) -> &SubstrateAddress {
        &self.shared.address
    }

    pub fn container_id(&self) -> &str {
        self.shared.address.container_id()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared.binding).is_some()
    }

    fn binding(&self) -> Result<Arc<ListBinding>> {
        let mut binding = lock(&self.shared.binding);
        if let Some(open) = binding.as_ref() {
            return Ok(Arc::clone(open));
        }

        let document = self.shared.session.bind_document(&self.shared.address)?;
        let synced = document.get_or_create_synced_list(&self.shared.session.config().list_layout);
        let invalidator = self.shared.cache.invalidator();
        let address = self.shared.address.clone();
        let subscription = synced.subscribe(move || {
            trace!(list = %address, "Remote change");
            invalidator.all();
        });

        let open = Arc::new(ListBinding {
            synced,
            _subscription: subscription,
        });
        *binding = Some(Arc::clone(&open));
        debug!(list = %self.shared.address, "Opened list");
        Ok(open)
    }

    fn slot(&self) -> Owner {
        Owner::item(&self.shared.address)
    }

    fn refresh(&self) -> Result<Arc<ListBinding>> {
        let binding = self.binding()?;
        let evicted = self.shared.cache.absorb();
        if !evicted.is_empty() {
            trace!(list = %self.shared.address, evicted = evicted.len(), "Evicted stale items");
        }
        Ok(binding)
    }

    /// The raw tokens currently stored, in order.
    pub(crate) fn stored_tokens(&self) -> Result<Vec<String>> {
        Ok(self.refresh()?.synced.items())
    }

    /// Attaches `value` and claims it for this list, returning it with its token.
    fn prepare(&self, value: NodeValue, placement: Placement) -> Result<(NodeValue, String)> {
        if let Some(address) = value.address() {
            self.shared.session.locate(address)?;
        }
        let attached =
            AttachmentTransformer::new(&self.shared.session).attach(value, self.container_id(), placement)?;
        let token = codec::encode(&attached)?;
        if let Some(address) = attached.address() {
            self.shared.session.claim(address, &self.slot())?;
        }
        Ok((attached, token))
    }

    pub fn get(&self, index: usize) -> Result<Option<NodeValue>> {
        let binding = self.refresh()?;
        if let Some(cached) = self.shared.cache.get(&index) {
            return Ok(Some(cached));
        }
        let Some(token) = binding.synced.get(index) else {
            return Ok(None);
        };
        let value = codec::decode(&token, &self.shared.session)?;
        if value.address().is_some() {
            self.shared.cache.insert(index, value.clone());
        }
        Ok(Some(value))
    }

    /// Appends `value`, attaching it into this list's container when local.
    pub fn push(&self, value: impl Into<NodeValue>) -> Result<NodeValue> {
        self.push_with(value, Placement::SameContainer)
    }

    pub fn push_with(&self, value: impl Into<NodeValue>, placement: Placement) -> Result<NodeValue> {
        let binding = self.refresh()?;
        let (attached, token) = self.prepare(value.into(), placement)?;
        let index = binding.synced.push(&token);
        if attached.address().is_some() {
            self.shared.cache.insert(index, attached.clone());
        }
        debug!(list = %self.shared.address, index, kind = %attached.kind(), "Pushed item");
        Ok(attached)
    }

    /// Inserts `value` before `index`; `index == len` appends.
    pub fn insert(&self, index: usize, value: impl Into<NodeValue>) -> Result<NodeValue> {
        self.insert_with(index, value, Placement::SameContainer)
    }

    /// Inserts `value` before `index`, placing a local subtree per `placement`.
    ///
    /// # Errors
    /// `EngineError::IndexOutOfBounds` when `index > len`. Nothing is attached in
    /// that case.
    pub fn insert_with(
        &self,
        index: usize,
        value: impl Into<NodeValue>,
        placement: Placement,
    ) -> Result<NodeValue> {
        let binding = self.refresh()?;
        let len = binding.synced.len();
        if index > len {
            return Err(EngineError::IndexOutOfBounds { index, len }.into());
        }
        let (attached, token) = self.prepare(value.into(), placement)?;
        binding.synced.insert(index, &token)?;
        self.shared.cache.clear();
        debug!(list = %self.shared.address, index, kind = %attached.kind(), "Inserted item");
        Ok(attached)
    }

    /// Replaces the item at `index`, returning the stored value.
    pub fn set(&self, index: usize, value: impl Into<NodeValue>) -> Result<NodeValue> {
        let binding = self.refresh()?;
        let value = value.into();
        let len = binding.synced.len();
        let current = binding
            .synced
            .get(index)
            .ok_or(EngineError::IndexOutOfBounds { index, len })?;

        // Writing a node back into the slot it already occupies is a plain rewrite.
        let unchanged = value
            .address()
            .is_some_and(|address| address.serialize() == current);
        let (attached, token) = if unchanged {
            let token = codec::encode(&value)?;
            (value, token)
        } else {
            self.prepare(value, Placement::SameContainer)?
        };

        let previous = binding.synced.set(index, &token)?;
        self.shared.cache.remove(&index);
        if previous != token {
            self.shared.session.release_token(&previous, &self.slot());
        }
        if attached.address().is_some() {
            self.shared.cache.insert(index, attached.clone());
        }
        debug!(list = %self.shared.address, index, kind = %attached.kind(), "Set item");
        Ok(attached)
    }

    /// Removes the item at `index`, returning whether one was there.
    pub fn remove(&self, index: usize) -> Result<bool> {
        let binding = self.refresh()?;
        let Some(token) = binding.synced.remove(index) else {
            return Ok(false);
        };
        self.shared.cache.clear();
        if !binding.synced.items().contains(&token) {
            self.shared.session.release_token(&token, &self.slot());
        }
        debug!(list = %self.shared.address, index, "Removed item");
        Ok(true)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.binding()?.synced.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.binding()?.synced.is_empty())
    }

    /// Every item, in order.
    pub fn items(&self) -> Result<Vec<NodeValue>> {
        let len = self.len()?;
        (0..len)
            .filter_map(|index| self.get(index).transpose())
            .collect()
    }

    pub fn clear(&self) -> Result<()> {
        let binding = self.refresh()?;
        let tokens = binding.synced.items();
        binding.synced.clear();
        self.shared.cache.clear();
        for token in &tokens {
            self.shared.session.release_token(token, &self.slot());
        }
        debug!(list = %self.shared.address, items = tokens.len(), "Cleared list");
        Ok(())
    }

    pub fn clear_cache(&self) {
        let evicted = self.shared.cache.clear();
        trace!(list = %self.shared.address, evicted = evicted.len(), "Cleared cache");
    }

    /// The persisted representation of this list's items.
    pub fn snapshot(&self) -> Result<JsonValue> {
        Ok(self.binding()?.synced.snapshot())
    }

    pub fn to_json(&self) -> Result<JsonValue> {
        json::list_to_json(self, &mut Vec::new())
    }
}
