//! Shared state of one object root.
//!
//! A [`Session`] owns the container store, the configuration, and the registry of
//! live node handles. The registry holds weak references so that opening the same
//! address twice inside one session yields the same handle and cache, while
//! dropping all user handles frees the node.
//!
//! Ownership of attached nodes is not kept on handles. It is read from and written
//! to the `_owners` index of each node's container, see [`Session::claim`].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, Weak},
};

use tracing::{debug, trace, warn};

use super::{
    IdGenerator, MapShared, NodeKind, ObjectError, SubstrateAddress, SubstrateList, SubstrateMap,
    codec::Resolver, list::ListShared, lock, owner::Owner,
};
use crate::{
    ObjectConfig, Result,
    engine::{Container, ContainerStore, DocumentHandle, EngineError},
};

pub(crate) struct Session {
    engine: Arc<dyn ContainerStore>,
    config: ObjectConfig,
    ids: Arc<dyn IdGenerator>,
    maps: Mutex<HashMap<SubstrateAddress, Weak<MapShared>>>,
    lists: Mutex<HashMap<SubstrateAddress, Weak<ListShared>>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(
        engine: Arc<dyn ContainerStore>,
        config: ObjectConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            config,
            ids,
            maps: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn engine(&self) -> &dyn ContainerStore {
        self.engine.as_ref()
    }

    pub(crate) fn config(&self) -> &ObjectConfig {
        &self.config
    }

    fn root_tag(&self, kind: NodeKind) -> Result<&str> {
        match kind {
            NodeKind::Map => Ok(&self.config.map_layout.root),
            NodeKind::List => Ok(&self.config.list_layout.root),
            NodeKind::Primitive => Err(ObjectError::NotAttached {
                kind: NodeKind::Primitive.name(),
            }
            .into()),
        }
    }

    fn dangling(address: &SubstrateAddress, reason: impl Into<String>) -> crate::Error {
        let token = address.serialize();
        let reason = reason.into();
        warn!(%token, %reason, "Dangling reference");
        ObjectError::DanglingReference { token, reason }.into()
    }

    /// Checks that `address` names a recorded document of the matching kind.
    pub(crate) fn locate(&self, address: &SubstrateAddress) -> Result<DocumentHandle> {
        let container = self.existing_container(address)?;
        let document = container
            .open_document(address.document_id())
            .ok_or_else(|| Self::dangling(address, "document does not exist"))?;
        let expected = self.root_tag(address.kind())?;
        if document.root_tag() != expected {
            return Err(Self::dangling(
                address,
                format!(
                    "document holds a '{}' element, not a {}",
                    document.root_tag(),
                    address.kind()
                ),
            ));
        }
        Ok(document)
    }

    /// Opens the document backing `address`, recording it if the container lacks it.
    pub(crate) fn bind_document(&self, address: &SubstrateAddress) -> Result<DocumentHandle> {
        let container = self.existing_container(address)?;
        let tag = self.root_tag(address.kind())?;
        Ok(container.create_document(address.document_id(), tag))
    }

    /// Allocates a fresh container and returns its id.
    pub(crate) fn create_container(&self) -> Result<String> {
        let container_id = self.ids.new_container_id();
        self.engine.create_container(&container_id)?;
        Ok(container_id)
    }

    fn record_document(&self, address: &SubstrateAddress) -> Result<()> {
        let container = self.engine.open_container(address.container_id())?.ok_or_else(|| {
            EngineError::ContainerNotFound {
                container_id: address.container_id().to_string(),
            }
        })?;
        container.create_document(address.document_id(), self.root_tag(address.kind())?);
        debug!(address = %address, "Created document");
        Ok(())
    }

    /// Creates an empty map document in `container_id` and registers its handle.
    pub(crate) fn create_map(self: &Arc<Self>, container_id: &str) -> Result<SubstrateMap> {
        let address = SubstrateAddress::new_map_address(container_id, self.ids.as_ref())?;
        self.record_document(&address)?;
        let map = SubstrateMap::unopened(Arc::clone(self), address.clone());
        register(&mut lock(&self.maps), address, map.downgrade());
        Ok(map)
    }

    /// Creates an empty list document in `container_id` and registers its handle.
    pub(crate) fn create_list(self: &Arc<Self>, container_id: &str) -> Result<SubstrateList> {
        let address = SubstrateAddress::new_list_address(container_id, self.ids.as_ref())?;
        self.record_document(&address)?;
        let list = SubstrateList::unopened(Arc::clone(self), address.clone());
        register(&mut lock(&self.lists), address, list.downgrade());
        Ok(list)
    }

    /// Opens the map at `address`, reusing a live handle when there is one.
    ///
    /// # Errors
    /// `ObjectError::DanglingReference` when the address does not name a recorded map.
    pub(crate) fn open_map(self: &Arc<Self>, address: &SubstrateAddress) -> Result<SubstrateMap> {
        let mut maps = lock(&self.maps);
        if let Some(shared) = maps.get(address).and_then(Weak::upgrade) {
            trace!(address = %address, "Reusing live map handle");
            return Ok(SubstrateMap::from_shared(shared));
        }
        self.locate(address)?;
        let map = SubstrateMap::unopened(Arc::clone(self), address.clone());
        register(&mut maps, address.clone(), map.downgrade());
        Ok(map)
    }

    /// Opens the list at `address`, reusing a live handle when there is one.
    pub(crate) fn open_list(self: &Arc<Self>, address: &SubstrateAddress) -> Result<SubstrateList> {
        let mut lists = lock(&self.lists);
        if let Some(shared) = lists.get(address).and_then(Weak::upgrade) {
            trace!(address = %address, "Reusing live list handle");
            return Ok(SubstrateList::from_shared(shared));
        }
        self.locate(address)?;
        let list = SubstrateList::unopened(Arc::clone(self), address.clone());
        register(&mut lists, address.clone(), list.downgrade());
        Ok(list)
    }

    fn existing_container(&self, address: &SubstrateAddress) -> Result<Container> {
        self.engine
            .open_container(address.container_id())?
            .ok_or_else(|| Self::dangling(address, "container does not exist"))
    }

    /// Whether the slot named by `owner` currently stores `token`.
    ///
    /// A parent that no longer exists holds nothing.
    fn holds(self: &Arc<Self>, owner: &Owner, token: &str) -> Result<bool> {
        let (parent, key) = match owner {
            Owner::Root => return Ok(true),
            Owner::Key { parent, key } => (parent, Some(key)),
            Owner::Item { parent } => (parent, None),
        };
        let Some(address) = SubstrateAddress::deserialize(parent) else {
            return Ok(false);
        };
        let stored = match key {
            Some(key) => self
                .open_map(&address)
                .and_then(|map| map.stored_token(key))
                .map(|stored| stored.as_deref() == Some(token)),
            None => self
                .open_list(&address)
                .and_then(|list| list.stored_tokens())
                .map(|tokens| tokens.iter().any(|stored| stored == token)),
        };
        match stored {
            Err(err) if err.is_not_found() => Ok(false),
            other => other,
        }
    }

    /// Records `claimant` as the owner of the node at `address`.
    ///
    /// The recorded owner may be replaced only if it no longer stores the node, or
    /// if `claimant` rewrites the same map key.
    ///
    /// # Errors
    /// `ObjectError::AlreadyAttached` when another slot still owns the node.
    pub(crate) fn claim(self: &Arc<Self>, address: &SubstrateAddress, claimant: &Owner) -> Result<()> {
        let container = self.existing_container(address)?;
        let recorded = container
            .owner_record(address.document_id())
            .as_deref()
            .and_then(Owner::decode);
        if let Some(current) = recorded {
            if current.allows_rewrite(claimant) {
                return Ok(());
            }
            if self.holds(&current, &address.serialize())? {
                return Err(ObjectError::AlreadyAttached {
                    address: address.to_string(),
                    owner: current.to_string(),
                }
                .into());
            }
            debug!(address = %address, stale = %current, "Replacing stale owner record");
        }
        container.set_owner_record(address.document_id(), &claimant.encode()?);
        trace!(address = %address, owner = %claimant, "Claimed node");
        Ok(())
    }

    /// Detaches the node a replaced or removed token referred to, if `holder` owns it.
    ///
    /// References and primitives own nothing. A failure to reach the node's container
    /// is logged and otherwise ignored: the record it leaves behind is stale, and
    /// [`claim`](Self::claim) sees through stale records.
    pub(crate) fn release_token(&self, token: &str, holder: &Owner) {
        let Some(address) = SubstrateAddress::deserialize(token) else {
            return;
        };
        let released = holder.encode().and_then(|record| {
            Ok(self
                .engine
                .open_container(address.container_id())?
                .is_some_and(|container| container.clear_owner_record(address.document_id(), &record)))
        });
        match released {
            Ok(true) => debug!(address = %address, "Detached node"),
            Ok(false) => {}
            Err(err) => warn!(address = %address, error = %err, "Could not release owner record"),
        }
    }

    /// Opens the root map, creating its container and document on first use.
    pub(crate) fn ensure_root(self: &Arc<Self>) -> Result<SubstrateMap> {
        let address = self.config.root_address()?;
        let container = self.engine.create_container(address.container_id())?;
        if !container.has_document(address.document_id()) {
            container.create_document(address.document_id(), &self.config.map_layout.root);
            tracing::info!(address = %address, "Initialized root map");
        }
        if container.owner_record(address.document_id()).is_none() {
            container.set_owner_record(address.document_id(), &Owner::Root.encode()?);
        }
        self.open_map(&address)
    }
}

/// Adds a handle to a registry, dropping entries whose handles are gone.
fn register<T>(
    registry: &mut HashMap<SubstrateAddress, Weak<T>>,
    address: SubstrateAddress,
    handle: Weak<T>,
) {
    registry.retain(|_, weak| weak.strong_count() > 0);
    registry.insert(address, handle);
}

impl Resolver for Arc<Session> {
    fn load_map(&self, address: &SubstrateAddress) -> Result<SubstrateMap> {
        self.open_map(address)
    }

    fn load_list(&self, address: &SubstrateAddress) -> Result<SubstrateList> {
        self.open_list(address)
    }
}
