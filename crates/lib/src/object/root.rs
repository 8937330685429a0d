//! The object entry point.
//!
//! An [`ObjectRoot`] anchors the object tree at a well-known root map inside the
//! master container. Every object-level operation either delegates to that root map
//! or, for participants, to the master container itself.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::info;

use super::{
    IdGenerator, NodeValue, Placement, SubstrateAddress, SubstrateList, SubstrateMap,
    UuidIdGenerator, attach::AttachmentTransformer, session::Session,
};
use crate::{
    ObjectConfig, Result,
    engine::{Container, ContainerStore, EngineError},
};

/// A replicated object: a tree of maps, lists and primitives rooted in one master
/// container.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use substrata::{InMemoryEngine, LocalMap, ObjectRoot};
///
/// let object = ObjectRoot::open(Arc::new(InMemoryEngine::new()))?;
/// object.put("name", "Alice")?;
/// object.put("profile", LocalMap::new().with("city", "Lyon"))?;
///
/// let profile = object.get_map("profile")?.expect("profile was just written");
/// assert_eq!(profile.get("city")?.unwrap(), "Lyon");
/// assert_ne!(profile.address(), object.address());
/// # Ok::<(), substrata::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ObjectRoot {
    session: Arc<Session>,
    root: SubstrateMap,
}

impl ObjectRoot {
    /// Opens the object stored in `engine` with the default configuration.
    pub fn open(engine: Arc<dyn ContainerStore>) -> Result<Self> {
        Self::open_with(engine, ObjectConfig::default(), Arc::new(UuidIdGenerator))
    }

    /// Opens the object described by `config`, creating its master container and
    /// root map if absent.
    ///
    /// # Errors
    /// `ObjectError::InvalidAddress` for a configuration that does not name a valid
    /// root, and `EngineError::ContainerUnavailable` when the engine is unreachable.
    pub fn open_with(
        engine: Arc<dyn ContainerStore>,
        config: ObjectConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let session = Session::new(engine, config, ids);
        let root = session.ensure_root()?;
        info!(root = %root.address(), "Opened object root");
        Ok(Self { session, root })
    }

    /// The object id, which is its master container id.
    pub fn id(&self) -> &str {
        self.root.container_id()
    }

    pub fn address(&self) -> &SubstrateAddress {
        self.root.address()
    }

    pub fn root(&self) -> &SubstrateMap {
        &self.root
    }

    pub fn config(&self) -> &ObjectConfig {
        self.session.config()
    }

    pub fn get(&self, key: &str) -> Result<Option<NodeValue>> {
        self.root.get(key)
    }

    pub fn get_map(&self, key: &str) -> Result<Option<SubstrateMap>> {
        self.root.get_map(key)
    }

    pub fn get_list(&self, key: &str) -> Result<Option<SubstrateList>> {
        self.root.get_list(key)
    }

    pub fn put(&self, key: &str, value: impl Into<NodeValue>) -> Result<NodeValue> {
        self.root.put(key, value)
    }

    pub fn put_with(
        &self,
        key: &str,
        value: impl Into<NodeValue>,
        placement: Placement,
    ) -> Result<NodeValue> {
        self.root.put_with(key, value, placement)
    }

    pub fn put_reference(&self, key: &str, address: &SubstrateAddress) -> Result<()> {
        self.root.put_reference(key, address)
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        self.root.remove(key)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.root.has(key)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.root.keys()
    }

    pub fn len(&self) -> Result<usize> {
        self.root.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.root.is_empty()
    }

    pub fn clear(&self) -> Result<()> {
        self.root.clear()
    }

    pub fn clear_cache(&self) {
        self.root.clear_cache();
    }

    pub fn to_json(&self) -> Result<JsonValue> {
        self.root.to_json()
    }

    /// Attaches a value without placing it anywhere.
    ///
    /// Local subtrees land in the master container (or a new one). The result is
    /// detached, so it can later be put under any single parent.
    pub fn attach(&self, value: impl Into<NodeValue>, placement: Placement) -> Result<NodeValue> {
        AttachmentTransformer::new(&self.session).attach(value.into(), self.id(), placement)
    }

    /// Reopens any attached map by address, including ones no longer reachable.
    pub fn open_map(&self, address: &SubstrateAddress) -> Result<SubstrateMap> {
        self.session.open_map(address)
    }

    pub fn open_list(&self, address: &SubstrateAddress) -> Result<SubstrateList> {
        self.session.open_list(address)
    }

    fn master(&self) -> Result<Container> {
        self.session.engine().open_container(self.id())?.ok_or_else(|| {
            EngineError::ContainerNotFound {
                container_id: self.id().to_string(),
            }
            .into()
        })
    }

    pub fn add_participant(&self, address: &str) -> Result<()> {
        self.master()?.add_participant(address)?;
        info!(object = self.id(), participant = address, "Added participant");
        Ok(())
    }

    pub fn remove_participant(&self, address: &str) -> Result<bool> {
        self.master()?.remove_participant(address)
    }

    pub fn participants(&self) -> Result<Vec<String>> {
        Ok(self.master()?.participants())
    }
}
