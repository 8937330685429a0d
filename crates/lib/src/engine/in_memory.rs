//! In-memory container store.
//!
//! Each [`InMemoryEngine`] models one replica. Two engines can be synchronized with
//! [`InMemoryEngine::sync_with`], which exchanges state-vector diffs for every
//! container either side knows about. The merge itself is done by `yrs`.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{debug, info};

use super::{Container, ContainerStore, persistence};
use crate::{Result, engine::EngineError};

/// A container store holding every container of one replica in memory.
///
/// It can simulate a transient outage with [`set_available`](Self::set_available),
/// during which every open or create fails with `EngineError::ContainerUnavailable`.
/// The store performs no retries of its own.
#[derive(Debug)]
pub struct InMemoryEngine {
    pub(crate) containers: RwLock<HashMap<String, Container>>,
    available: AtomicBool,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// Creates a new, empty engine.
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub(crate) fn from_containers(containers: HashMap<String, Container>) -> Self {
        Self {
            containers: RwLock::new(containers),
            available: AtomicBool::new(true),
        }
    }

    /// Marks the engine reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn check_available(&self, container_id: &str) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(EngineError::ContainerUnavailable {
                container_id: container_id.to_string(),
                reason: "engine is offline".to_string(),
            }
            .into())
        }
    }

    /// Exchanges all pending changes with another replica, in both directions.
    ///
    /// Containers known to only one side are created on the other before the
    /// exchange, so both replicas end up with the same container set.
    pub fn sync_with(&self, other: &InMemoryEngine) -> Result<()> {
        let mut ids: BTreeSet<String> = self.container_ids()?.into_iter().collect();
        ids.extend(other.container_ids()?);

        for id in &ids {
            let local = self.create_container(id)?;
            let remote = other.create_container(id)?;

            let outbound = local.encode_diff(&remote.state_vector());
            remote.apply_update(&outbound)?;

            let inbound = remote.encode_diff(&local.state_vector());
            local.apply_update(&inbound)?;
        }

        debug!(containers = ids.len(), "Synchronized replicas");
        Ok(())
    }

    /// Saves every container's full state to a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Loads engine state from a JSON file.
    ///
    /// If the file does not exist, a new, empty engine is returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path)
    }
}

impl ContainerStore for InMemoryEngine {
    fn open_container(&self, container_id: &str) -> Result<Option<Container>> {
        self.check_available(container_id)?;
        let containers = self
            .containers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(containers.get(container_id).cloned())
    }

    fn create_container(&self, container_id: &str) -> Result<Container> {
        self.check_available(container_id)?;
        let mut containers = self
            .containers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = containers.get(container_id) {
            return Ok(existing.clone());
        }
        let container = Container::new(container_id);
        containers.insert(container_id.to_string(), container.clone());
        info!(container = container_id, "Created container");
        Ok(container)
    }

    fn container_ids(&self) -> Result<Vec<String>> {
        let containers = self
            .containers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = containers.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
