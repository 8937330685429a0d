//! Persistence operations for the in-memory engine.
//!
//! Each container is saved as its full Y update, base64 encoded, inside a JSON file.
//! Loading replays those updates into fresh documents, so the restored replica holds
//! the same merged state (though with new client ids for future writes).

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::PoisonError,
};

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Container, InMemoryEngine};
use crate::{Result, engine::EngineError};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct SerializableEngine {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    /// Container id -> base64 encoded v1 update of the full container state
    containers: BTreeMap<String, String>,
}

pub(crate) fn save_to_file<P: AsRef<Path>>(engine: &InMemoryEngine, path: P) -> Result<()> {
    let containers = {
        let guard = engine
            .containers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .iter()
            .map(|(id, container)| (id.clone(), Base64::encode_string(&container.encode_state())))
            .collect()
    };

    let serializable = SerializableEngine {
        version: PERSISTENCE_VERSION,
        containers,
    };
    let json = serde_json::to_string_pretty(&serializable)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub(crate) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemoryEngine> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(InMemoryEngine::new());
    }

    let json = std::fs::read_to_string(path)?;
    let serializable: SerializableEngine = serde_json::from_str(&json)?;

    let mut containers = HashMap::with_capacity(serializable.containers.len());
    for (id, encoded) in serializable.containers {
        let update = Base64::decode_vec(&encoded).map_err(|e| EngineError::SnapshotCorrupted {
            reason: format!("container '{id}' is not valid base64: {e}"),
        })?;
        let container = Container::new(&id);
        container.apply_update(&update)?;
        containers.insert(id, container);
    }

    tracing::info!(path = %path.display(), containers = containers.len(), "Loaded engine state");
    Ok(InMemoryEngine::from_containers(containers))
}
