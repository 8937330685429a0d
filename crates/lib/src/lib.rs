//!
//! Substrata: a replicated JSON-like object model on top of synchronized documents.
//! This library maps nested maps, lists and primitives onto documents in
//! independently replicated containers, and keeps the in-memory view coherent while
//! other replicas edit the same data.
//!
//! ## Core Concepts
//!
//! * **Containers (`engine::Container`)**: Independently synchronized replication units, each one Y-CRDT document. A container hosts many documents.
//! * **Synced maps (`engine::SyncedMap`)**: Observable, convergent `String -> String` maps, one per document. Merging is done by `yrs`.
//! * **Addresses (`object::SubstrateAddress`)**: Container id, document id and node kind, serialized as a compact token such as `m+data+master+root`.
//! * **Values (`object::NodeValue`)**: Primitives, plus maps and lists that are either local (detached) or remote (attached and replicated).
//! * **Attached nodes (`object::SubstrateMap`, `object::SubstrateList`)**: Lazily opened handles with a materialization cache that remote changes invalidate.
//! * **Object roots (`object::ObjectRoot`)**: The entry point, anchored at a well-known root map inside a master container.

pub mod config;
pub mod constants;
pub mod engine;
pub mod object;

pub use config::ObjectConfig;
pub use engine::{ContainerStore, InMemoryEngine};
pub use object::{
    LocalList, LocalMap, NodeKind, NodeValue, ObjectRoot, Placement, Primitive, SubstrateAddress,
    SubstrateList, SubstrateMap,
};

/// Result type used throughout the Substrata library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Substrata library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the object mapping layer
    #[error(transparent)]
    Object(object::ObjectError),

    /// Structured errors from the synchronized document engine
    #[error(transparent)]
    Engine(engine::EngineError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Object(_) => "object",
            Error::Engine(_) => "engine",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Engine(engine_err) => engine_err.is_not_found(),
            Error::Object(object_err) => object_err.is_dangling_reference(),
            _ => false,
        }
    }

    /// Check if the failed operation may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Engine(engine_err) => engine_err.is_transient(),
            _ => false,
        }
    }

    /// Check if this error indicates stored data that cannot be read back.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Object(object_err) => object_err.is_integrity_error(),
            Error::Engine(engine_err) => engine_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error was caused by misuse of the API.
    pub fn is_caller_error(&self) -> bool {
        match self {
            Error::Object(object_err) => object_err.is_caller_error(),
            Error::Engine(engine_err) => engine_err.is_caller_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Check if this error is a type mismatch on a key.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Object(object_err) => object_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error is from the object mapping layer.
    pub fn is_object_error(&self) -> bool {
        matches!(self, Error::Object(_))
    }

    /// Check if this error is from the engine.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Error::Engine(_))
    }
}
