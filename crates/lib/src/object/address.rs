//! Addresses of attached nodes.
//!
//! A [`SubstrateAddress`] says where a map or list physically lives: which container,
//! which document inside it, and which kind of node the document backs. It serializes
//! to a compact token, `m+<container>+<document>` for maps and `l+<container>+<document>`
//! for lists, so a stored token can be classified without any extra lookup.
//!
//! Container ids may themselves contain `+` (the default master container is
//! `data+master`); document ids may not. Parsing therefore splits on the last `+`.

use std::fmt;

use uuid::Uuid;

use crate::{Result, constants, object::ObjectError};

const DELIMITER: char = '+';

/// The kind of node an address or value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Map,
    List,
    Primitive,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Map => "map",
            NodeKind::List => "list",
            NodeKind::Primitive => "primitive",
        }
    }

    fn token_prefix(&self) -> Option<&'static str> {
        match self {
            NodeKind::Map => Some("m"),
            NodeKind::List => Some("l"),
            NodeKind::Primitive => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allocates identifiers for new documents and containers.
///
/// Allocation must never hand out the same id twice, including from concurrent
/// callers and from different replicas.
pub trait IdGenerator: Send + Sync {
    /// A fresh document id. Must not contain `+`.
    fn new_document_id(&self) -> String;

    /// A fresh container id.
    fn new_container_id(&self) -> String;
}

/// Random v4 UUID based identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_document_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn new_container_id(&self) -> String {
        format!(
            "{}{}",
            constants::SHARD_CONTAINER_PREFIX,
            Uuid::new_v4().simple()
        )
    }
}

/// Where an attached map or list lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubstrateAddress {
    container_id: String,
    document_id: String,
    kind: NodeKind,
}

impl SubstrateAddress {
    /// Builds an address, validating its parts.
    ///
    /// # Errors
    /// `ObjectError::InvalidAddress` if either id is empty, the document id contains
    /// `+`, or `kind` is `Primitive` (primitives are always stored inline).
    pub fn new(
        container_id: impl Into<String>,
        document_id: impl Into<String>,
        kind: NodeKind,
    ) -> Result<Self> {
        let container_id = container_id.into();
        let document_id = document_id.into();

        let problem = if container_id.is_empty() {
            Some("container id must not be empty")
        } else if document_id.is_empty() {
            Some("document id must not be empty")
        } else if document_id.contains(DELIMITER) {
            Some("document id must not contain '+'")
        } else if kind == NodeKind::Primitive {
            Some("primitives are stored inline and have no address")
        } else {
            None
        };

        if let Some(reason) = problem {
            return Err(ObjectError::InvalidAddress {
                container_id,
                document_id,
                reason: reason.to_string(),
            }
            .into());
        }

        Ok(Self {
            container_id,
            document_id,
            kind,
        })
    }

    pub fn for_map(container_id: impl Into<String>, document_id: impl Into<String>) -> Result<Self> {
        Self::new(container_id, document_id, NodeKind::Map)
    }

    pub fn for_list(
        container_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Result<Self> {
        Self::new(container_id, document_id, NodeKind::List)
    }

    /// Allocates a fresh map address inside `container_id`.
    pub fn new_map_address(container_id: impl Into<String>, ids: &dyn IdGenerator) -> Result<Self> {
        Self::for_map(container_id, ids.new_document_id())
    }

    /// Allocates a fresh list address inside `container_id`.
    pub fn new_list_address(container_id: impl Into<String>, ids: &dyn IdGenerator) -> Result<Self> {
        Self::for_list(container_id, ids.new_document_id())
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_map(&self) -> bool {
        self.kind == NodeKind::Map
    }

    pub fn is_list(&self) -> bool {
        self.kind == NodeKind::List
    }

    /// The token stored in a parent entry to refer to this node.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parses a reference token.
    ///
    /// Returns `None` (not an error) when the token does not have the shape of an
    /// address, which tells the caller to read it as a primitive instead.
    pub fn deserialize(token: &str) -> Option<Self> {
        let (prefix, rest) = token.split_once(DELIMITER)?;
        let kind = match prefix {
            "m" => NodeKind::Map,
            "l" => NodeKind::List,
            _ => return None,
        };
        let (container_id, document_id) = rest.rsplit_once(DELIMITER)?;
        Self::new(container_id, document_id, kind).ok()
    }
}

impl fmt::Display for SubstrateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only map and list addresses can be constructed.
        let prefix = self.kind.token_prefix().unwrap_or("?");
        write!(
            f,
            "{prefix}{DELIMITER}{}{DELIMITER}{}",
            self.container_id, self.document_id
        )
    }
}
