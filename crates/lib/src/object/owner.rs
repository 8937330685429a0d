//! Single-parent ownership of attached nodes.
//!
//! An attached map or list has exactly one owning parent entry. The owner is
//! recorded in storage, in the `_owners` index of the container holding the node's
//! document, so every session and every replica sees the same record. A record only
//! counts while the parent it names still holds the node's owning token.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SubstrateAddress;
use crate::Result;

/// Where an attached node is owned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub(crate) enum Owner {
    /// The root map of an object.
    Root,
    /// A key of the parent map.
    Key { parent: String, key: String },
    /// Some position of the parent list.
    Item { parent: String },
}

impl Owner {
    pub(crate) fn key(parent: &SubstrateAddress, key: &str) -> Self {
        Owner::Key {
            parent: parent.serialize(),
            key: key.to_string(),
        }
    }

    pub(crate) fn item(parent: &SubstrateAddress) -> Self {
        Owner::Item {
            parent: parent.serialize(),
        }
    }

    /// Whether `claimant` may take a node owned by `self` without checking storage.
    ///
    /// Only a rewrite under the same map key qualifies. A list can hold a node at
    /// one position at most.
    pub(crate) fn allows_rewrite(&self, claimant: &Owner) -> bool {
        self == claimant && matches!(claimant, Owner::Key { .. })
    }

    pub(crate) fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored record. Unreadable records are treated as absent.
    pub(crate) fn decode(record: &str) -> Option<Self> {
        serde_json::from_str(record).ok()
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Root => f.write_str("the object root"),
            Owner::Key { parent, key } => write!(f, "{parent}[{key:?}]"),
            Owner::Item { parent } => write!(f, "an item of {parent}"),
        }
    }
}
