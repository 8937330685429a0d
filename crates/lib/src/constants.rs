//! Constants used throughout the Substrata library.
//!
//! This module provides central definitions for the default container and document
//! names an object is anchored to, and for the element/attribute names of the
//! persisted map and list layouts.

/// Default container hosting the root map of every object.
pub const MASTER_CONTAINER: &str = "data+master";

/// Default document id of the root map inside the master container.
pub const ROOT_DOCUMENT: &str = "root";

/// Element holding the entries of an attached map.
pub const MAP_TAG: &str = "map";

/// Element holding one key/value pair of an attached map.
pub const MAP_ENTRY_TAG: &str = "entry";

/// Attribute carrying the key of a map entry.
pub const MAP_ENTRY_KEY_ATTR: &str = "k";

/// Attribute carrying the serialized token of a map entry.
pub const MAP_ENTRY_VALUE_ATTR: &str = "v";

/// Element holding the items of an attached list.
pub const LIST_TAG: &str = "list";

/// Element holding one item of an attached list.
pub const LIST_ITEM_TAG: &str = "item";

/// Attribute carrying the serialized token of a list item.
pub const LIST_ITEM_VALUE_ATTR: &str = "v";

/// Reserved root type in every container recording which documents exist.
pub(crate) const DOCUMENT_INDEX: &str = "_documents";

/// Reserved root type in every container recording its participants.
pub(crate) const PARTICIPANTS: &str = "_participants";

/// Reserved root type in every container recording the owner of each document.
pub(crate) const OWNERS: &str = "_owners";

/// Prefix of a stored reference to a node, as opposed to its owning address token.
pub const REFERENCE_PREFIX: &str = "r+";

/// Prefix for container ids allocated for sharded subtrees.
pub const SHARD_CONTAINER_PREFIX: &str = "data+";
