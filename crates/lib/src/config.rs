//! Configuration for object roots and the persisted layout of attached nodes.
//!
//! An [`ObjectConfig`] is passed explicitly into [`crate::ObjectRoot::open_with`], so
//! several independent objects (or tests) can run side by side without sharing any
//! global naming state.

use serde::{Deserialize, Serialize};

use crate::{
    Result, constants,
    object::{NodeKind, SubstrateAddress},
};

/// Element and attribute names used to persist an attached map.
///
/// A map document is stored as a `root` element containing zero or more `entry`
/// elements, each carrying the key in `key_attr` and the serialized token in
/// `value_attr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLayout {
    pub root: String,
    pub entry: String,
    pub key_attr: String,
    pub value_attr: String,
}

impl Default for EntryLayout {
    fn default() -> Self {
        Self {
            root: constants::MAP_TAG.to_string(),
            entry: constants::MAP_ENTRY_TAG.to_string(),
            key_attr: constants::MAP_ENTRY_KEY_ATTR.to_string(),
            value_attr: constants::MAP_ENTRY_VALUE_ATTR.to_string(),
        }
    }
}

/// Element and attribute names used to persist an attached list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLayout {
    pub root: String,
    pub item: String,
    pub value_attr: String,
}

impl Default for ItemLayout {
    fn default() -> Self {
        Self {
            root: constants::LIST_TAG.to_string(),
            item: constants::LIST_ITEM_TAG.to_string(),
            value_attr: constants::LIST_ITEM_VALUE_ATTR.to_string(),
        }
    }
}

/// Configuration of a single object root.
///
/// # Examples
///
/// ```
/// use substrata::ObjectConfig;
///
/// let config = ObjectConfig::default()
///     .with_master_container("data+tests")
///     .with_root_document("root");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Container hosting the root map.
    pub master_container: String,
    /// Document id of the root map inside the master container.
    pub root_document: String,
    pub map_layout: EntryLayout,
    pub list_layout: ItemLayout,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            master_container: constants::MASTER_CONTAINER.to_string(),
            root_document: constants::ROOT_DOCUMENT.to_string(),
            map_layout: EntryLayout::default(),
            list_layout: ItemLayout::default(),
        }
    }
}

impl ObjectConfig {
    pub fn with_master_container(mut self, container_id: impl Into<String>) -> Self {
        self.master_container = container_id.into();
        self
    }

    pub fn with_root_document(mut self, document_id: impl Into<String>) -> Self {
        self.root_document = document_id.into();
        self
    }

    pub fn with_map_layout(mut self, layout: EntryLayout) -> Self {
        self.map_layout = layout;
        self
    }

    pub fn with_list_layout(mut self, layout: ItemLayout) -> Self {
        self.list_layout = layout;
        self
    }

    /// Address of the root map described by this configuration.
    ///
    /// # Errors
    /// Returns `ObjectError::InvalidAddress` if the master container or root document
    /// cannot form a valid address.
    pub fn root_address(&self) -> Result<SubstrateAddress> {
        SubstrateAddress::new(&self.master_container, &self.root_document, NodeKind::Map)
    }

    /// Checks that the configuration can anchor an object.
    pub fn validate(&self) -> Result<()> {
        self.root_address().map(|_| ())
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
