//! Full materialization of a subtree into a `serde_json::Value`.
//!
//! Ownership keeps ordinary trees acyclic, but explicit references can close a
//! loop. The addresses on the current path are tracked so a loop is reported
//! instead of recursing forever. A node reachable twice without a loop (a shared
//! reference) is simply written twice.

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::{
    ListNode, LocalList, LocalMap, MapNode, NodeValue, ObjectError, SubstrateAddress,
    SubstrateList, SubstrateMap,
};
use crate::Result;

fn enter(path: &mut Vec<SubstrateAddress>, address: &SubstrateAddress) -> Result<()> {
    if path.contains(address) {
        return Err(ObjectError::CyclicReference {
            address: address.to_string(),
        }
        .into());
    }
    path.push(address.clone());
    Ok(())
}

pub(crate) fn value_to_json(value: &NodeValue, path: &mut Vec<SubstrateAddress>) -> Result<JsonValue> {
    match value {
        NodeValue::Primitive(primitive) => Ok(primitive.to_json()),
        NodeValue::Map(MapNode::Remote(map)) => map_to_json(map, path),
        NodeValue::List(ListNode::Remote(list)) => list_to_json(list, path),
        NodeValue::Map(MapNode::Local(local)) => local_map_to_json(local, path),
        NodeValue::List(ListNode::Local(local)) => local_list_to_json(local, path),
    }
}

pub(crate) fn map_to_json(map: &SubstrateMap, path: &mut Vec<SubstrateAddress>) -> Result<JsonValue> {
    enter(path, map.address())?;
    let mut object = JsonMap::new();
    for (key, child) in map.entries()? {
        object.insert(key, value_to_json(&child, path)?);
    }
    path.pop();
    Ok(JsonValue::Object(object))
}

pub(crate) fn list_to_json(
    list: &SubstrateList,
    path: &mut Vec<SubstrateAddress>,
) -> Result<JsonValue> {
    enter(path, list.address())?;
    let items = list
        .items()?
        .iter()
        .map(|item| value_to_json(item, path))
        .collect::<Result<Vec<_>>>()?;
    path.pop();
    Ok(JsonValue::Array(items))
}

fn local_map_to_json(local: &LocalMap, path: &mut Vec<SubstrateAddress>) -> Result<JsonValue> {
    let mut object = JsonMap::new();
    for (key, child) in local.iter() {
        object.insert(key.to_string(), value_to_json(child, path)?);
    }
    Ok(JsonValue::Object(object))
}

fn local_list_to_json(local: &LocalList, path: &mut Vec<SubstrateAddress>) -> Result<JsonValue> {
    local
        .iter()
        .map(|item| value_to_json(item, path))
        .collect::<Result<Vec<_>>>()
        .map(JsonValue::Array)
}

impl NodeValue {
    /// Materializes this value, following attached nodes into storage.
    pub fn to_json(&self) -> Result<JsonValue> {
        value_to_json(self, &mut Vec::new())
    }
}
