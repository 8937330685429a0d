//! Values stored in maps and lists.
//!
//! A [`NodeValue`] is either a [`Primitive`], which is always stored inline, or a map
//! or list node. Nodes are either local (plain in-memory data that has not been
//! attached yet) or remote (a handle on an attached, replicated map or list).

use std::fmt;

use serde_json::{Number, Value as JsonValue};

use super::{NodeKind, SubstrateAddress, SubstrateList, SubstrateMap};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Bool(_) => "bool",
            Primitive::Int(_) => "int",
            Primitive::Float(_) => "float",
            Primitive::Text(_) => "text",
        }
    }

    /// The inline token for this value.
    pub fn encode(&self) -> String {
        match self {
            Primitive::Null => "n".to_string(),
            Primitive::Bool(b) => format!("b:{b}"),
            Primitive::Int(i) => format!("i:{i}"),
            Primitive::Float(f) => format!("d:{f}"),
            Primitive::Text(text) => format!("s:{text}"),
        }
    }

    /// Parses an inline token. Returns `None` for anything that is not one.
    pub fn decode(token: &str) -> Option<Self> {
        if token == "n" {
            return Some(Primitive::Null);
        }
        let (tag, body) = token.split_once(':')?;
        match tag {
            "b" => body.parse().ok().map(Primitive::Bool),
            "i" => body.parse().ok().map(Primitive::Int),
            "d" => body.parse().ok().map(Primitive::Float),
            "s" => Some(Primitive::Text(body.to_string())),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Primitive::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float (integers are widened).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Primitive::Float(f) => Some(*f),
            Primitive::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Primitive::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Primitive::Null => JsonValue::Null,
            Primitive::Bool(b) => JsonValue::Bool(*b),
            Primitive::Int(i) => JsonValue::Number((*i).into()),
            Primitive::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Primitive::Text(text) => JsonValue::String(text.clone()),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => f.write_str("null"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::Float(x) => write!(f, "{x}"),
            Primitive::Text(text) => f.write_str(text),
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value.into())
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Text(value)
    }
}

/// An unattached map: ordered key/value pairs waiting to be written into a container.
///
/// Inserting an existing key replaces its value in place, keeping the original order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMap {
    entries: Vec<(String, NodeValue)>,
}

impl LocalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<NodeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NodeValue>) -> Option<NodeValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeValue> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for LocalMap {
    type Item = (String, NodeValue);
    type IntoIter = std::vec::IntoIter<(String, NodeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<NodeValue>> FromIterator<(K, V)> for LocalMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = LocalMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// An unattached list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalList {
    items: Vec<NodeValue>,
}

impl LocalList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: impl Into<NodeValue>) -> Self {
        self.push(value);
        self
    }

    pub fn push(&mut self, value: impl Into<NodeValue>) {
        self.items.push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<&NodeValue> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeValue> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for LocalList {
    type Item = NodeValue;
    type IntoIter = std::vec::IntoIter<NodeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<V: Into<NodeValue>> FromIterator<V> for LocalList {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A map value: unattached data or an attached handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MapNode {
    Local(LocalMap),
    Remote(SubstrateMap),
}

/// A list value: unattached data or an attached handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ListNode {
    Local(LocalList),
    Remote(SubstrateList),
}

/// Anything that can be stored under a map key or at a list position.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Primitive(Primitive),
    Map(MapNode),
    List(ListNode),
}

impl NodeValue {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeValue::Primitive(_) => NodeKind::Primitive,
            NodeValue::Map(_) => NodeKind::Map,
            NodeValue::List(_) => NodeKind::List,
        }
    }

    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeValue::Primitive(primitive) => primitive.type_name(),
            NodeValue::Map(_) => "map",
            NodeValue::List(_) => "list",
        }
    }

    /// True for unattached maps and lists.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            NodeValue::Map(MapNode::Local(_)) | NodeValue::List(ListNode::Local(_))
        )
    }

    /// The address of an attached map or list.
    pub fn address(&self) -> Option<&SubstrateAddress> {
        match self {
            NodeValue::Map(MapNode::Remote(map)) => Some(map.address()),
            NodeValue::List(ListNode::Remote(list)) => Some(list.address()),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            NodeValue::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_primitive().is_some_and(Primitive::is_null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_primitive().and_then(Primitive::as_bool)
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_primitive().and_then(Primitive::as_int)
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_primitive().and_then(Primitive::as_float)
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_primitive().and_then(Primitive::as_text)
    }

    pub fn as_map(&self) -> Option<&SubstrateMap> {
        match self {
            NodeValue::Map(MapNode::Remote(map)) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&SubstrateList> {
        match self {
            NodeValue::List(ListNode::Remote(list)) => Some(list),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<SubstrateMap> {
        match self {
            NodeValue::Map(MapNode::Remote(map)) => Some(map),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<SubstrateList> {
        match self {
            NodeValue::List(ListNode::Remote(list)) => Some(list),
            _ => None,
        }
    }
}

impl PartialEq<str> for NodeValue {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for NodeValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<i64> for NodeValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}

impl PartialEq<bool> for NodeValue {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl From<Primitive> for NodeValue {
    fn from(value: Primitive) -> Self {
        NodeValue::Primitive(value)
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<i64> for NodeValue {
    fn from(value: i64) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<i32> for NodeValue {
    fn from(value: i32) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<String> for NodeValue {
    fn from(value: String) -> Self {
        NodeValue::Primitive(value.into())
    }
}

impl From<LocalMap> for NodeValue {
    fn from(value: LocalMap) -> Self {
        NodeValue::Map(MapNode::Local(value))
    }
}

impl From<LocalList> for NodeValue {
    fn from(value: LocalList) -> Self {
        NodeValue::List(ListNode::Local(value))
    }
}

impl From<SubstrateMap> for NodeValue {
    fn from(value: SubstrateMap) -> Self {
        NodeValue::Map(MapNode::Remote(value))
    }
}

impl From<SubstrateList> for NodeValue {
    fn from(value: SubstrateList) -> Self {
        NodeValue::List(ListNode::Remote(value))
    }
}

/// JSON objects become local maps and arrays become local lists; numbers that fit
/// an `i64` become integers.
impl From<JsonValue> for NodeValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Primitive::Null.into(),
            JsonValue::Bool(b) => b.into(),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().map_or(Primitive::Null, Primitive::Float).into(),
            },
            JsonValue::String(s) => s.into(),
            JsonValue::Array(items) => items.into_iter().collect::<LocalList>().into(),
            JsonValue::Object(entries) => entries.into_iter().collect::<LocalMap>().into(),
        }
    }
}
