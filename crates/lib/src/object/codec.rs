//! Token encoding of values.
//!
//! Every stored slot holds one string token. Attached maps and lists are stored as
//! their address token by the entry that owns them, and as `r+<address>` by entries
//! that only refer to them. Primitives are stored inline with a one-letter type tag.
//! Anything else found in storage is reported as malformed rather than guessed at.

use super::{
    ListNode, MapNode, NodeValue, ObjectError, Primitive, SubstrateAddress, SubstrateList,
    SubstrateMap,
};
use crate::{Result, constants::REFERENCE_PREFIX};

/// Materializes attached nodes for decoded address tokens.
pub trait Resolver {
    fn load_map(&self, address: &SubstrateAddress) -> Result<SubstrateMap>;
    fn load_list(&self, address: &SubstrateAddress) -> Result<SubstrateList>;
}

/// Encodes a value as its storage token.
///
/// # Errors
/// `ObjectError::NotAttached` for local maps and lists, which have no address yet.
pub fn encode(value: &NodeValue) -> Result<String> {
    match value {
        NodeValue::Primitive(primitive) => Ok(primitive.encode()),
        NodeValue::Map(MapNode::Remote(map)) => Ok(map.address().serialize()),
        NodeValue::List(ListNode::Remote(list)) => Ok(list.address().serialize()),
        NodeValue::Map(MapNode::Local(_)) | NodeValue::List(ListNode::Local(_)) => {
            Err(ObjectError::NotAttached {
                kind: value.type_name(),
            }
            .into())
        }
    }
}

/// The token of an entry that refers to the node at `address` without owning it.
pub fn encode_reference(address: &SubstrateAddress) -> String {
    format!("{REFERENCE_PREFIX}{address}")
}

/// Whether `token` was written by [`encode_reference`].
pub fn is_reference(token: &str) -> bool {
    token.starts_with(REFERENCE_PREFIX)
}

fn malformed(token: &str) -> crate::Error {
    ObjectError::MalformedToken {
        token: token.to_string(),
    }
    .into()
}

fn resolve(address: &SubstrateAddress, resolver: &dyn Resolver) -> Result<NodeValue> {
    if address.is_map() {
        resolver.load_map(address).map(NodeValue::from)
    } else {
        resolver.load_list(address).map(NodeValue::from)
    }
}

/// Decodes a storage token, resolving address and reference tokens through
/// `resolver`.
///
/// A reference decodes to the same node as its owning address token.
///
/// # Errors
/// `ObjectError::MalformedToken` for tokens that are neither addresses, references
/// nor primitives, and whatever the resolver reports for addresses that cannot be
/// opened.
pub fn decode(token: &str, resolver: &dyn Resolver) -> Result<NodeValue> {
    if let Some(target) = token.strip_prefix(REFERENCE_PREFIX) {
        let address = SubstrateAddress::deserialize(target).ok_or_else(|| malformed(token))?;
        return resolve(&address, resolver);
    }
    if let Some(address) = SubstrateAddress::deserialize(token) {
        return resolve(&address, resolver);
    }
    Primitive::decode(token)
        .map(NodeValue::Primitive)
        .ok_or_else(|| malformed(token))
}
