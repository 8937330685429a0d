//! Turning local subtrees into attached ones.

use std::sync::Arc;

use tracing::debug;

use super::{ListNode, MapNode, NodeValue, session::Session};
use crate::Result;

/// Where a local subtree is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// Into the container of the parent it is put under.
    #[default]
    SameContainer,
    /// Into a freshly created container, to shard large subtrees.
    NewContainer,
}

pub(crate) struct AttachmentTransformer<'a> {
    session: &'a Arc<Session>,
}

impl<'a> AttachmentTransformer<'a> {
    pub(crate) fn new(session: &'a Arc<Session>) -> Self {
        Self { session }
    }

    fn target_container(&self, default_container: &str, placement: Placement) -> Result<String> {
        match placement {
            Placement::SameContainer => Ok(default_container.to_string()),
            Placement::NewContainer => self.session.create_container(),
        }
    }

    /// Attaches `value` below `default_container`.
    ///
    /// Primitives and already attached nodes come back unchanged without touching
    /// storage. A local map or list gets a fresh document, and its children are
    /// attached depth first into that document's container before each one is
    /// written, so no stored token ever refers to an incomplete node.
    pub(crate) fn attach(
        &self,
        value: NodeValue,
        default_container: &str,
        placement: Placement,
    ) -> Result<NodeValue> {
        match value {
            NodeValue::Primitive(_)
            | NodeValue::Map(MapNode::Remote(_))
            | NodeValue::List(ListNode::Remote(_)) => Ok(value),
            NodeValue::Map(MapNode::Local(local)) => {
                let container = self.target_container(default_container, placement)?;
                let map = self.session.create_map(&container)?;
                debug!(map = %map.address(), entries = local.len(), "Attaching map");
                for (key, child) in local {
                    map.put(&key, child)?;
                }
                Ok(map.into())
            }
            NodeValue::List(ListNode::Local(local)) => {
                let container = self.target_container(default_container, placement)?;
                let list = self.session.create_list(&container)?;
                debug!(list = %list.address(), items = local.len(), "Attaching list");
                for child in local {
                    list.push(child)?;
                }
                Ok(list.into())
            }
        }
    }
}
