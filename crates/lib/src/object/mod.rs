//! The object mapping layer.
//!
//! This module maps a JSON-like tree of maps, lists and primitives onto documents in
//! synchronized containers. Each attached map or list lives in its own document and
//! is referred to from its parent by an address token, so a tree can be sharded
//! across containers while every node keeps a stable identity.
//!
//! Values start out *local* ([`LocalMap`], [`LocalList`]) and become *remote*
//! ([`SubstrateMap`], [`SubstrateList`]) when they are put into an attached parent.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod address;
mod attach;
mod cache;
pub mod codec;
mod errors;
mod json;
mod list;
mod map;
mod owner;
mod root;
mod session;
mod value;

pub use address::{IdGenerator, NodeKind, SubstrateAddress, UuidIdGenerator};
pub use attach::Placement;
pub use codec::Resolver;
pub use errors::ObjectError;
pub use list::SubstrateList;
pub(crate) use map::MapShared;
pub use map::SubstrateMap;
pub use root::ObjectRoot;
pub use value::{ListNode, LocalList, LocalMap, MapNode, NodeValue, Primitive};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
