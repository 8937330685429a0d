//! The synchronized document substrate.
//!
//! The object layer does not implement convergent replication itself. This module
//! supplies the container/document/synced-map shape it is built on, with `yrs`
//! providing the merge semantics:
//!
//! * A [`Container`] is one independently synchronized replication unit (one
//!   `yrs::Doc`). It hosts any number of documents.
//! * A [`DocumentHandle`] names one document inside a container. Each document backs
//!   exactly one map or list.
//! * [`SyncedMap`] and [`SyncedList`] are the observable string collections stored in
//!   a document.
//! * A [`ContainerStore`] opens and creates containers. [`InMemoryEngine`] is the
//!   in-process implementation, with replica-to-replica sync and file persistence.

use std::{fmt, sync::Arc};

use yrs::{Doc, Map, MapRef, ReadTxn, StateVector, Transact, Update, updates::decoder::Decode};

use crate::{
    Result,
    config::{EntryLayout, ItemLayout},
    constants,
};

mod errors;
mod in_memory;
mod persistence;
mod synced;

pub use errors::EngineError;
pub use in_memory::InMemoryEngine;
pub use synced::{SyncedList, SyncedMap};
pub use yrs::Subscription;

/// Access to the containers of one replica.
///
/// Implementations must make [`create_container`](Self::create_container)
/// idempotent: creating a container that already exists returns the existing one.
/// That is what makes concurrent first opens of the same address safe.
pub trait ContainerStore: Send + Sync {
    /// Opens an existing container, or `None` if it does not exist.
    fn open_container(&self, container_id: &str) -> Result<Option<Container>>;

    /// Opens a container, creating it if absent.
    fn create_container(&self, container_id: &str) -> Result<Container>;

    /// Ids of every container, sorted.
    fn container_ids(&self) -> Result<Vec<String>>;
}

/// One replication unit: a `yrs::Doc` plus its document, participant and owner indexes.
#[derive(Clone)]
pub struct Container {
    id: Arc<str>,
    doc: Doc,
    documents: MapRef,
    participants: MapRef,
    owners: MapRef,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Container {
    pub fn new(id: &str) -> Self {
        Self::from_doc(id, Doc::new())
    }

    pub(crate) fn from_doc(id: &str, doc: Doc) -> Self {
        let documents = doc.get_or_insert_map(constants::DOCUMENT_INDEX);
        let participants = doc.get_or_insert_map(constants::PARTICIPANTS);
        let owners = doc.get_or_insert_map(constants::OWNERS);
        Self {
            id: Arc::from(id),
            doc,
            documents,
            participants,
            owners,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_document(&self, document_id: &str) -> bool {
        let txn = self.doc.transact();
        self.documents.contains_key(&txn, document_id)
    }

    /// Every recorded document as `(document_id, root_tag)`, sorted by id.
    pub fn document_ids(&self) -> Vec<(String, String)> {
        let txn = self.doc.transact();
        let mut ids: Vec<(String, String)> = self
            .documents
            .iter(&txn)
            .map(|(id, tag)| (id.to_string(), tag.to_string(&txn)))
            .collect();
        ids.sort();
        ids
    }

    /// Opens a document that has been recorded in this container.
    pub fn open_document(&self, document_id: &str) -> Option<DocumentHandle> {
        let txn = self.doc.transact();
        let root_tag = self
            .documents
            .get(&txn, document_id)
            .map(|tag| tag.to_string(&txn))?;
        Some(DocumentHandle {
            container: self.clone(),
            id: Arc::from(document_id),
            root_tag,
        })
    }

    /// Opens a document, recording it with `root_tag` if absent.
    ///
    /// An already recorded document keeps its original root tag.
    pub fn create_document(&self, document_id: &str, root_tag: &str) -> DocumentHandle {
        if let Some(existing) = self.open_document(document_id) {
            return existing;
        }
        {
            let mut txn = self.doc.transact_mut();
            self.documents
                .insert(&mut txn, document_id.to_string(), root_tag.to_string());
        }
        tracing::trace!(container = %self.id, document = document_id, root_tag, "Recorded document");
        DocumentHandle {
            container: self.clone(),
            id: Arc::from(document_id),
            root_tag: root_tag.to_string(),
        }
    }

    /// Adds a participant. Addresses must have the `name@domain` shape.
    pub fn add_participant(&self, address: &str) -> Result<()> {
        validate_participant(address)?;
        let mut txn = self.doc.transact_mut();
        self.participants.insert(&mut txn, address.to_string(), true);
        Ok(())
    }

    /// Removes a participant, returning whether it was present.
    pub fn remove_participant(&self, address: &str) -> Result<bool> {
        validate_participant(address)?;
        let mut txn = self.doc.transact_mut();
        Ok(self.participants.remove(&mut txn, address).is_some())
    }

    /// Current participant addresses, sorted.
    pub fn participants(&self) -> Vec<String> {
        let txn = self.doc.transact();
        let mut participants: Vec<String> = self
            .participants
            .keys(&txn)
            .map(|address| address.to_string())
            .collect();
        participants.sort();
        participants
    }

    /// The ownership record written for a document, if any.
    pub(crate) fn owner_record(&self, document_id: &str) -> Option<String> {
        let txn = self.doc.transact();
        self.owners
            .get(&txn, document_id)
            .map(|record| record.to_string(&txn))
    }

    pub(crate) fn set_owner_record(&self, document_id: &str, record: &str) {
        let mut txn = self.doc.transact_mut();
        self.owners
            .insert(&mut txn, document_id.to_string(), record.to_string());
    }

    /// Deletes the ownership record of a document if it still equals `expected`.
    pub(crate) fn clear_owner_record(&self, document_id: &str, expected: &str) -> bool {
        let mut txn = self.doc.transact_mut();
        let current = self
            .owners
            .get(&txn, document_id)
            .map(|record| record.to_string(&txn));
        if current.as_deref() != Some(expected) {
            return false;
        }
        self.owners.remove(&mut txn, document_id);
        true
    }

    pub fn state_vector(&self) -> StateVector {
        self.doc.transact().state_vector()
    }

    /// The full container state encoded as a single v1 update.
    pub fn encode_state(&self) -> Vec<u8> {
        self.encode_diff(&StateVector::default())
    }

    /// Everything in this container that a replica at `remote` has not seen yet.
    pub fn encode_diff(&self, remote: &StateVector) -> Vec<u8> {
        self.doc.transact().encode_state_as_update_v1(remote)
    }

    /// Merges a v1 update produced by another replica of this container.
    pub fn apply_update(&self, update: &[u8]) -> Result<()> {
        let update = Update::decode_v1(update).map_err(|e| EngineError::UpdateFailed {
            container_id: self.id.to_string(),
            reason: e.to_string(),
        })?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(update)
            .map_err(|e| EngineError::UpdateFailed {
                container_id: self.id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

fn validate_participant(address: &str) -> Result<()> {
    let valid = match address.split_once('@') {
        Some((name, domain)) => {
            !name.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !address.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidParticipant {
            address: address.to_string(),
        }
        .into())
    }
}

/// One document inside a container.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    container: Container,
    id: Arc<str>,
    root_tag: String,
}

impl DocumentHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn container_id(&self) -> &str {
        self.container.id()
    }

    /// The root element name this document was recorded with.
    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    /// Binds to the map stored in this document, creating its root element if absent.
    ///
    /// Each call returns a handle with its own write origin.
    pub fn get_or_create_synced_map(&self, layout: &EntryLayout) -> SyncedMap {
        SyncedMap::new(
            self.container.doc.clone(),
            &format!("{}/{}", self.id, layout.root),
            layout.clone(),
        )
    }

    /// Binds to the list stored in this document, creating its root element if absent.
    pub fn get_or_create_synced_list(&self, layout: &ItemLayout) -> SyncedList {
        SyncedList::new(
            self.container.doc.clone(),
            &format!("{}/{}", self.id, layout.root),
            layout.clone(),
        )
    }
}
