use crate::document::{DocumentEngine, DocumentUpdate, UpdateListeners, UpdateOrigin};
use crate::error::DocumentError;
use tokio::sync::mpsc;
use yrs::updates::decoder::Decode;
use yrs::{Doc, GetString, ReadTxn, StateVector, Text, Transact, Update, WriteTxn};

const TEXT_NAME: &str = "content";

/// Shared plain-text document backed by a Yjs-compatible CRDT.
pub struct YrsDocument {
    doc: Doc,
    listeners: UpdateListeners,
}

impl YrsDocument {
    pub fn new() -> Self {
        Self {
            doc: Doc::new(),
            listeners: UpdateListeners::default(),
        }
    }

    /// Inserts `chunk` at `index`, clamped to the current length.
    pub fn insert(&self, index: u32, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let update = {
            let mut txn = self.doc.transact_mut();
            let text = txn.get_or_insert_text(TEXT_NAME);
            let index = index.min(text.len(&txn));
            text.insert(&mut txn, index, chunk);
            txn.encode_update_v1()
        };
        self.listeners.publish(UpdateOrigin::Local, update);
    }

    pub fn push(&self, chunk: &str) {
        self.insert(u32::MAX, chunk);
    }

    /// Removes up to `len` characters starting at `index`.
    pub fn delete(&self, index: u32, len: u32) {
        let update = {
            let mut txn = self.doc.transact_mut();
            let text = txn.get_or_insert_text(TEXT_NAME);
            let total = text.len(&txn);
            if index >= total || len == 0 {
                return;
            }
            text.remove_range(&mut txn, index, len.min(total - index));
            txn.encode_update_v1()
        };
        self.listeners.publish(UpdateOrigin::Local, update);
    }

    pub fn text(&self) -> String {
        let txn = self.doc.transact();
        txn.get_text(TEXT_NAME)
            .map(|text| text.get_string(&txn))
            .unwrap_or_default()
    }

    pub fn len(&self) -> u32 {
        let txn = self.doc.transact();
        txn.get_text(TEXT_NAME)
            .map(|text| text.len(&txn))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for YrsDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentEngine for YrsDocument {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<DocumentUpdate> {
        self.listeners.subscribe()
    }

    fn apply_remote_update(&self, update: &[u8]) -> Result<(), DocumentError> {
        let decoded =
            Update::decode_v1(update).map_err(|e| DocumentError::Decode(e.to_string()))?;
        {
            let mut txn = self.doc.transact_mut();
            txn.apply_update(decoded)
                .map_err(|e| DocumentError::Apply(e.to_string()))?;
        }
        self.listeners
            .publish(UpdateOrigin::Remote, update.to_vec());
        Ok(())
    }

    fn encode_full_state(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }
}
