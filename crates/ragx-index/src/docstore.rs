//! Document store: id -> stored content plus content hash

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use ragx_core::{Document, Error, Result};

use crate::index_struct::IndexStruct;

/// Content stored under an id: either plain source text or a complete
/// index struct composed under some parent index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredDoc {
    Document(Document),
    Index(IndexStruct),
}

/// An explicitly instantiated registry mapping document and index ids to
/// stored content. Content hashes detect duplicate re-insertion; stored
/// index structs are what make recursive (composed) queries possible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimpleDocumentStore {
    docs: HashMap<String, StoredDoc>,
    hashes: HashMap<String, String>,
}

impl SimpleDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source document. Re-inserting the same id with identical
    /// content is rejected as a duplicate; different content under an
    /// existing id replaces it.
    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        let hash = doc.content_hash();
        if self.hashes.get(&doc.doc_id).is_some_and(|h| *h == hash) {
            return Err(Error::DuplicateId(format!(
                "document {} already stored with identical content",
                doc.doc_id
            )));
        }
        self.hashes.insert(doc.doc_id.clone(), hash);
        self.docs.insert(doc.doc_id.clone(), StoredDoc::Document(doc));
        Ok(())
    }

    pub fn add_documents(&mut self, docs: Vec<Document>) -> Result<()> {
        for doc in docs {
            self.add_document(doc)?;
        }
        Ok(())
    }

    /// Register a complete index struct under its own index id, making it
    /// addressable from a parent index's nodes
    pub fn add_index_struct(&mut self, index: IndexStruct) -> Result<()> {
        let id = index.index_id().to_string();
        if self.docs.contains_key(&id) {
            return Err(Error::DuplicateId(format!("index {id} already stored")));
        }
        self.docs.insert(id, StoredDoc::Index(index));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&StoredDoc> {
        self.docs.get(id)
    }

    pub fn get_document(&self, id: &str) -> Result<&Document> {
        match self.docs.get(id) {
            Some(StoredDoc::Document(doc)) => Ok(doc),
            Some(StoredDoc::Index(_)) => Err(Error::InvalidInput(format!(
                "stored entry {id} is an index struct, not a document"
            ))),
            None => Err(Error::NotFound(format!("document {id}"))),
        }
    }

    pub fn document_exists(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn get_hash(&self, id: &str) -> Option<&str> {
        self.hashes.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
