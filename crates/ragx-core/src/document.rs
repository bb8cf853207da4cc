//! Source document type

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A source document prior to chunking and indexing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub doc_id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a new document with a generated id
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            doc_id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Create a new document with an explicit id
    pub fn with_id(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Content hash used for duplicate detection on re-insertion
    pub fn content_hash(&self) -> String {
        format!("{:x}", md5::compute(self.text.as_bytes()))
    }
}
