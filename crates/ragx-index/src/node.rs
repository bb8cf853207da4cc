//! Node: a unit of indexed text plus structural references

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// A unit of indexed text.
///
/// Structural links (`parent_id`, `child_ids`) and the source back-reference
/// (`ref_doc_id`) are stored as ids resolved through the owning index's node
/// table, never as embedded pointers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub child_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Node {
    /// Create a node with a generated id
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            embedding: None,
            ref_doc_id: None,
            parent_id: None,
            child_ids: BTreeSet::new(),
            metadata: HashMap::new(),
        }
    }

    /// Create a node with an explicit id
    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::new(text) }
    }

    pub fn with_ref_doc(mut self, ref_doc_id: impl Into<String>) -> Self {
        self.ref_doc_id = Some(ref_doc_id.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
