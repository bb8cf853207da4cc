//! Flat vector dict index: text id -> embedded node, with an internal
//! integer id map for compact storage

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use ragx_core::{Error, Result};

use crate::node::Node;

/// In-memory embedding index. `id_map` (text id -> internal integer id) and
/// the node table are kept 1:1; a text id is immutable once assigned and
/// cannot be reused while live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorDictIndex {
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    // internal tagging buffers JSON through serde's Content, where object
    // keys only surface as strings; parse them back to u64 on load
    #[serde(deserialize_with = "deserialize_u64_keys")]
    nodes: HashMap<u64, Node>,
    id_map: HashMap<String, u64>,
    // text ids in insertion order; retrieval ties break on this order
    insertion_order: Vec<String>,
    next_int_id: u64,
}

fn deserialize_u64_keys<'de, D>(deserializer: D) -> std::result::Result<HashMap<u64, Node>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    let string_keyed = HashMap::<String, Node>::deserialize(deserializer)?;
    string_keyed
        .into_iter()
        .map(|(k, v)| k.parse::<u64>().map(|k| (k, v)).map_err(D::Error::custom))
        .collect()
}

impl VectorDictIndex {
    pub fn new() -> Self {
        Self {
            index_id: Uuid::new_v4().to_string(),
            summary: None,
            nodes: HashMap::new(),
            id_map: HashMap::new(),
            insertion_order: Vec::new(),
            next_int_id: 0,
        }
    }

    /// Add an embedded node under an externally-assigned text id (a fresh
    /// one is generated when `text_id` is `None`). Returns the text id.
    pub fn add_node(&mut self, text_id: Option<String>, node: Node) -> Result<String> {
        if node.text.trim().is_empty() {
            return Err(Error::InvalidInput("node text must be non-empty".to_string()));
        }
        if node.embedding.is_none() {
            return Err(Error::MissingEmbedding(node.id));
        }
        let int_id = self.next_int_id;
        let text_id = text_id.unwrap_or_else(|| int_id.to_string());
        if self.id_map.contains_key(&text_id) {
            return Err(Error::DuplicateId(text_id));
        }
        self.next_int_id += 1;
        self.id_map.insert(text_id.clone(), int_id);
        self.insertion_order.push(text_id.clone());
        self.nodes.insert(int_id, node);
        Ok(text_id)
    }

    pub fn get(&self, text_id: &str) -> Result<&Node> {
        let int_id = self
            .id_map
            .get(text_id)
            .ok_or_else(|| Error::NotFound(format!("text id {text_id}")))?;
        self.nodes
            .get(int_id)
            .ok_or_else(|| Error::NotFound(format!("internal id {int_id}")))
    }

    /// Text ids in insertion order
    pub fn text_ids(&self) -> &[String] {
        &self.insertion_order
    }

    /// `(text_id, node)` pairs in insertion order
    pub fn entries(&self) -> Result<Vec<(&String, &Node)>> {
        self.insertion_order
            .iter()
            .map(|tid| self.get(tid).map(|n| (tid, n)))
            .collect()
    }

    /// Nodes in the table, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Delete a single entry by text id
    pub fn delete(&mut self, text_id: &str) -> Result<()> {
        let int_id = self
            .id_map
            .remove(text_id)
            .ok_or_else(|| Error::NotFound(format!("text id {text_id}")))?;
        self.nodes.remove(&int_id);
        self.insertion_order.retain(|tid| tid != text_id);
        Ok(())
    }

    /// Delete every entry whose node references the given source document.
    /// Returns the number of entries removed.
    pub fn delete_ref_doc(&mut self, ref_doc_id: &str) -> usize {
        let doomed: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|tid| {
                self.id_map
                    .get(*tid)
                    .and_then(|int_id| self.nodes.get(int_id))
                    .is_some_and(|n| n.ref_doc_id.as_deref() == Some(ref_doc_id))
            })
            .cloned()
            .collect();
        for tid in &doomed {
            // ids were just observed live; delete cannot fail here
            let _ = self.delete(tid);
        }
        doomed.len()
    }

    /// Check that `id_map` and the node table are 1:1
    pub fn validate(&self) -> Result<()> {
        if self.id_map.len() != self.nodes.len() {
            return Err(Error::InvalidInput(format!(
                "id_map ({}) and node table ({}) cardinality mismatch",
                self.id_map.len(),
                self.nodes.len()
            )));
        }
        for (text_id, int_id) in &self.id_map {
            if !self.nodes.contains_key(int_id) {
                return Err(Error::NotFound(format!(
                    "internal id {int_id} for text id {text_id}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for VectorDictIndex {
    fn default() -> Self {
        Self::new()
    }
}
