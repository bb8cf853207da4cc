//! List index: an ordered sequence of nodes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ragx_core::{Error, Result};

use crate::node::Node;

/// An ordered sequence of nodes. Append-only; insertion order is the
/// retrieval order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListIndex {
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    nodes: Vec<Node>,
}

impl ListIndex {
    pub fn new() -> Self {
        Self {
            index_id: Uuid::new_v4().to_string(),
            summary: None,
            nodes: Vec::new(),
        }
    }

    /// Append a node. Leaf text must be non-empty.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if node.text.trim().is_empty() {
            return Err(Error::InvalidInput("node text must be non-empty".to_string()));
        }
        if self.nodes.iter().any(|n| n.id == node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for ListIndex {
    fn default() -> Self {
        Self::new()
    }
}
