//! Tree index: a node table plus a distinguished set of roots

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use ragx_core::{Error, Result};

use crate::node::Node;

/// A forest of trees over a node table. Every non-root node has exactly one
/// parent; all edges are id references into `all_nodes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeIndex {
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    all_nodes: HashMap<String, Node>,
    root_ids: Vec<String>,
}

impl TreeIndex {
    pub fn new() -> Self {
        Self {
            index_id: Uuid::new_v4().to_string(),
            summary: None,
            all_nodes: HashMap::new(),
            root_ids: Vec::new(),
        }
    }

    /// Assemble a tree from pre-linked nodes, validating integrity
    pub fn from_nodes(nodes: Vec<Node>, root_ids: Vec<String>) -> Result<Self> {
        let mut index = Self::new();
        for node in nodes {
            if index.all_nodes.contains_key(&node.id) {
                return Err(Error::DuplicateId(node.id));
            }
            index.all_nodes.insert(node.id.clone(), node);
        }
        index.root_ids = root_ids;
        index.validate()?;
        Ok(index)
    }

    /// Insert a node under the given parent, or as a root when `parent_id`
    /// is `None`
    pub fn insert_under(&mut self, mut node: Node, parent_id: Option<&str>) -> Result<()> {
        if node.text.trim().is_empty() {
            return Err(Error::InvalidInput("node text must be non-empty".to_string()));
        }
        if self.all_nodes.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        match parent_id {
            None => {
                node.parent_id = None;
                self.root_ids.push(node.id.clone());
            }
            Some(pid) => {
                let parent = self
                    .all_nodes
                    .get_mut(pid)
                    .ok_or_else(|| Error::NotFound(format!("parent node {pid}")))?;
                parent.child_ids.insert(node.id.clone());
                node.parent_id = Some(pid.to_string());
            }
        }
        self.all_nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Node> {
        self.all_nodes
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.all_nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    /// Root nodes in insertion order
    pub fn roots(&self) -> Result<Vec<&Node>> {
        self.root_ids.iter().map(|id| self.get(id)).collect()
    }

    /// Children of a node, ordered by child id
    pub fn children_of(&self, id: &str) -> Result<Vec<&Node>> {
        let parent = self.get(id)?;
        parent.child_ids.iter().map(|cid| self.get(cid)).collect()
    }

    pub fn len(&self) -> usize {
        self.all_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_nodes.is_empty()
    }

    /// All nodes in the table, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.all_nodes.values()
    }

    /// Check structural integrity: every referenced id resolves, parent
    /// links match child edges, and the edge set is acyclic (a forest
    /// reachable from the roots).
    pub fn validate(&self) -> Result<()> {
        for root_id in &self.root_ids {
            let root = self.get(root_id)?;
            if root.parent_id.is_some() {
                return Err(Error::InvalidInput(format!(
                    "root node {root_id} has a parent"
                )));
            }
        }
        for node in self.all_nodes.values() {
            for child_id in &node.child_ids {
                let child = self.get(child_id)?;
                if child.parent_id.as_deref() != Some(node.id.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "child {child_id} does not point back to parent {}",
                        node.id
                    )));
                }
            }
        }

        // Walk from the roots; revisiting a node means a cycle, unreachable
        // nodes mean a broken forest.
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self.root_ids.iter().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(Error::InvalidInput(format!(
                    "cycle detected through node {id}"
                )));
            }
            let node = self.get(id)?;
            stack.extend(node.child_ids.iter().map(String::as_str));
        }
        if visited.len() != self.all_nodes.len() {
            return Err(Error::InvalidInput(
                "tree contains nodes unreachable from any root".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TreeIndex {
    fn default() -> Self {
        Self::new()
    }
}
