//! The closed set of index variants

use serde::{Deserialize, Serialize};

use ragx_core::{Error, Result};

use crate::keyword::KeywordTableIndex;
use crate::list::ListIndex;
use crate::tree::TreeIndex;
use crate::vector::VectorDictIndex;

/// Tag identifying an index variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    List,
    Tree,
    KeywordTable,
    VectorDict,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndexKind::List => "list",
            IndexKind::Tree => "tree",
            IndexKind::KeywordTable => "keyword_table",
            IndexKind::VectorDict => "vector_dict",
        };
        f.write_str(name)
    }
}

/// One of the four index structures, as a closed tagged union
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexStruct {
    List(ListIndex),
    Tree(TreeIndex),
    KeywordTable(KeywordTableIndex),
    VectorDict(VectorDictIndex),
}

impl IndexStruct {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexStruct::List(_) => IndexKind::List,
            IndexStruct::Tree(_) => IndexKind::Tree,
            IndexStruct::KeywordTable(_) => IndexKind::KeywordTable,
            IndexStruct::VectorDict(_) => IndexKind::VectorDict,
        }
    }

    /// Stable identifier of the index itself, used as its docstore key when
    /// composed under a parent index
    pub fn index_id(&self) -> &str {
        match self {
            IndexStruct::List(i) => &i.index_id,
            IndexStruct::Tree(i) => &i.index_id,
            IndexStruct::KeywordTable(i) => &i.index_id,
            IndexStruct::VectorDict(i) => &i.index_id,
        }
    }

    /// Summary text describing the index's content, required for composition
    pub fn summary(&self) -> Option<&str> {
        match self {
            IndexStruct::List(i) => i.summary.as_deref(),
            IndexStruct::Tree(i) => i.summary.as_deref(),
            IndexStruct::KeywordTable(i) => i.summary.as_deref(),
            IndexStruct::VectorDict(i) => i.summary.as_deref(),
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        let summary = Some(summary.into());
        match self {
            IndexStruct::List(i) => i.summary = summary,
            IndexStruct::Tree(i) => i.summary = summary,
            IndexStruct::KeywordTable(i) => i.summary = summary,
            IndexStruct::VectorDict(i) => i.summary = summary,
        }
    }

    /// Distinct `ref_doc_id`s referenced by this index's nodes, used to
    /// walk composition edges through the document store
    pub fn ref_doc_ids(&self) -> std::collections::BTreeSet<String> {
        let collect = |nodes: &mut dyn Iterator<Item = &crate::node::Node>| {
            nodes.filter_map(|n| n.ref_doc_id.clone()).collect()
        };
        match self {
            IndexStruct::List(i) => collect(&mut i.nodes().iter()),
            IndexStruct::Tree(i) => collect(&mut i.nodes()),
            IndexStruct::KeywordTable(i) => collect(&mut i.nodes().values()),
            IndexStruct::VectorDict(i) => collect(&mut i.nodes()),
        }
    }

    /// Delete every node derived from the given source document.
    ///
    /// Only the vector dict variant supports deletion; the other variants
    /// raise an explicit unsupported-operation error.
    pub fn delete_ref_doc(&mut self, ref_doc_id: &str) -> Result<usize> {
        match self {
            IndexStruct::VectorDict(i) => Ok(i.delete_ref_doc(ref_doc_id)),
            other => Err(Error::UnsupportedOperation(format!(
                "delete is not supported for the {} index",
                other.kind()
            ))),
        }
    }
}
