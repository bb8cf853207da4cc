//! Index structures for RAGX
//!
//! This crate provides the canonical node representation, the four index
//! variants (list, tree, keyword table, flat vector dict), the document
//! store used for composition and duplicate detection, index builders, and
//! JSON persistence.

pub mod build;
pub mod docstore;
pub mod index_struct;
pub mod keyword;
pub mod list;
pub mod node;
pub mod persist;
pub mod tree;
pub mod vector;

pub use build::{
    KeywordExtractMode, KeywordTableIndexBuilder, ListIndexBuilder, TreeIndexBuilder,
    VectorDictIndexBuilder,
};
pub use docstore::{SimpleDocumentStore, StoredDoc};
pub use index_struct::{IndexKind, IndexStruct};
pub use keyword::{KeywordTableIndex, parse_keyword_response, simple_extract_keywords};
pub use list::ListIndex;
pub use node::Node;
pub use persist::PersistedState;
pub use tree::TreeIndex;
pub use vector::VectorDictIndex;

// Re-export core types for convenience
pub use ragx_core::{Document, Error, Result, Services};
