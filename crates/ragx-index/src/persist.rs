//! JSON persistence for an index struct plus its document store

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use ragx_core::Result;

use crate::docstore::SimpleDocumentStore;
use crate::index_struct::IndexStruct;

/// The on-disk shape: an object with `index_struct` and `docstore` keys.
/// A round-trip load reconstructs the same ids, edges, and text content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub index_struct: IndexStruct,
    pub docstore: SimpleDocumentStore,
}

impl PersistedState {
    pub fn new(index_struct: IndexStruct, docstore: SimpleDocumentStore) -> Self {
        Self { index_struct, docstore }
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::KeywordTableIndex;
    use crate::list::ListIndex;
    use crate::node::Node;
    use crate::tree::TreeIndex;
    use crate::vector::VectorDictIndex;
    use ragx_core::Document;
    use tempfile::NamedTempFile;

    fn round_trip(state: &PersistedState) -> PersistedState {
        let file = NamedTempFile::new().unwrap();
        state.save_to_path(file.path()).unwrap();
        PersistedState::load_from_path(file.path()).unwrap()
    }

    fn docstore() -> SimpleDocumentStore {
        let mut store = SimpleDocumentStore::new();
        store.add_document(Document::with_id("d1", "source text")).unwrap();
        store
    }

    #[test]
    fn test_list_round_trip_is_structurally_equal() {
        let mut list = ListIndex::new();
        list.add_node(Node::with_id("a", "first").with_ref_doc("d1")).unwrap();
        list.add_node(Node::with_id("b", "second").with_ref_doc("d1")).unwrap();
        let state = PersistedState::new(IndexStruct::List(list), docstore());
        assert_eq!(round_trip(&state), state);
    }

    #[test]
    fn test_tree_round_trip_keeps_edges() {
        let mut tree = TreeIndex::new();
        tree.insert_under(Node::with_id("root", "summary"), None).unwrap();
        tree.insert_under(Node::with_id("leaf", "leaf text"), Some("root")).unwrap();
        let state = PersistedState::new(IndexStruct::Tree(tree), docstore());
        let loaded = round_trip(&state);
        assert_eq!(loaded, state);
        match loaded.index_struct {
            IndexStruct::Tree(tree) => {
                tree.validate().unwrap();
                assert!(tree.get("root").unwrap().child_ids.contains("leaf"));
            }
            _ => panic!("variant changed across round trip"),
        }
    }

    #[test]
    fn test_keyword_round_trip_keeps_postings() {
        let mut table = KeywordTableIndex::new();
        table
            .add_node(&["hello".to_string()], Node::with_id("n1", "Hello world."))
            .unwrap();
        let state = PersistedState::new(IndexStruct::KeywordTable(table), docstore());
        let loaded = round_trip(&state);
        assert_eq!(loaded, state);
        match loaded.index_struct {
            IndexStruct::KeywordTable(table) => {
                assert_eq!(table.node_ids_for_keyword("hello"), vec!["n1"]);
            }
            _ => panic!("variant changed across round trip"),
        }
    }

    #[test]
    fn test_vector_round_trip_keeps_id_map() {
        let mut vector = VectorDictIndex::new();
        vector
            .add_node(
                Some("t1".to_string()),
                Node::with_id("n1", "text").with_embedding(vec![0.5, 0.25]),
            )
            .unwrap();
        let state = PersistedState::new(IndexStruct::VectorDict(vector), docstore());
        let loaded = round_trip(&state);
        assert_eq!(loaded, state);
        match loaded.index_struct {
            IndexStruct::VectorDict(vector) => {
                vector.validate().unwrap();
                assert_eq!(
                    vector.get("t1").unwrap().embedding.as_deref(),
                    Some(&[0.5, 0.25][..])
                );
            }
            _ => panic!("variant changed across round trip"),
        }
    }

    #[test]
    fn test_persisted_json_has_expected_keys() {
        let state = PersistedState::new(IndexStruct::List(ListIndex::new()), docstore());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("index_struct").is_some());
        assert!(json.get("docstore").is_some());
    }
}
