//! Query runner: per-kind configs, recursive queries over composed indices,
//! and index composition

use futures::future::BoxFuture;
use std::collections::{BTreeSet, HashMap, HashSet};

use ragx_core::{Error, Result, Services};
use ragx_index::{
    simple_extract_keywords, IndexKind, IndexStruct, KeywordTableIndex, ListIndex, Node,
    SimpleDocumentStore, StoredDoc, TreeIndex, VectorDictIndex,
};

use crate::response::ResponseBuilder;
use crate::retriever::{QueryConfig, Retriever};

const DEFAULT_MAX_RECURSION_DEPTH: usize = 10;
const COMPOSED_SUMMARY_KEYWORDS: usize = 10;

/// Runs queries against an index struct, recursing into composed sub-indices
/// through the document store.
///
/// A node whose `ref_doc_id` resolves to a stored index struct contributes
/// the answer of querying that sub-index in place of its own text.
pub struct QueryRunner {
    services: Services,
    docstore: SimpleDocumentStore,
    configs: HashMap<IndexKind, QueryConfig>,
    max_recursion_depth: usize,
}

impl QueryRunner {
    pub fn new(services: Services, docstore: SimpleDocumentStore) -> Self {
        Self {
            services,
            docstore,
            configs: HashMap::new(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Install the query config used for every index of the given kind
    pub fn with_config(mut self, kind: IndexKind, config: QueryConfig) -> Self {
        self.configs.insert(kind, config);
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn docstore(&self) -> &SimpleDocumentStore {
        &self.docstore
    }

    pub fn docstore_mut(&mut self) -> &mut SimpleDocumentStore {
        &mut self.docstore
    }

    fn config_for(&self, kind: IndexKind) -> QueryConfig {
        self.configs.get(&kind).cloned().unwrap_or_default()
    }

    /// Answer a query against the given index
    pub async fn query(&self, query: &str, index: &IndexStruct) -> Result<String> {
        self.query_at(query, index, 0).await
    }

    fn query_at<'a>(
        &'a self,
        query: &'a str,
        index: &'a IndexStruct,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            if depth >= self.max_recursion_depth {
                return Err(Error::RecursionLimit { limit: self.max_recursion_depth });
            }
            let config = self.config_for(index.kind());
            let retriever = Retriever::new(&self.services, &config);
            let nodes = retriever.retrieve(query, index).await?;

            let mut texts = Vec::with_capacity(nodes.len());
            for node in &nodes {
                let fragment = match node.ref_doc_id.as_deref().and_then(|id| self.docstore.get(id))
                {
                    Some(StoredDoc::Index(sub)) => self.query_at(query, sub, depth + 1).await?,
                    _ => node.text.clone(),
                };
                texts.push(fragment);
            }

            let builder = ResponseBuilder::new(&self.services);
            builder.get_response(query, &texts, config.response_mode).await
        })
    }

    /// Compose child indices under a new parent index of the given kind.
    ///
    /// Each child must carry a summary; the parent indexes one node per
    /// child whose text is that summary and whose `ref_doc_id` is the
    /// child's index id. Children are registered in the document store so
    /// queries against the parent can recurse into them.
    pub async fn compose(
        &mut self,
        parent_kind: IndexKind,
        children: Vec<IndexStruct>,
    ) -> Result<IndexStruct> {
        if children.is_empty() {
            return Err(Error::Configuration(
                "composition requires at least one child index".to_string(),
            ));
        }
        // Validate everything before touching the docstore, so a rejected
        // composition leaves no child behind.
        let mut child_ids = HashSet::new();
        for child in &children {
            if child.summary().is_none() {
                return Err(Error::Configuration(format!(
                    "child index {} has no summary; set one before composing",
                    child.index_id()
                )));
            }
            if self.docstore.document_exists(child.index_id())
                || !child_ids.insert(child.index_id().to_string())
            {
                return Err(Error::DuplicateId(format!(
                    "index {} already stored",
                    child.index_id()
                )));
            }
        }
        self.check_acyclic(&children)?;

        let summaries: Vec<(String, String)> = children
            .iter()
            .map(|c| {
                (
                    c.index_id().to_string(),
                    c.summary().unwrap_or_default().to_string(),
                )
            })
            .collect();
        for child in children {
            self.docstore.add_index_struct(child)?;
        }

        match parent_kind {
            IndexKind::List => {
                let mut list = ListIndex::new();
                for (child_id, summary) in summaries {
                    list.add_node(Node::new(summary).with_ref_doc(child_id))?;
                }
                Ok(IndexStruct::List(list))
            }
            IndexKind::Tree => {
                let mut tree = TreeIndex::new();
                for (child_id, summary) in summaries {
                    tree.insert_under(Node::new(summary).with_ref_doc(child_id), None)?;
                }
                Ok(IndexStruct::Tree(tree))
            }
            IndexKind::KeywordTable => {
                let mut table = KeywordTableIndex::new();
                for (child_id, summary) in summaries {
                    let keywords = simple_extract_keywords(&summary, COMPOSED_SUMMARY_KEYWORDS);
                    table.add_node(&keywords, Node::new(summary).with_ref_doc(child_id))?;
                }
                Ok(IndexStruct::KeywordTable(table))
            }
            IndexKind::VectorDict => {
                let texts: Vec<String> = summaries.iter().map(|(_, s)| s.clone()).collect();
                let vectors = self.services.embedder.embed_batch(&texts).await?;
                if vectors.len() != texts.len() {
                    return Err(Error::Embedding(format!(
                        "embedder returned {} vectors for {} summaries",
                        vectors.len(),
                        texts.len()
                    )));
                }
                let mut vector = VectorDictIndex::new();
                for ((child_id, summary), embedding) in summaries.into_iter().zip(vectors) {
                    vector.add_node(
                        None,
                        Node::new(summary).with_ref_doc(child_id).with_embedding(embedding),
                    )?;
                }
                Ok(IndexStruct::VectorDict(vector))
            }
        }
    }

    /// Walk composition edges from each new child; revisiting an index id on
    /// the current path means the composition would loop at query time
    fn check_acyclic(&self, children: &[IndexStruct]) -> Result<()> {
        let pending: HashMap<String, BTreeSet<String>> = children
            .iter()
            .map(|c| (c.index_id().to_string(), c.ref_doc_ids()))
            .collect();
        for child in children {
            let mut path = HashSet::new();
            self.walk_refs(child.index_id(), &pending, &mut path)?;
        }
        Ok(())
    }

    fn walk_refs(
        &self,
        id: &str,
        pending: &HashMap<String, BTreeSet<String>>,
        path: &mut HashSet<String>,
    ) -> Result<()> {
        if !path.insert(id.to_string()) {
            return Err(Error::Configuration(format!(
                "composition cycle through index {id}"
            )));
        }
        let refs: BTreeSet<String> = if let Some(refs) = pending.get(id) {
            refs.clone()
        } else {
            match self.docstore.get(id) {
                Some(StoredDoc::Index(sub)) => sub.ref_doc_ids(),
                _ => BTreeSet::new(),
            }
        };
        for next in &refs {
            self.walk_refs(next, pending, path)?;
        }
        path.remove(id);
        Ok(())
    }
}
