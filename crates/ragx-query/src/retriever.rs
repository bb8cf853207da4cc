//! Retrieval strategies over the index variants

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use ragx_core::prompt::{
    default_query_keyword_extract_template, default_tree_select_template, parse_numbered_answer,
};
use ragx_core::{Error, Result, Services, SimilarityMode, get_top_k};
use ragx_index::{
    parse_keyword_response, simple_extract_keywords, IndexKind, IndexStruct, KeywordTableIndex,
    ListIndex, Node, TreeIndex, VectorDictIndex,
};

use crate::response::ResponseMode;

/// How a retriever walks its index.
///
/// `Default` is the variant's native strategy: full scan for a list, LLM
/// descent for a tree, keyword overlap for a keyword table, and similarity
/// search for a vector dict. `Embedding` switches a list to similarity
/// search; `Retrieve` returns a tree's root summaries without descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverMode {
    #[default]
    Default,
    Embedding,
    Retrieve,
}

impl std::fmt::Display for RetrieverMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetrieverMode::Default => "default",
            RetrieverMode::Embedding => "embedding",
            RetrieverMode::Retrieve => "retrieve",
        };
        f.write_str(name)
    }
}

/// Per-index-kind query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub mode: RetrieverMode,
    pub top_k: usize,
    pub similarity_cutoff: Option<f32>,
    pub similarity_mode: SimilarityMode,
    pub max_keywords_per_query: usize,
    pub use_llm_keywords: bool,
    pub response_mode: ResponseMode,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mode: RetrieverMode::Default,
            top_k: 1,
            similarity_cutoff: None,
            similarity_mode: SimilarityMode::Cosine,
            max_keywords_per_query: 10,
            use_llm_keywords: false,
            response_mode: ResponseMode::Refine,
        }
    }
}

impl QueryConfig {
    /// Reject mode/kind pairings that have no defined strategy
    pub fn validate_for(&self, kind: IndexKind) -> Result<()> {
        let supported = match kind {
            IndexKind::List => {
                matches!(self.mode, RetrieverMode::Default | RetrieverMode::Embedding)
            }
            IndexKind::Tree => {
                matches!(self.mode, RetrieverMode::Default | RetrieverMode::Retrieve)
            }
            IndexKind::KeywordTable | IndexKind::VectorDict => {
                matches!(self.mode, RetrieverMode::Default)
            }
        };
        if supported {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(format!(
                "{} retrieval is not supported for the {kind} index",
                self.mode
            )))
        }
    }
}

/// Retrieves the nodes relevant to a query from one index struct
pub struct Retriever<'a> {
    services: &'a Services,
    config: &'a QueryConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(services: &'a Services, config: &'a QueryConfig) -> Self {
        Self { services, config }
    }

    pub async fn retrieve(&self, query: &str, index: &IndexStruct) -> Result<Vec<Node>> {
        self.config.validate_for(index.kind())?;
        match index {
            IndexStruct::List(list) => match self.config.mode {
                RetrieverMode::Embedding => self.retrieve_list_embedding(query, list).await,
                _ => Ok(list.nodes().to_vec()),
            },
            IndexStruct::Tree(tree) => match self.config.mode {
                RetrieverMode::Retrieve => Ok(tree.roots()?.into_iter().cloned().collect()),
                _ => self.retrieve_tree_descent(query, tree).await,
            },
            IndexStruct::KeywordTable(table) => self.retrieve_keyword(query, table).await,
            IndexStruct::VectorDict(vector) => self.retrieve_vector(query, vector).await,
        }
    }

    /// Similarity search over a list's nodes; every node must carry an
    /// embedding
    async fn retrieve_list_embedding(&self, query: &str, list: &ListIndex) -> Result<Vec<Node>> {
        let mut ids = Vec::with_capacity(list.len());
        let mut embeddings = Vec::with_capacity(list.len());
        for node in list.nodes() {
            let embedding = node
                .embedding
                .clone()
                .ok_or_else(|| Error::MissingEmbedding(node.id.clone()))?;
            ids.push(node.id.clone());
            embeddings.push(embedding);
        }
        let query_embedding = self.services.embedder.embed_query(query).await?;
        let top = get_top_k(
            &query_embedding,
            &embeddings,
            &ids,
            self.config.top_k,
            self.config.similarity_cutoff,
            self.config.similarity_mode,
        )?;
        top.into_iter()
            .map(|scored| {
                list.nodes()
                    .iter()
                    .find(|n| n.id == scored.id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("node {}", scored.id)))
            })
            .collect()
    }

    /// Keyword overlap: extract query keywords, keep those present in the
    /// table's vocabulary, and union the posting sets. No overlap retrieves
    /// nothing; that is an empty result, not an error.
    async fn retrieve_keyword(&self, query: &str, table: &KeywordTableIndex) -> Result<Vec<Node>> {
        let keywords = if self.config.use_llm_keywords {
            let prompt = default_query_keyword_extract_template().format(&[
                ("max_keywords", &self.config.max_keywords_per_query.to_string()),
                ("text", query),
            ]);
            let response = self.services.llm.complete(&prompt).await?;
            parse_keyword_response(&response.text)?
        } else {
            simple_extract_keywords(query, self.config.max_keywords_per_query)
        };

        let mut node_ids: BTreeSet<String> = BTreeSet::new();
        for keyword in keywords
            .iter()
            .filter(|k| table.has_keyword(k))
            .take(self.config.max_keywords_per_query)
        {
            node_ids.extend(table.node_ids_for_keyword(keyword).into_iter().cloned());
        }

        node_ids
            .iter()
            .map(|id| table.get(id).cloned())
            .collect()
    }

    /// Similarity search over a vector dict; candidate order is insertion
    /// order, so score ties resolve to the earliest-added entry
    async fn retrieve_vector(&self, query: &str, vector: &VectorDictIndex) -> Result<Vec<Node>> {
        let entries = vector.entries()?;
        let mut ids = Vec::with_capacity(entries.len());
        let mut embeddings = Vec::with_capacity(entries.len());
        for (text_id, node) in &entries {
            let embedding = node
                .embedding
                .clone()
                .ok_or_else(|| Error::MissingEmbedding(node.id.clone()))?;
            ids.push((*text_id).clone());
            embeddings.push(embedding);
        }
        let query_embedding = self.services.embedder.embed_query(query).await?;
        let top = get_top_k(
            &query_embedding,
            &embeddings,
            &ids,
            self.config.top_k,
            self.config.similarity_cutoff,
            self.config.similarity_mode,
        )?;
        top.iter()
            .map(|scored| vector.get(&scored.id).cloned())
            .collect()
    }

    /// Walk from the roots to a leaf, asking the model to pick among the
    /// candidate summaries at each level. A single candidate is taken
    /// without a model call.
    async fn retrieve_tree_descent(&self, query: &str, tree: &TreeIndex) -> Result<Vec<Node>> {
        if tree.is_empty() {
            return Ok(Vec::new());
        }
        let template = default_tree_select_template();
        let mut candidates = tree.roots()?;
        loop {
            let chosen = if candidates.len() == 1 {
                candidates[0]
            } else {
                let context_list: Vec<String> = candidates
                    .iter()
                    .enumerate()
                    .map(|(i, node)| format!("({}) {}", i + 1, node.text))
                    .collect();
                let prompt = template.format(&[
                    ("num_chunks", &candidates.len().to_string()),
                    ("context_list", &context_list.join("\n")),
                    ("query_str", query),
                ]);
                let response = self.services.llm.complete(&prompt).await?;
                let choice = parse_numbered_answer(&response.text)?;
                if choice == 0 || choice > candidates.len() {
                    return Err(Error::MalformedOutput {
                        message: format!(
                            "selection {choice} is outside 1..={}",
                            candidates.len()
                        ),
                        raw: response.text,
                    });
                }
                candidates[choice - 1]
            };
            if chosen.child_ids.is_empty() {
                return Ok(vec![chosen.clone()]);
            }
            candidates = tree.children_of(&chosen.id)?;
        }
    }
}
