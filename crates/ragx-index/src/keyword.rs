//! Keyword table index and keyword extraction utilities

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use uuid::Uuid;

use ragx_core::{Error, Result};

use crate::node::Node;

/// A mapping from keyword to the set of node ids indexed under it, plus the
/// node table itself. A node may appear under zero or more keywords.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordTableIndex {
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    table: HashMap<String, BTreeSet<String>>,
    nodes: HashMap<String, Node>,
}

impl KeywordTableIndex {
    pub fn new() -> Self {
        Self {
            index_id: Uuid::new_v4().to_string(),
            summary: None,
            table: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    /// Add a node, posting it under each of the given keywords
    pub fn add_node(&mut self, keywords: &[String], node: Node) -> Result<()> {
        if node.text.trim().is_empty() {
            return Err(Error::InvalidInput("node text must be non-empty".to_string()));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        for keyword in keywords {
            self.table
                .entry(keyword.to_lowercase())
                .or_default()
                .insert(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    /// Whether the vocabulary contains the keyword
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.table.contains_key(&keyword.to_lowercase())
    }

    /// Node ids posted under a keyword (empty when absent)
    pub fn node_ids_for_keyword(&self, keyword: &str) -> Vec<&String> {
        self.table
            .get(&keyword.to_lowercase())
            .map(|ids| ids.iter().collect())
            .unwrap_or_default()
    }

    pub fn keywords(&self) -> BTreeSet<&str> {
        self.table.keys().map(String::as_str).collect()
    }

    pub fn nodes(&self) -> &HashMap<String, Node> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every posted id resolves to the node table
    pub fn validate(&self) -> Result<()> {
        for (keyword, ids) in &self.table {
            for id in ids {
                if !self.nodes.contains_key(id) {
                    return Err(Error::NotFound(format!(
                        "node {id} posted under keyword '{keyword}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for KeywordTableIndex {
    fn default() -> Self {
        Self::new()
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
    "into", "is", "it", "its", "no", "not", "of", "on", "or", "s", "such", "t",
    "that", "the", "their", "then", "there", "these", "they", "this", "to",
    "was", "we", "what", "which", "who", "will", "with",
];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("static regex"));

/// Extract keyword candidates from text without an LLM: alphanumeric tokens,
/// lowercased, stopwords removed, deduplicated in first-occurrence order,
/// capped at `max_keywords`.
pub fn simple_extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut keywords = Vec::new();
    for token in TOKEN_RE.find_iter(text) {
        let word = token.as_str().to_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word);
            if keywords.len() == max_keywords {
                break;
            }
        }
    }
    keywords
}

/// Parse a `KEYWORDS: a, b, c` response from a keyword-extraction LLM call.
///
/// A response without the marker is a terminal error carrying the raw text.
pub fn parse_keyword_response(raw: &str) -> Result<Vec<String>> {
    let after = raw
        .split("KEYWORDS:")
        .nth(1)
        .ok_or_else(|| Error::MalformedOutput {
            message: "no 'KEYWORDS:' marker in extraction response".to_string(),
            raw: raw.to_string(),
        })?;

    let keywords: Vec<String> = after
        .lines()
        .next()
        .unwrap_or("")
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return Err(Error::MalformedOutput {
            message: "no keywords following 'KEYWORDS:'".to_string(),
            raw: raw.to_string(),
        });
    }
    Ok(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut index = KeywordTableIndex::new();
        index
            .add_node(
                &["hello".to_string(), "world".to_string()],
                Node::with_id("n1", "Hello world."),
            )
            .unwrap();
        index
            .add_node(&["test".to_string()], Node::with_id("n2", "This is a test."))
            .unwrap();

        assert_eq!(index.node_ids_for_keyword("hello"), vec!["n1"]);
        assert_eq!(index.node_ids_for_keyword("test"), vec!["n2"]);
        assert!(index.node_ids_for_keyword("absent").is_empty());
        index.validate().unwrap();
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let mut index = KeywordTableIndex::new();
        index
            .add_node(&["Rust".to_string()], Node::with_id("n1", "rust text"))
            .unwrap();
        assert!(index.has_keyword("rust"));
        assert_eq!(index.node_ids_for_keyword("RUST"), vec!["n1"]);
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut index = KeywordTableIndex::new();
        index.add_node(&[], Node::with_id("n1", "text")).unwrap();
        let err = index.add_node(&[], Node::with_id("n1", "again")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
    }

    #[test]
    fn test_simple_extract_keywords() {
        let keywords = simple_extract_keywords("This is a test of the Keyword extractor", 10);
        assert_eq!(keywords, vec!["test", "keyword", "extractor"]);
    }

    #[test]
    fn test_simple_extract_respects_cap() {
        let keywords = simple_extract_keywords("alpha beta gamma delta", 2);
        assert_eq!(keywords, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_parse_keyword_response() {
        let keywords = parse_keyword_response("KEYWORDS: Alpha, beta , gamma").unwrap();
        assert_eq!(keywords, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_parse_keyword_response_malformed() {
        let err = parse_keyword_response("here are some words").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
    }
}
