//! Index builders: batch ingestion of documents plus incremental insert

use std::sync::Arc;

use ragx_core::embedding::{DEFAULT_EMBED_BATCH_SIZE, Embedder, EmbeddingQueue};
use ragx_core::llm::LanguageModel;
use ragx_core::prompt::{
    PromptTemplate, default_keyword_extract_template, default_summary_template,
    default_text_qa_template,
};
use ragx_core::{Document, Error, Result, Services, TokenTextSplitter};

use crate::keyword::{KeywordTableIndex, parse_keyword_response, simple_extract_keywords};
use crate::list::ListIndex;
use crate::node::Node;
use crate::tree::TreeIndex;
use crate::vector::VectorDictIndex;

const DEFAULT_MAX_KEYWORDS_PER_CHUNK: usize = 10;
const DEFAULT_NUM_CHILDREN: usize = 10;

fn require_documents(documents: &[Document]) -> Result<()> {
    if documents.is_empty() {
        return Err(Error::Configuration(
            "at least one document must be provided to build an index".to_string(),
        ));
    }
    Ok(())
}

/// Builds list indices: documents are chunked in order and appended
pub struct ListIndexBuilder {
    splitter: TokenTextSplitter,
}

impl ListIndexBuilder {
    /// Chunk size is derived from the QA prompt so every chunk fits a
    /// single synthesis call
    pub fn new(services: &Services) -> Result<Self> {
        let splitter = services
            .prompt_helper
            .splitter_for(&default_text_qa_template(), 1)?;
        Ok(Self { splitter })
    }

    pub fn with_splitter(mut self, splitter: TokenTextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn build(&self, documents: &[Document]) -> Result<ListIndex> {
        require_documents(documents)?;
        let mut index = ListIndex::new();
        for document in documents {
            self.insert(&mut index, document)?;
        }
        Ok(index)
    }

    pub fn insert(&self, index: &mut ListIndex, document: &Document) -> Result<()> {
        for chunk in self.splitter.split_text(&document.text) {
            index.add_node(Node::new(chunk).with_ref_doc(&document.doc_id))?;
        }
        Ok(())
    }
}

/// How keywords are extracted from indexed chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordExtractMode {
    /// Tokenize and filter stopwords; no LLM call
    #[default]
    Simple,
    /// Delegate extraction to the language model
    Llm,
}

/// Builds keyword table indices
pub struct KeywordTableIndexBuilder {
    llm: Arc<dyn LanguageModel>,
    splitter: TokenTextSplitter,
    mode: KeywordExtractMode,
    max_keywords_per_chunk: usize,
    extract_template: PromptTemplate,
}

impl KeywordTableIndexBuilder {
    pub fn new(services: &Services) -> Result<Self> {
        let extract_template = default_keyword_extract_template();
        let splitter = services.prompt_helper.splitter_for(&extract_template, 1)?;
        Ok(Self {
            llm: services.llm.clone(),
            splitter,
            mode: KeywordExtractMode::default(),
            max_keywords_per_chunk: DEFAULT_MAX_KEYWORDS_PER_CHUNK,
            extract_template,
        })
    }

    pub fn with_splitter(mut self, splitter: TokenTextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_mode(mut self, mode: KeywordExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_keywords_per_chunk(mut self, max: usize) -> Self {
        self.max_keywords_per_chunk = max;
        self
    }

    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>> {
        match self.mode {
            KeywordExtractMode::Simple => {
                Ok(simple_extract_keywords(text, self.max_keywords_per_chunk))
            }
            KeywordExtractMode::Llm => {
                let prompt = self.extract_template.format(&[
                    ("max_keywords", &self.max_keywords_per_chunk.to_string()),
                    ("text", text),
                ]);
                let response = self.llm.complete(&prompt).await?;
                let mut keywords = parse_keyword_response(&response.text)?;
                keywords.truncate(self.max_keywords_per_chunk);
                Ok(keywords)
            }
        }
    }

    pub async fn build(&self, documents: &[Document]) -> Result<KeywordTableIndex> {
        require_documents(documents)?;
        let mut index = KeywordTableIndex::new();
        for document in documents {
            self.insert(&mut index, document).await?;
        }
        Ok(index)
    }

    pub async fn insert(
        &self,
        index: &mut KeywordTableIndex,
        document: &Document,
    ) -> Result<()> {
        for chunk in self.splitter.split_text(&document.text) {
            let keywords = self.extract_keywords(&chunk).await?;
            index.add_node(&keywords, Node::new(chunk).with_ref_doc(&document.doc_id))?;
        }
        Ok(())
    }
}

/// Builds in-memory vector dict indices; embeddings are computed through
/// the batching queue so upstream batch calls flush in enqueue order
pub struct VectorDictIndexBuilder {
    embedder: Arc<dyn Embedder>,
    splitter: TokenTextSplitter,
    batch_size: usize,
}

impl VectorDictIndexBuilder {
    pub fn new(services: &Services) -> Result<Self> {
        let splitter = services
            .prompt_helper
            .splitter_for(&default_text_qa_template(), 1)?;
        Ok(Self {
            embedder: services.embedder.clone(),
            splitter,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
        })
    }

    pub fn with_splitter(mut self, splitter: TokenTextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub async fn build(&self, documents: &[Document]) -> Result<VectorDictIndex> {
        require_documents(documents)?;
        let mut index = VectorDictIndex::new();
        for document in documents {
            self.insert(&mut index, document).await?;
        }
        Ok(index)
    }

    pub async fn insert(
        &self,
        index: &mut VectorDictIndex,
        document: &Document,
    ) -> Result<()> {
        let mut nodes: Vec<Node> = self
            .splitter
            .split_text(&document.text)
            .into_iter()
            .map(|chunk| Node::new(chunk).with_ref_doc(&document.doc_id))
            .collect();

        let mut queue = EmbeddingQueue::new(self.batch_size);
        for node in &nodes {
            queue.push(node.id.clone(), node.text.clone());
        }
        let embeddings = queue.flush(self.embedder.as_ref()).await?;

        for (node, (id, vector)) in nodes.iter_mut().zip(embeddings) {
            debug_assert_eq!(node.id, id);
            node.embedding = Some(vector);
        }
        for node in nodes {
            index.add_node(None, node)?;
        }
        Ok(())
    }
}

/// Builds tree indices bottom-up: leaf chunks are grouped and each group is
/// summarized into a parent node, level by level, until one root remains
pub struct TreeIndexBuilder {
    llm: Arc<dyn LanguageModel>,
    splitter: TokenTextSplitter,
    num_children: usize,
    summary_template: PromptTemplate,
}

impl TreeIndexBuilder {
    pub fn new(services: &Services) -> Result<Self> {
        let summary_template = default_summary_template();
        let splitter = services.prompt_helper.splitter_for(&summary_template, 1)?;
        Ok(Self {
            llm: services.llm.clone(),
            splitter,
            num_children: DEFAULT_NUM_CHILDREN,
            summary_template,
        })
    }

    pub fn with_splitter(mut self, splitter: TokenTextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_num_children(mut self, num_children: usize) -> Result<Self> {
        if num_children < 2 {
            return Err(Error::Configuration(
                "num_children must be at least 2".to_string(),
            ));
        }
        self.num_children = num_children;
        Ok(self)
    }

    async fn summarize(&self, texts: &[&str]) -> Result<String> {
        let context = texts.join("\n\n");
        let prompt = self.summary_template.format(&[("context_str", context.as_str())]);
        let response = self.llm.complete(&prompt).await?;
        Ok(response.text)
    }

    pub async fn build(&self, documents: &[Document]) -> Result<TreeIndex> {
        require_documents(documents)?;

        let mut current: Vec<Node> = Vec::new();
        for document in documents {
            for chunk in self.splitter.split_text(&document.text) {
                current.push(Node::new(chunk).with_ref_doc(&document.doc_id));
            }
        }
        if current.is_empty() {
            return Err(Error::InvalidInput(
                "documents produced no text chunks".to_string(),
            ));
        }

        let mut settled: Vec<Node> = Vec::new();
        while current.len() > 1 {
            let mut parents: Vec<Node> = Vec::new();
            for group in current.chunks_mut(self.num_children) {
                let texts: Vec<&str> = group.iter().map(|n| n.text.as_str()).collect();
                let summary = self.summarize(&texts).await?;
                let mut parent = Node::new(summary);
                for child in group.iter_mut() {
                    child.parent_id = Some(parent.id.clone());
                    parent.child_ids.insert(child.id.clone());
                }
                parents.push(parent);
            }
            settled.append(&mut current);
            current = parents;
        }

        let root_ids: Vec<String> = current.iter().map(|n| n.id.clone()).collect();
        settled.extend(current);
        TreeIndex::from_nodes(settled, root_ids)
    }

    /// Insert one document into an existing tree: its chunks become new
    /// children of the first root, whose summary text is then regenerated
    pub async fn insert(&self, index: &mut TreeIndex, document: &Document) -> Result<()> {
        let chunks = self.splitter.split_text(&document.text);
        if chunks.is_empty() {
            return Ok(());
        }

        let root_id = match index.roots()?.first() {
            Some(root) => root.id.clone(),
            None => {
                // Empty tree: first chunk seeds the root.
                let mut chunks = chunks.into_iter();
                let first = chunks.next().expect("checked non-empty");
                let root = Node::new(first).with_ref_doc(&document.doc_id);
                let root_id = root.id.clone();
                index.insert_under(root, None)?;
                for chunk in chunks {
                    index.insert_under(
                        Node::new(chunk).with_ref_doc(&document.doc_id),
                        Some(&root_id),
                    )?;
                }
                return Ok(());
            }
        };

        // Summarize before mutating: a failed model call must leave the
        // tree exactly as it was.
        let mut child_texts: Vec<String> = index
            .children_of(&root_id)?
            .iter()
            .map(|n| n.text.clone())
            .collect();
        child_texts.extend(chunks.iter().cloned());
        let refs: Vec<&str> = child_texts.iter().map(String::as_str).collect();
        let summary = self.summarize(&refs).await?;

        for chunk in chunks {
            index.insert_under(
                Node::new(chunk).with_ref_doc(&document.doc_id),
                Some(&root_id),
            )?;
        }
        index.get_mut(&root_id)?.text = summary;
        index.validate()
    }
}
