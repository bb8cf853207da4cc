//! RAGX: retrieval-augmented generation orchestration
//!
//! Documents are split into nodes and organized under one of four index
//! variants (list, tree, keyword table, vector dict). Retrievers pull the
//! relevant nodes back out, the response builder folds them into one answer
//! under the model's token budget, and the query runner recurses through
//! composed indices registered in the document store.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ragx::{IndexStruct, ListIndexBuilder, QueryRunner, Services, SimpleDocumentStore};
//! use ragx::core::Document;
//!
//! # async fn run(llm: Arc<dyn ragx::core::LanguageModel>,
//! #              embedder: Arc<dyn ragx::core::Embedder>) -> ragx::Result<()> {
//! let services = Services::new(llm, embedder)?;
//! let docs = vec![Document::new("Rust is a systems programming language.")];
//! let index = IndexStruct::List(ListIndexBuilder::new(&services)?.build(&docs)?);
//!
//! let runner = QueryRunner::new(services, SimpleDocumentStore::new());
//! let answer = runner.query("What is Rust?", &index).await?;
//! # let _ = answer;
//! # Ok(())
//! # }
//! ```

pub use ragx_core as core;
pub use ragx_index as index;
pub use ragx_query as query;

pub use ragx_core::{
    ChatMessage, Document, Embedder, Error, LanguageModel, LlmMetadata, PromptHelper,
    PromptTemplate, Result, Services, SimilarityMode, TokenTextSplitter,
};
pub use ragx_index::{
    IndexKind, IndexStruct, KeywordTableIndexBuilder, ListIndexBuilder, Node, PersistedState,
    SimpleDocumentStore, TreeIndexBuilder, VectorDictIndexBuilder,
};
pub use ragx_query::{
    ChatMemory, ContextChatEngine, QueryConfig, QueryRunner, ResponseBuilder, ResponseMode,
    Retriever, RetrieverMode,
};
