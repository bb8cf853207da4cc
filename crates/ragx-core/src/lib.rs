//! Core traits and types for RAGX
//!
//! This crate defines the fundamental traits and types used across the RAGX
//! system. It provides capability-facing interfaces for language models and
//! embedding models, prompt templates, the token budgeting helper, and the
//! text splitter used at indexing time, making the system test-friendly and
//! extensible.

pub mod budget;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod services;
pub mod splitter;

pub use budget::PromptHelper;
pub use document::Document;
pub use embedding::{
    Embedder, EmbeddingQueue, ScoredId, SimilarityMode, get_top_k, similarity,
};
pub use error::{Error, Result};
pub use llm::{
    ChatMessage, CompletionResponse, LanguageModel, LlmMetadata, MessageRole, TokenStream,
};
pub use prompt::{PromptTemplate, parse_numbered_answer};
pub use services::Services;
pub use splitter::TokenTextSplitter;
