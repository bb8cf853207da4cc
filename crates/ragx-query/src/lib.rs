//! Query layer for RAGX
//!
//! This crate implements retrieval strategies over the index variants, the
//! token-budgeted response builder, the recursive query runner for composed
//! indices, and a context chat engine with streaming history.

pub mod chat;
pub mod response;
pub mod retriever;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatMemory, ContextChatEngine, StreamingChatResponse};
pub use response::{ResponseBuilder, ResponseMode};
pub use retriever::{QueryConfig, Retriever, RetrieverMode};
pub use runner::QueryRunner;

// Re-export core and index types for convenience
pub use ragx_core::{Document, Error, Result, Services};
pub use ragx_index::{IndexKind, IndexStruct, Node, SimpleDocumentStore};
