//! Language model capability trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Result;

/// Incremental token sequence produced by a streaming call.
///
/// The sender side is owned by the language model implementation; the
/// channel closes when the model is done producing tokens.
pub type TokenStream = mpsc::Receiver<String>;

/// Static metadata reported by a language model, consumed by the
/// token budgeting helper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMetadata {
    pub model: String,
    pub context_window: usize,
    pub num_output: usize,
}

impl Default for LlmMetadata {
    fn default() -> Self {
        Self {
            model: "unknown".to_string(),
            context_window: 4096,
            num_output: 256,
        }
    }
}

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Result of a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
}

/// Trait for language models (e.g. hosted or local LLM backends)
///
/// This trait defines the interface for invoking Large Language Models.
/// Upstream failures are surfaced as `Error::Llm` and are never retried
/// here; retry policy belongs to the implementation behind this trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a raw prompt
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse>;

    /// Complete a chat conversation
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatMessage>;

    /// Complete a raw prompt, streaming tokens incrementally
    async fn stream_complete(&self, prompt: &str) -> Result<TokenStream>;

    /// Complete a chat conversation, streaming tokens incrementally
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TokenStream>;

    /// Metadata describing the model's context window and output reservation
    fn metadata(&self) -> LlmMetadata;
}
