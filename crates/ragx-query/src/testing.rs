//! Deterministic model doubles shared by this crate's test modules

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use ragx_core::{
    ChatMessage, CompletionResponse, Embedder, Error, LanguageModel, LlmMetadata, Result,
    Services, TokenStream,
};

/// Scripted language model.
///
/// Completion responses are derived from the prompt shape so that tests can
/// assert on synthesis order: question-answering prompts echo back the
/// context between the separators, refinement prompts append the new context
/// to the existing answer with a ` | ` joint.
pub(crate) struct MockLlm {
    pub select_answer: usize,
    pub keywords: String,
    pub metadata: LlmMetadata,
    pub prompts: Mutex<Vec<String>>,
    pub chats: Mutex<Vec<Vec<ChatMessage>>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self {
            select_answer: 1,
            keywords: "test".to_string(),
            metadata: LlmMetadata {
                model: "mock".to_string(),
                context_window: 4096,
                num_output: 64,
            },
            prompts: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlm {
    fn scripted_response(&self, prompt: &str) -> String {
        if prompt.contains("Provide choice in the following format") {
            return format!("ANSWER: {}, it matches the question best", self.select_answer);
        }
        if prompt.contains("KEYWORDS") {
            return format!("KEYWORDS: {}", self.keywords);
        }
        if prompt.contains("existing answer:") {
            let existing = prompt
                .split("existing answer: ")
                .nth(1)
                .and_then(|rest| rest.split("\nWe have the opportunity").next())
                .unwrap_or("")
                .trim();
            let context = prompt
                .split("------------")
                .nth(1)
                .unwrap_or("")
                .trim()
                .replace('\n', " ");
            return format!("{existing} | {context}");
        }
        // Question-answering prompt: the answer is the context verbatim.
        prompt
            .split("---------------------")
            .nth(1)
            .unwrap_or("")
            .trim()
            .replace('\n', " ")
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(CompletionResponse {
            text: self.scripted_response(prompt),
            model: self.metadata.model.clone(),
        })
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        self.chats.lock().unwrap().push(messages.to_vec());
        let last = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(ChatMessage::assistant(format!("echo: {last}")))
    }

    async fn stream_complete(&self, prompt: &str) -> Result<TokenStream> {
        let response = self.complete(prompt).await?;
        Ok(stream_words(&response.text))
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let reply = self.chat(messages).await?;
        Ok(stream_words(&reply.content))
    }

    fn metadata(&self) -> LlmMetadata {
        self.metadata.clone()
    }
}

/// Stream a reply word by word; concatenating the tokens reproduces it
fn stream_words(text: &str) -> TokenStream {
    let (tx, rx) = mpsc::channel(32);
    let tokens: Vec<String> = text
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_string() } else { format!(" {w}") })
        .collect();
    tokio::spawn(async move {
        for token in tokens {
            if tx.send(token).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Embedder returning a fixed query vector; batch vectors encode text length
pub(crate) struct MockEmbedder {
    pub query_vec: Vec<f32>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { query_vec: vec![1.0, 0.0] }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.query_vec.clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }

    fn dim(&self) -> usize {
        self.query_vec.len()
    }
}

/// A model whose every call fails, for error propagation tests
pub(crate) struct FailingLlm;

#[async_trait]
impl LanguageModel for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<CompletionResponse> {
        Err(Error::Llm("backend unavailable".to_string()))
    }

    async fn chat(&self, _messages: &[ChatMessage]) -> Result<ChatMessage> {
        Err(Error::Llm("backend unavailable".to_string()))
    }

    async fn stream_complete(&self, _prompt: &str) -> Result<TokenStream> {
        Err(Error::Llm("backend unavailable".to_string()))
    }

    async fn stream_chat(&self, _messages: &[ChatMessage]) -> Result<TokenStream> {
        Err(Error::Llm("backend unavailable".to_string()))
    }

    fn metadata(&self) -> LlmMetadata {
        LlmMetadata::default()
    }
}

pub(crate) fn services() -> Services {
    services_with(MockLlm::default(), MockEmbedder::default())
}

pub(crate) fn services_with(llm: MockLlm, embedder: MockEmbedder) -> Services {
    Services::new(Arc::new(llm), Arc::new(embedder)).unwrap()
}

/// Build services around pre-shared model handles so the test can inspect
/// recorded prompts afterwards
pub(crate) fn services_from(llm: Arc<MockLlm>, embedder: Arc<MockEmbedder>) -> Services {
    Services::new(llm, embedder).unwrap()
}
