//! Context chat engine: retrieval-grounded chat with streaming and history

use std::sync::{Arc, Mutex};

use ragx_core::prompt::PromptTemplate;
use ragx_core::{ChatMessage, Error, PromptHelper, Result, Services, TokenStream};
use ragx_index::IndexStruct;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::retriever::{QueryConfig, Retriever};

fn default_context_template() -> PromptTemplate {
    PromptTemplate::new(
        "Context information is below.\n\
         ---------------------\n\
         {context_str}\n\
         ---------------------\n\
         Use the context information above and the conversation so far to \
         answer the user.\n",
    )
}

/// Shared conversation history.
///
/// Cloning shares the underlying message list, so the engine and its
/// streaming tasks append to the same history.
#[derive(Clone, Default)]
pub struct ChatMemory {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: ChatMessage) {
        self.messages.lock().expect("chat memory poisoned").push(message);
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.lock().expect("chat memory poisoned").clone()
    }

    /// The most recent messages whose combined token count fits the budget.
    /// Messages are dropped oldest-first, never truncated mid-message.
    pub fn recent(&self, helper: &PromptHelper, token_budget: usize) -> Vec<ChatMessage> {
        let messages = self.messages.lock().expect("chat memory poisoned");
        let mut used = 0usize;
        let mut kept = Vec::new();
        for message in messages.iter().rev() {
            let tokens = helper.count_tokens(&message.content);
            if used + tokens > token_budget {
                break;
            }
            used += tokens;
            kept.push(message.clone());
        }
        kept.reverse();
        kept
    }
}

/// A streaming reply: incremental tokens plus a handle to the history write
/// that completes once the stream is drained
pub struct StreamingChatResponse {
    pub tokens: TokenStream,
    history_write: JoinHandle<()>,
}

impl StreamingChatResponse {
    /// Wait for the full reply to be recorded in memory
    pub async fn join(self) -> Result<()> {
        self.history_write
            .await
            .map_err(|e| Error::Other(format!("history task failed: {e}")))
    }
}

/// Chat engine that grounds every turn in retrieved index context
pub struct ContextChatEngine {
    services: Services,
    index: IndexStruct,
    config: QueryConfig,
    memory: ChatMemory,
    context_template: PromptTemplate,
}

impl ContextChatEngine {
    pub fn new(services: Services, index: IndexStruct) -> Self {
        Self {
            services,
            index,
            config: QueryConfig::default(),
            memory: ChatMemory::new(),
            context_template: default_context_template(),
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_memory(mut self, memory: ChatMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }

    /// Retrieve context for the message and assemble the model input:
    /// a context system message, the recent history, then the user turn
    async fn build_turn(&self, message: &str) -> Result<Vec<ChatMessage>> {
        let retriever = Retriever::new(&self.services, &self.config);
        let nodes = retriever.retrieve(message, &self.index).await?;
        let joined: Vec<String> = nodes.into_iter().map(|n| n.text).collect();
        let context = self
            .services
            .prompt_helper
            .split(&self.context_template, &joined.join("\n\n"), 1)?
            .into_iter()
            .next()
            .unwrap_or_default();

        let history_budget = self.services.prompt_helper.context_window() / 4;
        let mut messages = vec![ChatMessage::system(
            self.context_template.format(&[("context_str", &context)]),
        )];
        messages.extend(self.memory.recent(&self.services.prompt_helper, history_budget));
        messages.push(ChatMessage::user(message));
        Ok(messages)
    }

    /// One chat turn; both the user message and the reply are recorded
    pub async fn chat(&self, message: &str) -> Result<ChatMessage> {
        let messages = self.build_turn(message).await?;
        let reply = self.services.llm.chat(&messages).await?;
        self.memory.push(ChatMessage::user(message));
        self.memory.push(reply.clone());
        Ok(reply)
    }

    /// One streaming chat turn. Tokens are forwarded as they arrive; the
    /// accumulated reply is written to memory when the model stream ends,
    /// even if the caller stops reading tokens early.
    pub async fn stream_chat(&self, message: &str) -> Result<StreamingChatResponse> {
        let messages = self.build_turn(message).await?;
        let mut upstream = self.services.llm.stream_chat(&messages).await?;
        self.memory.push(ChatMessage::user(message));

        let (tx, rx) = mpsc::channel(32);
        let memory = self.memory.clone();
        let history_write = tokio::spawn(async move {
            let mut full = String::new();
            while let Some(token) = upstream.recv().await {
                full.push_str(&token);
                // keep draining so the reply still lands in memory
                let _ = tx.send(token).await;
            }
            memory.push(ChatMessage::assistant(full));
        });

        Ok(StreamingChatResponse { tokens: rx, history_write })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{services, services_from, MockEmbedder, MockLlm};
    use ragx_core::MessageRole;
    use ragx_index::{ListIndex, Node};

    fn small_index() -> IndexStruct {
        let mut list = ListIndex::new();
        list.add_node(Node::with_id("n1", "the sky is blue")).unwrap();
        IndexStruct::List(list)
    }

    #[tokio::test]
    async fn test_chat_records_both_turns() {
        let engine = ContextChatEngine::new(services(), small_index());
        let reply = engine.chat("what color is the sky?").await.unwrap();
        assert_eq!(reply.role, MessageRole::Assistant);

        let history = engine.memory().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "what color is the sky?");
        assert_eq!(history[1], reply);
    }

    #[tokio::test]
    async fn test_chat_grounds_turn_in_retrieved_context() {
        let llm = Arc::new(MockLlm::default());
        let services = services_from(llm.clone(), Arc::new(MockEmbedder::default()));
        let engine = ContextChatEngine::new(services, small_index());
        engine.chat("what color is the sky?").await.unwrap();

        let chats = llm.chats.lock().unwrap();
        let turn = chats.last().unwrap();
        assert_eq!(turn[0].role, MessageRole::System);
        assert!(turn[0].content.contains("the sky is blue"));
        assert_eq!(turn.last().unwrap().role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_history_is_replayed_within_budget() {
        let llm = Arc::new(MockLlm::default());
        let services = services_from(llm.clone(), Arc::new(MockEmbedder::default()));
        let engine = ContextChatEngine::new(services, small_index());

        engine.chat("first question").await.unwrap();
        engine.chat("second question").await.unwrap();

        let chats = llm.chats.lock().unwrap();
        let second_turn = chats.last().unwrap();
        // system + two prior turns + current user message
        assert_eq!(second_turn.len(), 4);
        assert_eq!(second_turn[1].content, "first question");
    }

    #[test]
    fn test_recent_drops_oldest_messages_first() {
        let memory = ChatMemory::new();
        memory.push(ChatMessage::user("one two three four five"));
        memory.push(ChatMessage::assistant("six seven"));
        memory.push(ChatMessage::user("eight"));

        let helper = PromptHelper::new(100, 10).unwrap();
        let recent = memory.recent(&helper, 3);
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["six seven", "eight"]);
    }

    #[tokio::test]
    async fn test_stream_chat_tokens_rebuild_reply() {
        let engine = ContextChatEngine::new(services(), small_index());
        let mut response = engine.stream_chat("hello").await.unwrap();

        let mut collected = String::new();
        while let Some(token) = response.tokens.recv().await {
            collected.push_str(&token);
        }
        response.join().await.unwrap();

        let history = engine.memory().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, collected);
        assert!(collected.starts_with("echo:"));
    }

    #[tokio::test]
    async fn test_stream_chat_records_reply_when_receiver_dropped() {
        let engine = ContextChatEngine::new(services(), small_index());
        let response = engine.stream_chat("hello").await.unwrap();

        drop(response.tokens);
        response.history_write.await.unwrap();

        let history = engine.memory().history();
        assert_eq!(history.len(), 2);
        assert!(!history[1].content.is_empty());
    }
}
