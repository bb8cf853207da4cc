//! Explicit collaborator bundle threaded through builders and queries

use std::sync::Arc;

use crate::budget::PromptHelper;
use crate::embedding::Embedder;
use crate::llm::LanguageModel;
use crate::Result;

/// The collaborators a build or query needs: a language model, an embedding
/// model, and the token budgeting helper derived from the model's metadata.
///
/// Constructed once and passed explicitly into constructors; there is no
/// process-global instance to reach for.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub prompt_helper: PromptHelper,
}

impl Services {
    /// Create services, deriving the budgeting helper from the model
    pub fn new(llm: Arc<dyn LanguageModel>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let prompt_helper = PromptHelper::from_metadata(&llm.metadata())?;
        Ok(Self { llm, embedder, prompt_helper })
    }

    /// Override the budgeting helper (e.g. to install a model tokenizer)
    pub fn with_prompt_helper(mut self, prompt_helper: PromptHelper) -> Self {
        self.prompt_helper = prompt_helper;
        self
    }
}
