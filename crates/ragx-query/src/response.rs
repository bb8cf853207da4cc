//! Answer synthesis over retrieved text fragments

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ragx_core::prompt::{default_refine_template, default_text_qa_template};
use ragx_core::{LanguageModel, PromptHelper, PromptTemplate, Result, Services};

/// How fragments are folded into one answer.
///
/// `Refine` makes one model call per budget-sized piece, threading the
/// running answer through the refinement prompt. `Compact` first packs the
/// fragments into as few context windows as possible, trading answer
/// granularity for fewer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Refine,
    Compact,
}

/// Builds one answer from a query and an ordered list of text fragments
pub struct ResponseBuilder {
    llm: Arc<dyn LanguageModel>,
    prompt_helper: PromptHelper,
    qa_template: PromptTemplate,
    refine_template: PromptTemplate,
}

impl ResponseBuilder {
    pub fn new(services: &Services) -> Self {
        Self {
            llm: services.llm.clone(),
            prompt_helper: services.prompt_helper.clone(),
            qa_template: default_text_qa_template(),
            refine_template: default_refine_template(),
        }
    }

    pub fn with_templates(mut self, qa: PromptTemplate, refine: PromptTemplate) -> Self {
        self.qa_template = qa;
        self.refine_template = refine;
        self
    }

    /// Synthesize an answer. Fragment order is the synthesis order; no
    /// fragments yields an empty answer without a model call.
    pub async fn get_response(
        &self,
        query: &str,
        texts: &[String],
        mode: ResponseMode,
    ) -> Result<String> {
        if texts.is_empty() {
            return Ok(String::new());
        }
        let texts = match mode {
            ResponseMode::Refine => texts.to_vec(),
            ResponseMode::Compact => {
                let qa = self.qa_template.partial_format(&[("query_str", query)]);
                self.prompt_helper.repack(&qa, texts)?
            }
        };
        let mut answer: Option<String> = None;
        for text in &texts {
            answer = Some(self.refine_one(query, answer, text).await?);
        }
        Ok(answer.unwrap_or_default())
    }

    /// Fold one fragment into the running answer. The first piece of the
    /// first fragment is answered with the question-answering prompt; every
    /// subsequent piece refines the existing answer.
    ///
    /// The context budget is re-derived before every call against the
    /// template that call will realize, with the running answer already
    /// formatted in, so the refine prompt never eats into the reserved
    /// output as the answer grows.
    async fn refine_one(
        &self,
        query: &str,
        mut answer: Option<String>,
        text: &str,
    ) -> Result<String> {
        let qa = self.qa_template.partial_format(&[("query_str", query)]);
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let mut start = 0;
        while start < tokens.len() {
            let (template, slot) = match &answer {
                None => (qa.clone(), "context_str"),
                Some(existing) => (
                    self.refine_template.partial_format(&[
                        ("query_str", query),
                        ("existing_answer", existing),
                    ]),
                    "context_msg",
                ),
            };
            let budget = self.prompt_helper.chunk_size_for(&template, 1)?;
            let end = (start + budget).min(tokens.len());
            let piece = tokens[start..end].join(" ");
            let prompt = template.format(&[(slot, &piece)]);
            let response = self.llm.complete(&prompt).await?;
            answer = Some(response.text.trim().to_string());
            start = end;
        }
        Ok(answer.unwrap_or_default())
    }
}
