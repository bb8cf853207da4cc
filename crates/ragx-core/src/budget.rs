//! Token budgeting helper
//!
//! Computes how much text fits a single LLM call once the expected output
//! length and the prompt template overhead are reserved out of the model's
//! context window. Drives chunk sizing at indexing time and fragment
//! packing at synthesis time.

use std::fmt;
use std::sync::Arc;

use crate::llm::LlmMetadata;
use crate::prompt::PromptTemplate;
use crate::splitter::TokenTextSplitter;
use crate::{Error, Result};

/// Counts tokens in a piece of text. The default counts whitespace-separated
/// tokens; callers with a model tokenizer can plug it in here.
pub type Tokenizer = Arc<dyn Fn(&str) -> usize + Send + Sync>;

fn whitespace_tokenizer() -> Tokenizer {
    Arc::new(|text: &str| text.split_whitespace().count())
}

/// Token budgeting helper
#[derive(Clone)]
pub struct PromptHelper {
    context_window: usize,
    num_output: usize,
    tokenizer: Tokenizer,
}

impl fmt::Debug for PromptHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptHelper")
            .field("context_window", &self.context_window)
            .field("num_output", &self.num_output)
            .finish()
    }
}

impl PromptHelper {
    pub fn new(context_window: usize, num_output: usize) -> Result<Self> {
        if num_output >= context_window {
            return Err(Error::Configuration(format!(
                "reserved output ({num_output}) must be smaller than the \
                 context window ({context_window})"
            )));
        }
        Ok(Self { context_window, num_output, tokenizer: whitespace_tokenizer() })
    }

    /// Build a helper from a model's reported metadata
    pub fn from_metadata(metadata: &LlmMetadata) -> Result<Self> {
        Self::new(metadata.context_window, metadata.num_output)
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn num_output(&self) -> usize {
        self.num_output
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        (self.tokenizer)(text)
    }

    /// Maximum token length usable per text chunk when `num_chunks` slots of
    /// the template are filled in one call.
    ///
    /// `available = context_window - num_output - template_overhead`, divided
    /// evenly among the slots. Fails fast with a configuration error instead
    /// of producing a non-positive budget.
    pub fn chunk_size_for(&self, template: &PromptTemplate, num_chunks: usize) -> Result<usize> {
        if num_chunks == 0 {
            return Err(Error::Configuration("num_chunks must be positive".to_string()));
        }
        let overhead = self.count_tokens(&template.format_empty());
        let reserved = self.num_output + overhead;
        if reserved >= self.context_window {
            return Err(Error::Configuration(format!(
                "template overhead ({overhead} tokens) plus reserved output \
                 ({} tokens) exceeds the context window ({})",
                self.num_output, self.context_window
            )));
        }
        let budget = (self.context_window - reserved) / num_chunks;
        if budget == 0 {
            return Err(Error::Configuration(format!(
                "context window ({}) cannot fit {num_chunks} chunks once \
                 {reserved} tokens are reserved",
                self.context_window
            )));
        }
        Ok(budget)
    }

    /// A splitter sized so each produced chunk fills one template slot
    pub fn splitter_for(
        &self,
        template: &PromptTemplate,
        num_chunks: usize,
    ) -> Result<TokenTextSplitter> {
        TokenTextSplitter::with_chunk_size(self.chunk_size_for(template, num_chunks)?)
    }

    /// Split one oversized text into budget-sized pieces in original order
    pub fn split(
        &self,
        template: &PromptTemplate,
        text: &str,
        num_chunks: usize,
    ) -> Result<Vec<String>> {
        Ok(self.splitter_for(template, num_chunks)?.split_text(text))
    }

    /// Pack fragments into as few window-sized groups as possible.
    ///
    /// Fragments are first split to the single-slot budget, then greedily
    /// joined in order while the group stays within budget. Order across
    /// groups matches the input order exactly.
    pub fn repack(&self, template: &PromptTemplate, texts: &[String]) -> Result<Vec<String>> {
        let budget = self.chunk_size_for(template, 1)?;
        let splitter = TokenTextSplitter::with_chunk_size(budget)?;

        let mut groups: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for text in texts {
            for piece in splitter.split_text(text) {
                let piece_tokens = self.count_tokens(&piece);
                if current_tokens > 0 && current_tokens + piece_tokens > budget {
                    groups.push(std::mem::take(&mut current));
                    current_tokens = 0;
                }
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(&piece);
                current_tokens += piece_tokens;
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::default_text_qa_template;

    fn template_with_overhead(tokens: usize) -> PromptTemplate {
        PromptTemplate::new(format!("{} {{context_str}}", "pad ".repeat(tokens).trim_end()))
    }

    #[test]
    fn test_budget_is_positive_and_bounded() {
        for (window, output, overhead) in [(100, 10, 5), (64, 1, 1), (1000, 256, 100)] {
            let helper = PromptHelper::new(window, output).unwrap();
            let template = template_with_overhead(overhead);
            for num_chunks in [1usize, 2, 3, 7] {
                let budget = helper.chunk_size_for(&template, num_chunks).unwrap();
                assert!(budget > 0);
                assert!(num_chunks * budget <= window - output);
            }
        }
    }

    #[test]
    fn test_overhead_exceeding_window_fails_fast() {
        let helper = PromptHelper::new(20, 10).unwrap();
        let template = template_with_overhead(15);
        let err = helper.chunk_size_for(&template, 1).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_output_reservation_must_fit_window() {
        assert!(PromptHelper::new(100, 100).is_err());
        assert!(PromptHelper::new(100, 99).is_ok());
    }

    #[test]
    fn test_split_breaks_oversized_text_in_order() {
        let helper = PromptHelper::new(20, 4).unwrap();
        let template = template_with_overhead(4);
        // budget = (20 - 4 - 4) / 1 = 12 tokens
        let words: Vec<String> = (0..30).map(|i| format!("w{i}")).collect();
        let pieces = helper.split(&template, &words.join(" "), 1).unwrap();
        assert!(pieces.len() > 1);
        let rejoined: Vec<&str> =
            pieces.iter().flat_map(|p| p.split_whitespace()).collect();
        let original: Vec<&str> = words.iter().map(|s| s.as_str()).collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_repack_groups_fit_budget() {
        let helper = PromptHelper::new(30, 5).unwrap();
        let template = template_with_overhead(5);
        let budget = helper.chunk_size_for(&template, 1).unwrap();
        let texts: Vec<String> = vec![
            "a b c".to_string(),
            "d e".to_string(),
            "f g h i j k l m n o p q r s t u v w x y z".to_string(),
        ];
        let groups = helper.repack(&template, &texts).unwrap();
        assert!(!groups.is_empty());
        for group in &groups {
            assert!(helper.count_tokens(group) <= budget);
        }
        let rejoined: Vec<&str> =
            groups.iter().flat_map(|g| g.split_whitespace()).collect();
        let original: Vec<&str> =
            texts.iter().flat_map(|t| t.split_whitespace()).collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_default_template_budget() {
        let helper = PromptHelper::new(4096, 256).unwrap();
        let budget = helper.chunk_size_for(&default_text_qa_template(), 1).unwrap();
        assert!(budget > 3000);
    }
}
