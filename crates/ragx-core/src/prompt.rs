//! Prompt templates and structured-output parsing

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A prompt template with `{placeholder}` slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Substitute the given placeholders. Placeholders not named in `vars`
    /// are left intact so a template can be filled in stages.
    pub fn format(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.template.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }

    /// Partially fill the template, returning a new template
    pub fn partial_format(&self, vars: &[(&str, &str)]) -> PromptTemplate {
        PromptTemplate { template: self.format(vars) }
    }

    /// The template with every remaining placeholder blanked out,
    /// used to measure template overhead for token budgeting
    pub fn format_empty(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            match rest[start..].find('}') {
                Some(end) => rest = &rest[start + end + 1..],
                None => {
                    rest = &rest[start..];
                    break;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Question-answering prompt: answer from the given context only
pub fn default_text_qa_template() -> PromptTemplate {
    PromptTemplate::new(
        "Context information is below.\n\
         ---------------------\n\
         {context_str}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, \
         answer the question: {query_str}\n",
    )
}

/// Refinement prompt: update an existing answer with one more fragment
pub fn default_refine_template() -> PromptTemplate {
    PromptTemplate::new(
        "The original question is as follows: {query_str}\n\
         We have provided an existing answer: {existing_answer}\n\
         We have the opportunity to refine the existing answer \
         (only if needed) with some more context below.\n\
         ------------\n\
         {context_msg}\n\
         ------------\n\
         Given the new context, refine the original answer to better \
         answer the question. \
         If the context isn't useful, return the original answer.\n",
    )
}

/// Summarization prompt used when building tree levels
pub fn default_summary_template() -> PromptTemplate {
    PromptTemplate::new(
        "Write a summary of the following. Try to use only the \
         information provided. Try to include as many key details as possible.\n\
         \n\
         {context_str}\n\
         \n\
         SUMMARY:\n",
    )
}

/// Keyword extraction prompt for indexed text chunks
pub fn default_keyword_extract_template() -> PromptTemplate {
    PromptTemplate::new(
        "Some text is provided below. Given the text, extract up to \
         {max_keywords} keywords from the text. Avoid stopwords.\n\
         ---------------------\n\
         {text}\n\
         ---------------------\n\
         Provide keywords in the following comma-separated format: \
         'KEYWORDS: <keywords>'\n",
    )
}

/// Keyword extraction prompt for query strings
pub fn default_query_keyword_extract_template() -> PromptTemplate {
    PromptTemplate::new(
        "A question is provided below. Given the question, extract up to \
         {max_keywords} keywords from the text. Focus on extracting the \
         keywords that we can use to best look up answers to the question. \
         Avoid stopwords.\n\
         ---------------------\n\
         {text}\n\
         ---------------------\n\
         Provide keywords in the following comma-separated format: \
         'KEYWORDS: <keywords>'\n",
    )
}

/// Child selection prompt used for tree descent
pub fn default_tree_select_template() -> PromptTemplate {
    PromptTemplate::new(
        "Some choices are given below. It is provided in a numbered list \
         (1 to {num_chunks}), where each item in the list corresponds to a summary.\n\
         ---------------------\n\
         {context_list}\n\
         ---------------------\n\
         Using only the choices above and not prior knowledge, return the choice \
         that is most relevant to the question: '{query_str}'\n\
         Provide choice in the following format: 'ANSWER: <number>' and explain \
         why this summary was selected in relation to the question.\n",
    )
}

/// Parse an `ANSWER: <number>` selection out of a model response.
///
/// A response that does not contain a parseable selection is a terminal
/// error for the step; the raw text is attached for diagnosis.
pub fn parse_numbered_answer(raw: &str) -> Result<usize> {
    let after = raw
        .split("ANSWER:")
        .nth(1)
        .ok_or_else(|| Error::MalformedOutput {
            message: "no 'ANSWER:' marker in selection response".to_string(),
            raw: raw.to_string(),
        })?;

    let digits: String = after
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<usize>().map_err(|_| Error::MalformedOutput {
        message: "no number following 'ANSWER:'".to_string(),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_substitutes_placeholders() {
        let template = PromptTemplate::new("q: {query_str}, c: {context_str}");
        let out = template.format(&[("query_str", "why"), ("context_str", "because")]);
        assert_eq!(out, "q: why, c: because");
    }

    #[test]
    fn test_partial_format_leaves_remaining_slots() {
        let template = default_text_qa_template().partial_format(&[("query_str", "why")]);
        assert!(template.template.contains("{context_str}"));
        assert!(!template.template.contains("{query_str}"));
    }

    #[test]
    fn test_format_empty_strips_placeholders() {
        let template = PromptTemplate::new("a {x} b {y} c");
        assert_eq!(template.format_empty(), "a  b  c");
    }

    #[test]
    fn test_parse_numbered_answer() {
        assert_eq!(parse_numbered_answer("ANSWER: 2, because it fits").unwrap(), 2);
        assert_eq!(parse_numbered_answer("I think\nANSWER: 10").unwrap(), 10);
    }

    #[test]
    fn test_parse_numbered_answer_malformed() {
        let err = parse_numbered_answer("the second one").unwrap_err();
        match err {
            crate::Error::MalformedOutput { raw, .. } => assert_eq!(raw, "the second one"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_templates_carry_expected_slots() {
        for (template, slots) in [
            (default_text_qa_template(), vec!["{context_str}", "{query_str}"]),
            (
                default_refine_template(),
                vec!["{query_str}", "{existing_answer}", "{context_msg}"],
            ),
            (default_summary_template(), vec!["{context_str}"]),
            (default_keyword_extract_template(), vec!["{max_keywords}", "{text}"]),
            (
                default_tree_select_template(),
                vec!["{num_chunks}", "{context_list}", "{query_str}"],
            ),
        ] {
            for slot in slots {
                assert!(template.template.contains(slot), "missing {slot}");
            }
        }
    }
}
