use tracing::{debug, warn};

use super::{Generator, clean_model_output};

/// Outcome of rewriting a question into a retrieval query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The model produced a different, search-oriented query
    Rewritten(String),
    /// The model returned the question as-is
    Unchanged(String),
    /// The model failed or produced nothing usable; the original question is used
    Fallback { query: String, reason: String },
}

impl Rewrite {
    #[inline]
    pub fn query(&self) -> &str {
        match self {
            Self::Rewritten(query) | Self::Unchanged(query) | Self::Fallback { query, .. } => query,
        }
    }

    #[inline]
    pub fn into_query(self) -> String {
        match self {
            Self::Rewritten(query) | Self::Unchanged(query) | Self::Fallback { query, .. } => query,
        }
    }
}

pub struct QueryRewriter<'a> {
    generator: &'a dyn Generator,
}

impl<'a> QueryRewriter<'a> {
    #[inline]
    pub fn new(generator: &'a dyn Generator) -> Self {
        Self { generator }
    }

    /// Turn a question into a query suited to semantic search. Never fails:
    /// on any problem the question itself is returned as a [`Rewrite::Fallback`].
    #[inline]
    pub fn rewrite(&self, question: &str) -> Rewrite {
        let prompt = rewrite_prompt(question);

        let output = match self.generator.generate(&prompt) {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not rewrite query due to error: {}. Using original question", e);
                return Rewrite::Fallback {
                    query: question.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let query = clean_model_output(&output);
        if query.is_empty() {
            warn!("Query rewrite returned no text. Using original question");
            return Rewrite::Fallback {
                query: question.to_string(),
                reason: "empty rewrite".to_string(),
            };
        }

        debug!("Original query: {:?} | Rewritten query: {:?}", question, query);
        if query == question.trim() {
            Rewrite::Unchanged(query.to_string())
        } else {
            Rewrite::Rewritten(query.to_string())
        }
    }
}

fn rewrite_prompt(question: &str) -> String {
    format!(
        "You are an expert at rewriting user questions into optimal queries for a semantic vector database search.

Analyze the following user question. Follow these rules:
1. If the question is already specific, contains key terms, and is well-suited for a vector search (like asking for a specific definition, number, or clause), return the original question without any changes.
2. If the question is conversational, vague, or a yes/no question, rewrite it as a concise, keyword-focused statement that describes the core information needed.
3. Do not answer the question. Only return the original or the rewritten search query.

User question: \"{question}\"

Optimal search query:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenerator;

    #[test]
    fn rewritten_query_is_cleaned() {
        let generator = MockGenerator::replying("  \"grace period premium payment\"\n");
        let rewrite = QueryRewriter::new(&generator).rewrite("Is there a grace period?");

        assert_eq!(
            rewrite,
            Rewrite::Rewritten("grace period premium payment".to_string())
        );
        assert_eq!(rewrite.into_query(), "grace period premium payment");
    }

    #[test]
    fn specific_question_unchanged() {
        let question = "What is the waiting period for cataract surgery?";
        let generator = MockGenerator::replying(question);

        let rewrite = QueryRewriter::new(&generator).rewrite(question);
        assert_eq!(rewrite, Rewrite::Unchanged(question.to_string()));
    }

    #[test]
    fn generator_failure_falls_back() {
        let generator = MockGenerator::failing("model offline");
        let rewrite = QueryRewriter::new(&generator).rewrite("Does it cover AYUSH?");

        match &rewrite {
            Rewrite::Fallback { query, reason } => {
                assert_eq!(query, "Does it cover AYUSH?");
                assert!(reason.contains("model offline"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(rewrite.query(), "Does it cover AYUSH?");
    }

    #[test]
    fn empty_output_falls_back() {
        for reply in ["", "   \n", "\"\""] {
            let generator = MockGenerator::replying(reply);
            let rewrite = QueryRewriter::new(&generator).rewrite("Room rent limits?");
            assert!(
                matches!(rewrite, Rewrite::Fallback { ref query, .. } if query == "Room rent limits?"),
                "reply {reply:?} should fall back"
            );
        }
    }

    #[test]
    fn prompt_contains_question() {
        let generator = MockGenerator::replying("x");
        QueryRewriter::new(&generator).rewrite("Is maternity covered?");

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User question: \"Is maternity covered?\""));
        assert!(prompts[0].contains("Do not answer the question"));
    }
}
