use tracing::{debug, error, info};

use super::{Generator, clean_model_output};

/// Reply used when the passages do not contain the answer
pub const REFUSAL_TEXT: &str =
    "Based on the provided context, the answer to this question is not available.";

/// Answer text substituted when the language model could not be reached
pub const SYNTHESIS_ERROR_TEXT: &str =
    "Error: Could not generate a response from the language model.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Answered(String),
    /// The model found no answer in the passages
    NotAvailable,
    /// The model could not produce a reply at all
    Failed { reason: String },
}

impl Synthesis {
    /// The text shown to the caller for this outcome
    #[inline]
    pub fn into_text(self) -> String {
        match self {
            Self::Answered(answer) => answer,
            Self::NotAvailable => REFUSAL_TEXT.to_string(),
            Self::Failed { .. } => SYNTHESIS_ERROR_TEXT.to_string(),
        }
    }
}

pub struct AnswerSynthesizer<'a> {
    generator: &'a dyn Generator,
}

impl<'a> AnswerSynthesizer<'a> {
    #[inline]
    pub fn new(generator: &'a dyn Generator) -> Self {
        Self { generator }
    }

    /// Answer `question` using only `passages`
    #[inline]
    pub fn synthesize(&self, question: &str, passages: &[String]) -> Synthesis {
        let prompt = answer_prompt(question, passages);
        debug!(
            "Sending answer prompt with {} passages ({} chars)",
            passages.len(),
            prompt.len()
        );

        match self.generator.generate(&prompt) {
            Ok(output) => {
                let answer = output.trim();
                if is_refusal(answer) {
                    info!("Answer not available in context for question {:?}", question);
                    Synthesis::NotAvailable
                } else {
                    Synthesis::Answered(answer.to_string())
                }
            }
            Err(e) => {
                error!("Language model failed to answer {:?}: {}", question, e);
                Synthesis::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn is_refusal(answer: &str) -> bool {
    let cleaned = clean_model_output(answer).trim_matches('\'').trim();
    cleaned.trim_end_matches('.') == REFUSAL_TEXT.trim_end_matches('.')
}

fn answer_prompt(question: &str, passages: &[String]) -> String {
    let context = passages.join("\n\n");
    format!(
        "You are a highly intelligent policy document analysis assistant. Your task is to answer the user's question based ONLY on the provided context clauses from the document.

Follow these rules strictly:
1. Synthesize the information from all provided context clauses into a single, coherent answer.
2. Do not repeat information. If multiple clauses mention the same point, present it only once.
3. Do not use any external knowledge.
4. Your answer must be concise and directly address the user's question.
5. If the answer is not present in any of the provided context clauses, you MUST state: '{REFUSAL_TEXT}'

CONTEXT CLAUSES:
---
{context}
---

QUESTION:
{question}

ANSWER:"
    )
}
