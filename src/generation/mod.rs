// Generative capability and the two prompt-driven steps built on it

pub mod rewriter;
pub mod synthesizer;

pub use rewriter::{QueryRewriter, Rewrite};
pub use synthesizer::{AnswerSynthesizer, REFUSAL_TEXT, SYNTHESIS_ERROR_TEXT, Synthesis};

use crate::Result;

/// Single-turn text generation. Failures are [`crate::RagError::Generation`].
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Trim model output and drop one pair of surrounding double quotes
pub(crate) fn clean_model_output(output: &str) -> &str {
    let trimmed = output.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}
