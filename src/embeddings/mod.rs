// Embedding capability: text in, fixed-dimension vectors out

use crate::Result;

/// Turns text into embedding vectors.
///
/// Implementations return exactly one vector per input, in input order, and
/// report failures as [`crate::RagError::Embedding`]. Nothing is retried.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single retrieval query
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| crate::RagError::Embedding("no embedding returned for query".into()))
    }
}
