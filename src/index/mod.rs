
use tracing::{debug, error, info, warn};

use crate::chunking::Chunk;
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Returned by [`VectorIndex::search`] when no document has been indexed
pub const NO_INDEX_SENTINEL: &str =
    "Error: Vector store was not created. Please process a document first.";

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk_index: usize,
    pub text: String,
    pub similarity: f32,
}

/// Exact cosine-similarity index over the chunks of one document. Lives for a
/// single request and borrows the embedder it was created with.
pub struct VectorIndex<'a> {
    embedder: &'a dyn Embedder,
    records: Vec<VectorRecord>,
    dimension: usize,
    ready: bool,
}

impl<'a> VectorIndex<'a> {
    #[inline]
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self {
            embedder,
            records: Vec::new(),
            dimension: 0,
            ready: false,
        }
    }

    /// Embed and store `chunks`, replacing anything indexed before. On error
    /// the index is left empty and not ready.
    #[inline]
    pub fn build(&mut self, chunks: &[Chunk]) -> Result<()> {
        self.clear();

        if chunks.is_empty() {
            warn!("No chunks to index; vector store was not created");
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        info!("Creating embeddings for {} chunks", texts.len());

        let embeddings = self.embedder.embed(&texts).map_err(|e| {
            error!("Embedding chunks failed: {}", e);
            RagError::Index(format!("failed to embed chunks: {e}"))
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::Index(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(RagError::Index("embedder returned empty vectors".into()));
        }
        if let Some(position) = embeddings.iter().position(|e| e.len() != dimension) {
            return Err(RagError::Index(format!(
                "embedding {} has dimension {}, expected {}",
                position,
                embeddings.get(position).map_or(0, Vec::len),
                dimension
            )));
        }

        self.records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord {
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                embedding,
            })
            .collect();
        self.dimension = dimension;
        self.ready = true;

        info!(
            "Vector store created with {} records of dimension {}",
            self.records.len(),
            dimension
        );
        Ok(())
    }

    /// Texts of the `k` chunks most similar to `query`, best first. Without an
    /// index the result is the single [`NO_INDEX_SENTINEL`] entry.
    #[inline]
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(match self.search_scored(query, k)? {
            Some(results) => results.into_iter().map(|r| r.text).collect(),
            None => vec![NO_INDEX_SENTINEL.to_string()],
        })
    }

    /// Ranked hits with their similarity, or `None` when nothing is indexed
    #[inline]
    pub fn search_scored(&self, query: &str, k: usize) -> Result<Option<Vec<SearchResult>>> {
        if !self.ready {
            warn!("Search attempted before a vector store was created");
            return Ok(None);
        }

        let query_embedding = self.embedder.embed_query(query)?;
        if query_embedding.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "query embedding has dimension {}, index has {}",
                query_embedding.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<SearchResult> = self
            .records
            .iter()
            .map(|record| SearchResult {
                chunk_index: record.chunk_index,
                text: record.text.clone(),
                similarity: cosine_similarity(&query_embedding, &record.embedding),
            })
            .collect();

        // Stable: equal scores keep chunk order
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);

        debug!(
            "Found {} relevant chunks for query {:?}",
            scored.len(),
            query
        );
        Ok(Some(scored))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
        self.dimension = 0;
        self.ready = false;
    }

    #[inline]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity of two equal-length vectors; 0 when either is all zeros
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
