
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::extractor::{self, DocumentFetcher};
use crate::generation::{AnswerSynthesizer, Generator, QueryRewriter, SYNTHESIS_ERROR_TEXT};
use crate::index::{DEFAULT_TOP_K, VectorIndex};
use crate::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    /// Questions answered concurrently; 1 answers them one by one
    pub max_parallel_questions: usize,
}

impl Default for PipelineConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            max_parallel_questions: 1,
        }
    }
}

impl From<&Config> for PipelineConfig {
    #[inline]
    fn from(config: &Config) -> Self {
        Self {
            chunking: config.chunking.clone(),
            top_k: config.retrieval.top_k,
            max_parallel_questions: config.retrieval.max_parallel_questions,
        }
    }
}

/// Where a request currently is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Ingesting,
    Chunking,
    Indexing,
    Ready,
    AnsweringQuestion(usize),
    Done,
}

impl fmt::Display for PipelineStage {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Ingesting => f.write_str("ingesting"),
            Self::Chunking => f.write_str("chunking"),
            Self::Indexing => f.write_str("indexing"),
            Self::Ready => f.write_str("ready"),
            Self::AnsweringQuestion(i) => write!(f, "answering question {i}"),
            Self::Done => f.write_str("done"),
        }
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug!("Pipeline stage: {} -> {}", stage, next);
    *stage = next;
}

/// Document question answering: ingest one document, then answer a batch of
/// questions against it. Every call builds and drops its own index.
pub struct Pipeline {
    config: PipelineConfig,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    fetcher: DocumentFetcher,
    pool: Option<rayon::ThreadPool>,
}

impl Pipeline {
    #[inline]
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        fetcher: DocumentFetcher,
    ) -> Result<Self> {
        let pool = if config.max_parallel_questions > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_parallel_questions)
                .thread_name(|i| format!("doc-rag-question-{i}"))
                .build()
                .map_err(|e| RagError::Config(format!("failed to build question pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            splitter: TextSplitter::new(config.chunking.clone()),
            config,
            embedder,
            generator,
            fetcher,
            pool,
        })
    }

    #[inline]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch the document at `document_url` and answer `questions` in order.
    /// Ingestion errors abort the whole request.
    #[inline]
    pub fn answer(&self, document_url: &str, questions: &[String]) -> Result<Vec<String>> {
        let mut stage = PipelineStage::Idle;
        info!(
            "Processing document {} with {} questions",
            document_url,
            questions.len()
        );

        advance(&mut stage, PipelineStage::Ingesting);
        let text = extractor::extract_from_url(&self.fetcher, document_url)?;
        self.answer_from_stage(&mut stage, &text, questions)
    }

    #[inline]
    pub fn answer_from_path(&self, path: &Path, questions: &[String]) -> Result<Vec<String>> {
        let mut stage = PipelineStage::Idle;
        info!(
            "Processing local document {} with {} questions",
            path.display(),
            questions.len()
        );

        advance(&mut stage, PipelineStage::Ingesting);
        let text = extractor::extract_from_path(path)?;
        self.answer_from_stage(&mut stage, &text, questions)
    }

    /// Answer `questions` against already-extracted text
    #[inline]
    pub fn answer_text(&self, text: &str, questions: &[String]) -> Result<Vec<String>> {
        let mut stage = PipelineStage::Ingesting;
        self.answer_from_stage(&mut stage, text, questions)
    }

    fn answer_from_stage(
        &self,
        stage: &mut PipelineStage,
        text: &str,
        questions: &[String],
    ) -> Result<Vec<String>> {
        advance(stage, PipelineStage::Chunking);
        let chunks = self.splitter.split(text);
        info!("Split document into {} chunks", chunks.len());

        advance(stage, PipelineStage::Indexing);
        let mut index = VectorIndex::new(self.embedder.as_ref());
        index.build(&chunks)?;

        advance(stage, PipelineStage::Ready);
        let answers: Vec<String> = match &self.pool {
            Some(pool) if questions.len() > 1 => pool.install(|| {
                questions
                    .par_iter()
                    .enumerate()
                    .map(|(i, question)| self.answer_one(&index, i, question))
                    .collect()
            }),
            _ => questions
                .iter()
                .enumerate()
                .map(|(i, question)| self.answer_one(&index, i, question))
                .collect(),
        };

        advance(stage, PipelineStage::Done);
        Ok(answers)
    }

    fn answer_one(&self, index: &VectorIndex<'_>, position: usize, question: &str) -> String {
        debug!("Pipeline stage: {}", PipelineStage::AnsweringQuestion(position));
        info!("Starting processing for question {}: {:?}", position, question);

        let generator = self.generator.as_ref();
        let query = QueryRewriter::new(generator).rewrite(question).into_query();

        let passages = match index.search(&query, self.config.top_k) {
            Ok(passages) => passages,
            Err(e) => {
                error!("Retrieval failed for question {}: {}", position, e);
                return SYNTHESIS_ERROR_TEXT.to_string();
            }
        };

        AnswerSynthesizer::new(generator)
            .synthesize(question, &passages)
            .into_text()
    }
}
