use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether this error belongs to the one-time ingestion phase of a request
    /// (fetch, extraction, indexing), which leaves no index to answer from.
    #[inline]
    pub const fn is_ingestion_failure(&self) -> bool {
        matches!(
            self,
            Self::Download(_)
                | Self::UnsupportedFormat(_)
                | Self::Extraction(_)
                | Self::Index(_)
                | Self::Io(_)
        )
    }
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod generation;
pub mod index;
pub mod ollama;
pub mod pipeline;
pub mod server;

#[cfg(test)]
mod mock;
