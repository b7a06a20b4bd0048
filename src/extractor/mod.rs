pub mod docx;
pub mod pdf;


use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};
use ureq::Agent;
use url::Url;

use crate::config::DownloadConfig;
use crate::{RagError, Result};

const DOCX_CONTENT_TYPE: &str = "openxmlformats-officedocument.wordprocessingml.document";

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detect the format from the transport content type and the reference's
    /// trailing file name. PDF wins when both formats match.
    #[inline]
    pub fn detect(content_type: &str, reference: &str) -> Option<Self> {
        let content_type = content_type.to_lowercase();
        let name = reference_file_name(reference).to_lowercase();

        if content_type.contains("pdf") || name.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if content_type.contains(DOCX_CONTENT_TYPE) || name.ends_with(".docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    /// Detect the format of a local file from its extension
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    #[inline]
    pub fn extract(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Pdf => pdf::extract_text(bytes),
            Self::Docx => docx::extract_text(bytes),
        }
    }
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Docx => f.write_str("docx"),
        }
    }
}

/// Path component of a URL, or the reference itself when it is not a URL
fn reference_file_name(reference: &str) -> String {
    Url::parse(reference).map_or_else(|_| reference.to_string(), |url| url.path().to_string())
}

/// Raw bytes of a downloaded document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Blocking HTTP client for document downloads
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    agent: Agent,
    config: DownloadConfig,
}

impl DocumentFetcher {
    #[inline]
    pub fn new(config: DownloadConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self { agent, config }
    }

    /// Download a document. Any non-success status or transport failure is a
    /// [`RagError::Download`].
    #[inline]
    pub fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let parsed = validate_document_url(url)?;
        debug!("Starting download from URL: {}", parsed);

        let mut response = match self.agent.get(parsed.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                error!("Download of {} failed with HTTP {}", url, status);
                return Err(RagError::Download(format!("HTTP {status} from {url}")));
            }
            Err(e) => {
                error!("Download of {} failed: {}", url, e);
                return Err(RagError::Download(format!("failed to fetch {url}: {e}")));
            }
        };

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.config.max_bytes)
            .read_to_vec()
            .map_err(|e| RagError::Download(format!("failed to read body from {url}: {e}")))?;

        debug!(
            "Downloaded {} bytes from {} (content-type: {:?})",
            bytes.len(),
            url,
            content_type
        );

        Ok(FetchedDocument {
            url: url.to_string(),
            content_type,
            bytes,
        })
    }
}

impl Default for DocumentFetcher {
    #[inline]
    fn default() -> Self {
        Self::new(DownloadConfig::default())
    }
}

/// Validate that a document reference is an absolute HTTP(S) URL
#[inline]
pub fn validate_document_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| RagError::Download(format!("invalid URL {url_str:?}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RagError::Download(format!(
            "URL must use HTTP or HTTPS scheme: {url_str}"
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(RagError::Download(format!(
            "URL must have a valid host: {url_str}"
        )));
    }

    Ok(url)
}

/// Download a document and extract its plain text
#[inline]
pub fn extract_from_url(fetcher: &DocumentFetcher, url: &str) -> Result<String> {
    let document = fetcher.fetch(url)?;

    let format = DocumentFormat::detect(&document.content_type, &document.url).ok_or_else(|| {
        error!(
            "Could not determine document type of {} (content-type {:?})",
            url, document.content_type
        );
        RagError::UnsupportedFormat(format!(
            "could not determine document type from URL or content-type {:?}",
            document.content_type
        ))
    })?;
    info!("Download complete. Detected file type: {}", format);

    let text = format.extract(&document.bytes)?;
    info!(
        "Extracted {} characters of text from {}",
        text.chars().count(),
        url
    );
    Ok(text)
}

/// Extract plain text from a local PDF or DOCX file
#[inline]
pub fn extract_from_path(path: &Path) -> Result<String> {
    debug!("Processing local file: {}", path.display());

    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        RagError::UnsupportedFormat(format!("unsupported file type: {}", path.display()))
    })?;

    let bytes = std::fs::read(path)?;
    let text = format.extract(&bytes)?;
    info!(
        "Extracted {} characters of text from local {} file",
        text.chars().count(),
        format
    );
    Ok(text)
}
