use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::{RagError, Result};

/// Extract the text of every page in page order, concatenated without a separator
#[inline]
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics instead of erroring on some malformed streams
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| {
        error!("PDF parser panicked on a {} byte document", bytes.len());
        RagError::Extraction("PDF parser failed on malformed document".to_string())
    })?
    .map_err(|e| {
        error!("PDF extraction failed: {}", e);
        RagError::Extraction(format!("PDF extraction error: {e}"))
    })?;

    debug!("Extracted text from {} PDF pages", pages.len());
    Ok(pages.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let result = extract_text(b"definitely not a pdf document");
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(extract_text(&[]), Err(RagError::Extraction(_))));
    }
}
