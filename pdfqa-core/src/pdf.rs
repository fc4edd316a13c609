//! PDF text extraction.
//!
//! Extraction is hidden behind [`TextExtractor`] so the pipeline can be driven
//! by any source of raw text; [`PdfExtractor`] is the production implementation.

use thiserror::Error;
use tracing::{debug, warn};

/// Errors produced while turning a payload into raw text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Empty payload")]
    Empty,

    #[error("Payload is not a PDF document")]
    NotPdf,

    #[error("Unreadable PDF: {0}")]
    Unreadable(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Source of raw document text.
pub trait TextExtractor: Send + Sync {
    /// Extracts the raw, un-normalized text of the document in `bytes`.
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Extracts text from PDF bytes using `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        check_pdf_header(bytes)?;

        // pdf-extract panics on some malformed documents
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

        match result {
            Ok(Ok(text)) => {
                debug!(bytes = bytes.len(), chars = text.chars().count(), "Extracted PDF text");
                Ok(text)
            }
            Ok(Err(e)) => Err(ExtractError::Unreadable(e.to_string())),
            Err(panic_payload) => {
                let message = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                warn!(%message, "PDF extraction panicked");
                Err(ExtractError::Unreadable(message))
            }
        }
    }
}

/// Cheap structural check before handing bytes to the PDF parser.
///
/// The header may be preceded by junk bytes; readers accept it anywhere in the
/// first kilobyte.
fn check_pdf_header(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    let window = &bytes[..bytes.len().min(1024)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(ExtractError::NotPdf)
    }
}
