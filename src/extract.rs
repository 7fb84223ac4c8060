//! Text extraction from the primary PDF of an edition.
//!
//! Pages are read in order and joined with a newline. The text then goes
//! through [`clean_text`]:
//!
//! 1. everything from the first end-of-publication sentinel onward is cut;
//! 2. everything up to and including the line holding the header-end marker
//!    is cut;
//! 3. the result is trimmed.
//!
//! [`extract`] never fails: an empty result or any fault while reading the
//! document is replaced with a fixed placeholder, so the notification always
//! has something to show.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::SourceSettings;
use crate::models::{ExtractedText, ExtractionStatus};

/// Shown when the document was read but held no text (e.g. scanned pages).
pub const EMPTY_PLACEHOLDER: &str = "Não foi possível extrair o conteúdo do Diário.";

/// Shown when the document could not be read at all.
pub const FAILURE_PLACEHOLDER: &str = "Ocorreu um erro grave ao tentar ler o arquivo PDF.";

/// Markers used to strip boilerplate around the publication text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cleanup {
    pub end_sentinel: Option<String>,
    pub header_end_marker: Option<String>,
}

impl From<&SourceSettings> for Cleanup {
    fn from(settings: &SourceSettings) -> Self {
        Self {
            end_sentinel: settings.end_sentinel.clone(),
            header_end_marker: settings.header_end_marker.clone(),
        }
    }
}

#[derive(Debug, Error)]
enum ExtractionFault {
    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    #[error("PDF engine panicked")]
    Panic,
}

/// Extract cleaned text from the PDF at `path`. Always returns non-empty
/// text.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn extract(path: &Path, cleanup: &Cleanup) -> ExtractedText {
    match read_pages(path) {
        Ok(pages) => {
            let cleaned = clean_text(&pages.join("\n"), cleanup);
            if cleaned.is_empty() {
                warn!(pages = pages.len(), "Document has no extractable text");
                ExtractedText {
                    text: EMPTY_PLACEHOLDER.to_string(),
                    status: ExtractionStatus::Empty,
                }
            } else {
                info!(pages = pages.len(), chars = cleaned.chars().count(), "Extracted text");
                ExtractedText {
                    text: cleaned,
                    status: ExtractionStatus::Extracted,
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Text extraction failed");
            ExtractedText {
                text: FAILURE_PLACEHOLDER.to_string(),
                status: ExtractionStatus::Failed,
            }
        }
    }
}

/// Text of each page, in page order.
///
/// The PDF engine lays glyphs out by position, so columns and line breaks
/// follow the printed page rather than the content stream. It can panic on
/// malformed fonts, hence the unwind guard.
fn read_pages(path: &Path) -> Result<Vec<String>, ExtractionFault> {
    let bytes = std::fs::read(path)?;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    }))
    .map_err(|_| ExtractionFault::Panic)?;
    result.map_err(|e| ExtractionFault::Pdf(format!("{e:?}")))
}

/// Strip trailing boilerplate and the masthead from extracted text.
pub fn clean_text(raw: &str, cleanup: &Cleanup) -> String {
    let mut text = raw;

    if let Some(sentinel) = cleanup.end_sentinel.as_deref().filter(|s| !s.is_empty()) {
        if let Some(pos) = text.find(sentinel) {
            text = &text[..pos];
        }
    }

    if let Some(marker) = cleanup.header_end_marker.as_deref().filter(|s| !s.is_empty()) {
        if let Some(pos) = text.find(marker) {
            let after_marker = &text[pos + marker.len()..];
            text = match after_marker.find('\n') {
                Some(newline) => &after_marker[newline + 1..],
                None => "",
            };
        }
    }

    text.trim().to_string()
}
