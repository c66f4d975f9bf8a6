//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! The Extractor moves every [`DocumentReader::read`] call onto the blocking
//! thread pool so Tokio worker threads never stall while pdfium parses a
//! large document.
//!
//! Readers are a trait so tests (and callers with their own text layer) can
//! feed page text without a pdfium library on the machine.

use crate::error::{FileError, PaperKbError};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document-level metadata as reported by the PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Raw PDF date string, e.g. `D:20230412093000Z`.
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Text of the leading pages of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    pub metadata: PdfMetadata,
    /// One entry per page read, in page order.
    pub pages: Vec<String>,
    /// Total pages in the document (may exceed `pages.len()`).
    pub page_count: usize,
}

impl DocumentText {
    pub fn first_page(&self) -> &str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }

    /// All pages read, joined with a newline.
    pub fn body(&self) -> String {
        self.pages.join("\n")
    }
}

/// Source of page text for the Extractor.
///
/// Called from a blocking thread; implementations may block freely.
pub trait DocumentReader: Send + Sync {
    /// Read metadata and the text of at most `max_pages` pages.
    fn read(&self, path: &Path, max_pages: usize) -> Result<DocumentText, FileError>;
}

/// [`DocumentReader`] backed by the pdfium library.
///
/// The library is bound once in [`PdfiumReader::new`] and shared by every
/// read. The `sync` feature of pdfium-render makes the handle shareable
/// across the blocking pool, and `thread_safe` serialises calls into pdfium.
#[derive(Debug)]
pub struct PdfiumReader {
    pdfium: Pdfium,
}

impl PdfiumReader {
    /// Bind pdfium and create a reader.
    ///
    /// `library_path` (or `PDFIUM_LIB_PATH` when `None`) points at a specific
    /// libpdfium; otherwise the library next to the binary or on the system
    /// loader path is used. Failing to bind is fatal for the whole run.
    pub fn new(library_path: Option<PathBuf>) -> Result<Self, PaperKbError> {
        let library_path = library_path.or_else(|| {
            std::env::var_os("PDFIUM_LIB_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        });
        let bindings = match &library_path {
            Some(path) => Pdfium::bind_to_library(path.to_string_lossy().to_string()),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| PaperKbError::PdfiumBindingFailed(format!("{:?}", e)))?;
        debug!("pdfium bound ({:?})", library_path);
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl DocumentReader for PdfiumReader {
    fn read(&self, path: &Path, max_pages: usize) -> Result<DocumentText, FileError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| FileError::PdfFailed {
                detail: format!("{:?}", e),
            })?;

        let meta = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            meta.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };
        let metadata = PdfMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        };

        let document_pages = document.pages();
        let page_count = document_pages.len() as usize;
        let mut pages = Vec::with_capacity(page_count.min(max_pages));
        for (idx, page) in document_pages.iter().take(max_pages).enumerate() {
            let text = page.text().map_err(|e| FileError::PdfFailed {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            // pdfium separates lines with CRLF; the section patterns expect LF.
            pages.push(text.all().replace("\r\n", "\n"));
        }

        debug!(
            "Read {} of {} pages from {}",
            pages.len(),
            page_count,
            path.display()
        );

        Ok(DocumentText {
            metadata,
            pages,
            page_count,
        })
    }
}
