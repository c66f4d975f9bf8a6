//! Error types for the paper2kb library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PaperKbError`]: **fatal**, the stage cannot run at all (input path
//!   missing, credentials half-configured, pdfium not loadable, no LLM
//!   provider). Returned as `Err(PaperKbError)` from the stage entry points
//!   and turned into a non-zero exit status by the CLI.
//!
//! * [`FileError`]: **non-fatal**, a single paper failed (corrupt PDF, API
//!   error, unwritable output) but the batch goes on. Stored inside
//!   [`crate::output::FileOutcome`] so callers can see which files need a
//!   second run.
//!
//! Heuristic misses (no introduction found, no abstract in the reference
//! manager) are neither: they are logged as warnings and the affected field
//! is left empty.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2kb library.
#[derive(Debug, Error)]
pub enum PaperKbError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file or directory was not found.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the input.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A single-file invocation pointed at a file with the wrong extension.
    #[error("'{path}' is not a {expected} file")]
    WrongFileType { path: PathBuf, expected: &'static str },

    /// A single-file invocation pointed at something that is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Credentials / providers ───────────────────────────────────────────
    /// A credential required by the invoked stage is absent.
    #[error("Missing credential {variable}.\n{hint}")]
    MissingCredential { variable: String, hint: String },

    /// The configured LLM provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single paper.
///
/// The stage records it in the report and moves on to the next file.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The input file could not be read.
    #[error("read failed: {detail}")]
    ReadFailed { detail: String },

    /// The file in a batch does not start with `%PDF`.
    #[error("not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// pdfium could not open or read the document.
    #[error("PDF could not be read: {detail}")]
    PdfFailed { detail: String },

    /// The LLM call returned an error.
    #[error("LLM call failed: {detail}")]
    LlmFailed { detail: String },

    /// The LLM call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The LLM answered with nothing usable.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// The markdown note could not be produced.
    #[error("render failed: {detail}")]
    RenderFailed { detail: String },

    /// The output file could not be written.
    #[error("write failed for '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_display() {
        let e = PaperKbError::MissingCredential {
            variable: "ZOTERO_API_KEY".into(),
            hint: "ZOTERO_LIBRARY_ID is set but the key is not.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ZOTERO_API_KEY"), "got: {msg}");
        assert!(msg.contains("ZOTERO_LIBRARY_ID"));
    }

    #[test]
    fn wrong_file_type_display() {
        let e = PaperKbError::WrongFileType {
            path: PathBuf::from("notes.docx"),
            expected: "PDF",
        };
        assert_eq!(e.to_string(), "'notes.docx' is not a PDF file");
    }

    #[test]
    fn timeout_display() {
        let e = FileError::Timeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn file_error_serialises() {
        let e = FileError::LlmFailed {
            detail: "HTTP 529 overloaded".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("LlmFailed"));
        assert!(json.contains("overloaded"));
    }
}
