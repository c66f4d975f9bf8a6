//! Input resolution: turn a user-supplied path into the list of files a stage
//! will process.
//!
//! A path is either one file (single-file mode: problems with it are fatal)
//! or a directory (batch mode: matching files directly inside it, sorted,
//! each failing on its own). PDFs are checked for the `%PDF` magic bytes
//! before pdfium sees them so a renamed `.docx` produces a clear error
//! rather than a pdfium crash.

use crate::error::{FileError, PaperKbError};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files to process and how they were named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub files: Vec<PathBuf>,
    /// The input path named a single file rather than a directory.
    pub single_file: bool,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn io_to_input_error(path: &Path, e: std::io::Error) -> PaperKbError {
    match e.kind() {
        ErrorKind::PermissionDenied => PaperKbError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => PaperKbError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => PaperKbError::Internal(format!("cannot read '{}': {}", path.display(), e)),
    }
}

/// Resolve `path` to the files with `extension` (case-insensitive).
///
/// `label` names the file type in errors, e.g. `"PDF"`.
pub fn resolve_inputs(
    path: &Path,
    extension: &str,
    label: &'static str,
) -> Result<ResolvedInputs, PaperKbError> {
    if !path.exists() {
        return Err(PaperKbError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_file() {
        if !has_extension(path, extension) {
            return Err(PaperKbError::WrongFileType {
                path: path.to_path_buf(),
                expected: label,
            });
        }
        std::fs::File::open(path).map_err(|e| io_to_input_error(path, e))?;
        return Ok(ResolvedInputs {
            files: vec![path.to_path_buf()],
            single_file: true,
        });
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| io_to_input_error(path, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, extension))
        .collect();
    files.sort();

    debug!(
        "Found {} {} file(s) in {}",
        files.len(),
        label,
        path.display()
    );
    Ok(ResolvedInputs {
        files,
        single_file: false,
    })
}

/// Check the `%PDF` magic bytes of one file.
pub fn check_pdf_magic(path: &Path) -> Result<(), FileError> {
    let mut f = std::fs::File::open(path).map_err(|e| FileError::ReadFailed {
        detail: e.to_string(),
    })?;
    let mut magic = [0u8; 4];
    match f.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(FileError::NotAPdf { magic }),
        // Shorter than four bytes: whatever is there, it is not a PDF.
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(FileError::NotAPdf { magic }),
        Err(e) => Err(FileError::ReadFailed {
            detail: e.to_string(),
        }),
    }
}

/// [`check_pdf_magic`] for single-file mode, where a bad file is fatal.
pub fn check_single_pdf(path: &Path) -> Result<(), PaperKbError> {
    check_pdf_magic(path).map_err(|e| match e {
        FileError::NotAPdf { magic } => PaperKbError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        },
        other => PaperKbError::Internal(format!("cannot read '{}': {}", path.display(), other)),
    })
}

/// Create the output directory (and parents) if needed.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), PaperKbError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PaperKbError::OutputDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_directory_sorted_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.Pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.7").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let inputs = resolve_inputs(dir.path(), "pdf", "PDF").unwrap();
        assert!(!inputs.single_file);
        let names: Vec<_> = inputs
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf", "c.Pdf"]);
    }

    #[test]
    fn test_resolve_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        let inputs = resolve_inputs(&pdf, "pdf", "PDF").unwrap();
        assert!(inputs.single_file);
        assert_eq!(inputs.files, vec![pdf]);
    }

    #[test]
    fn test_resolve_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            resolve_inputs(&missing, "pdf", "PDF"),
            Err(PaperKbError::InputNotFound { .. })
        ));

        let docx = dir.path().join("notes.docx");
        std::fs::write(&docx, b"PK").unwrap();
        assert!(matches!(
            resolve_inputs(&docx, "pdf", "PDF"),
            Err(PaperKbError::WrongFileType { expected: "PDF", .. })
        ));
    }

    #[test]
    fn test_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        let bad = dir.path().join("bad.pdf");
        let tiny = dir.path().join("tiny.pdf");
        std::fs::write(&good, b"%PDF-1.4\n").unwrap();
        std::fs::write(&bad, b"PK\x03\x04").unwrap();
        std::fs::write(&tiny, b"%P").unwrap();

        assert!(check_pdf_magic(&good).is_ok());
        assert!(matches!(
            check_pdf_magic(&bad),
            Err(FileError::NotAPdf { magic }) if &magic == b"PK\x03\x04"
        ));
        assert!(matches!(check_pdf_magic(&tiny), Err(FileError::NotAPdf { .. })));
        assert!(matches!(
            check_single_pdf(&bad),
            Err(PaperKbError::NotAPdf { .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_output_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a/b/c");
        ensure_output_dir(&out).await.unwrap();
        assert!(out.is_dir());
    }
}
