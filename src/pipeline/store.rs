//! File writes shared by the stages.
//!
//! Writes go to a temp sibling and are renamed into place, so an interrupted
//! run never leaves a half-written text or markdown file behind for the next
//! stage to trip over.

use crate::error::FileError;
use std::path::Path;

/// Write `contents` to `path` atomically (temp file + rename).
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), FileError> {
    let write_failed = |e: std::io::Error| FileError::WriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

/// Read a text file as UTF-8.
pub async fn read_text(path: &Path) -> Result<String, FileError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileError::ReadFailed {
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");

        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();

        assert_eq!(read_text(&path).await.unwrap(), "second");
        assert!(!dir.path().join("paper.txt.tmp").exists());
    }

    #[tokio::test]
    async fn write_atomic_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("paper.txt");
        let err = write_atomic(&path, "x").await.unwrap_err();
        assert!(matches!(err, FileError::WriteFailed { path: ref p, .. } if p == &path));
    }

    #[tokio::test]
    async fn read_text_missing_file() {
        let err = read_text(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::ReadFailed { .. }));
    }
}
