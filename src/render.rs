//! Renderer: analyzed text files in, knowledge-base markdown notes out.
//!
//! Rendering is deterministic and offline; the same text file always
//! produces the same bytes.

use crate::config::RenderConfig;
use crate::error::{FileError, PaperKbError};
use crate::output::{FileOutcome, FileStatus, SkipReason, Stage, StageReport};
use crate::pipeline::markdown::render_markdown;
use crate::pipeline::{input, store};
use crate::progress::{display_name, StageTracker};
use crate::record::PaperRecord;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Render every text file under `input` into `markdown_dir/<stem>.md`.
///
/// # Errors
/// Returns `Err(PaperKbError)` for input path problems or when the markdown
/// directory cannot be created.
pub async fn render(
    input: impl AsRef<Path>,
    markdown_dir: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<StageReport, PaperKbError> {
    let input = input.as_ref();
    let markdown_dir = markdown_dir.as_ref();
    info!(
        "Rendering {} into {}",
        input.display(),
        markdown_dir.display()
    );

    let inputs = input::resolve_inputs(input, "txt", "text")?;
    let mut tracker = StageTracker::start(
        Stage::Render,
        inputs.files.len(),
        config.progress_callback.as_ref(),
    );
    if inputs.files.is_empty() {
        warn!("No text files found in {}", input.display());
        return Ok(tracker.finish());
    }
    input::ensure_output_dir(markdown_dir).await?;

    for (index, path) in inputs.files.iter().enumerate() {
        tracker.file_start(index, path);
        let outcome = render_file(path, markdown_dir, config).await;
        tracker.file_done(index, outcome);
    }

    Ok(tracker.finish())
}

async fn render_file(path: &Path, markdown_dir: &Path, config: &RenderConfig) -> FileOutcome {
    let start = Instant::now();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = markdown_dir.join(format!("{stem}.md"));
    let mut notes = Vec::new();

    let status = match render_to(path, &output, config, &mut notes).await {
        Ok(status) => status,
        Err(e) => FileStatus::Failed(e),
    };

    FileOutcome {
        source: path.to_path_buf(),
        output: Some(output),
        status,
        notes,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn render_to(
    path: &Path,
    output: &Path,
    config: &RenderConfig,
    notes: &mut Vec<String>,
) -> Result<FileStatus, FileError> {
    if !config.overwrite && output.exists() {
        return Ok(FileStatus::Skipped(SkipReason::OutputExists));
    }

    let record = PaperRecord::parse(&store::read_text(path).await?);
    if record.analysis.is_none() {
        if config.require_analysis {
            return Ok(FileStatus::Skipped(SkipReason::NoAnalysis));
        }
        warn!(
            "{} has no analysis; summary, keywords and objectives will be empty",
            display_name(path)
        );
        notes.push("rendered without analysis".to_string());
    }

    let markdown = render_markdown(&record)?;
    store::write_atomic(output, &markdown).await?;
    Ok(FileStatus::Written)
}
