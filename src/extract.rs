//! Extractor: PDFs in, one structured text file per paper out.
//!
//! For each PDF the Extractor reads the leading pages, infers title, authors
//! and year, cuts out the introduction, and asks the reference manager for
//! the abstract (falling back to the abstract printed in the PDF). Files are
//! processed one at a time; a failure on one PDF is recorded in the report
//! and the batch moves on.

use crate::config::ExtractConfig;
use crate::error::{FileError, PaperKbError};
use crate::output::{FileOutcome, FileStatus, SkipReason, Stage, StageReport};
use crate::pipeline::cleanup::clean_extracted_text;
use crate::pipeline::naming::{self, PaperName};
use crate::pipeline::pdf::{DocumentReader, DocumentText, PdfiumReader};
use crate::pipeline::zotero::{ReferenceLookup, ZoteroClient};
use crate::pipeline::{input, metadata, store};
use crate::progress::{display_name, StageTracker};
use crate::record::PaperRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Extract every PDF under `input` into text files in `output_dir`.
///
/// `input` is a single PDF or a directory whose `*.pdf` files (not
/// recursive) are processed in name order.
///
/// # Errors
/// Returns `Err(PaperKbError)` only for fatal errors:
/// - Input path missing, unreadable, or not a PDF (single-file mode)
/// - pdfium cannot be loaded
/// - Output directory cannot be created
/// - Zotero credentials only half configured
///
/// Per-file problems are recorded in the returned [`StageReport`].
pub async fn extract(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<StageReport, PaperKbError> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();
    info!(
        "Extracting {} into {}",
        input.display(),
        output_dir.display()
    );

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let inputs = input::resolve_inputs(input, "pdf", "PDF")?;
    if inputs.single_file {
        input::check_single_pdf(&inputs.files[0])?;
    }

    let mut tracker = StageTracker::start(
        Stage::Extract,
        inputs.files.len(),
        config.progress_callback.as_ref(),
    );
    if inputs.files.is_empty() {
        warn!("No PDF files found in {}", input.display());
        return Ok(tracker.finish());
    }

    // ── Step 2: Collaborators ────────────────────────────────────────────
    let reader = resolve_reader(config)?;
    let lookup = resolve_lookup(config).await?;
    input::ensure_output_dir(output_dir).await?;
    let names = batch_names(&inputs.files, config);

    // ── Step 3: One file at a time ───────────────────────────────────────
    for (index, (pdf, (name, renamed))) in inputs.files.iter().zip(names).enumerate() {
        tracker.file_start(index, pdf);
        let mut outcome =
            extract_file(pdf, output_dir, &name, config, &reader, lookup.as_deref()).await;
        if let Some(note) = renamed {
            outcome.notes.insert(0, note);
        }
        tracker.file_done(index, outcome);
    }

    Ok(tracker.finish())
}

/// Names for every PDF of the batch, with file keys made unique.
///
/// A PDF whose key had to be changed carries a note saying so.
fn batch_names(files: &[PathBuf], config: &ExtractConfig) -> Vec<(PaperName, Option<String>)> {
    let names: Vec<PaperName> = files
        .iter()
        .map(|pdf| naming::derive_names(pdf, config.naming))
        .collect();
    let keys: Vec<String> = names.iter().map(|n| n.file_key.clone()).collect();
    let unique = naming::dedupe_file_keys(&keys);

    names
        .into_iter()
        .zip(unique)
        .zip(files)
        .map(|((mut name, key), pdf)| {
            if name.file_key == key {
                return (name, None);
            }
            warn!(
                "{} maps to the same file key as an earlier PDF ({}); writing {}.txt instead",
                display_name(pdf),
                name.file_key,
                key
            );
            let note = format!(
                "file key {} already used in this batch; written as {}",
                name.file_key, key
            );
            name.file_key = key;
            (name, Some(note))
        })
        .collect()
}

fn resolve_reader(config: &ExtractConfig) -> Result<Arc<dyn DocumentReader>, PaperKbError> {
    if let Some(ref reader) = config.reader {
        return Ok(Arc::clone(reader));
    }
    let reader = PdfiumReader::new(config.pdfium_library.clone())?;
    Ok(Arc::new(reader))
}

/// The reference lookup for this run, if any.
///
/// An unreachable Zotero library only disables the lookup: abstracts then
/// come from the PDF text.
async fn resolve_lookup(
    config: &ExtractConfig,
) -> Result<Option<Arc<dyn ReferenceLookup>>, PaperKbError> {
    if let Some(ref lookup) = config.lookup {
        return Ok(Some(Arc::clone(lookup)));
    }
    let Some(ref zotero) = config.zotero else {
        warn!("Zotero credentials not set; abstracts will come from the PDF text only");
        return Ok(None);
    };

    let client = ZoteroClient::new(zotero.clone())?;
    match client.check_connection().await {
        Ok(()) => Ok(Some(Arc::new(client))),
        Err(e) => {
            error!("Zotero connection failed: {}. Abstract lookup disabled for this run", e);
            Ok(None)
        }
    }
}

async fn extract_file(
    pdf: &Path,
    output_dir: &Path,
    names: &PaperName,
    config: &ExtractConfig,
    reader: &Arc<dyn DocumentReader>,
    lookup: Option<&dyn ReferenceLookup>,
) -> FileOutcome {
    let start = Instant::now();
    let output = output_dir.join(format!("{}.txt", names.file_key));
    let mut notes = Vec::new();

    let status = match extract_to(pdf, &output, names, config, reader, lookup, &mut notes).await {
        Ok(status) => status,
        Err(e) => FileStatus::Failed(e),
    };

    FileOutcome {
        source: pdf.to_path_buf(),
        output: Some(output),
        status,
        notes,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn extract_to(
    pdf: &Path,
    output: &Path,
    names: &PaperName,
    config: &ExtractConfig,
    reader: &Arc<dyn DocumentReader>,
    lookup: Option<&dyn ReferenceLookup>,
    notes: &mut Vec<String>,
) -> Result<FileStatus, FileError> {
    input::check_pdf_magic(pdf)?;

    if !config.overwrite && output.exists() {
        return Ok(FileStatus::Skipped(SkipReason::OutputExists));
    }

    let doc = read_document(reader, pdf, config.max_pages).await?;
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let meta = metadata::infer_metadata(&doc, &stem, names.filename_author.as_deref());
    debug!(
        "{}: title {:?}, authors {:?}, year {:?}",
        display_name(pdf),
        meta.title,
        meta.authors,
        meta.year
    );

    let body = doc.body();
    let introduction = match config.heuristics.find_introduction(&body) {
        Some(text) => text,
        None => {
            warn!("No introduction found in {}", display_name(pdf));
            notes.push("no introduction found".to_string());
            String::new()
        }
    };

    let abstract_text = find_abstract(
        &meta.title,
        &meta.year,
        &body,
        config,
        lookup,
        notes,
    )
    .await;
    if abstract_text.is_empty() {
        warn!("No abstract found for {}", display_name(pdf));
        notes.push("no abstract found".to_string());
    }

    let record = PaperRecord {
        title: meta.title,
        authors: meta.authors,
        year: meta.year,
        citation_key: names.citation_key.clone(),
        source: display_name(pdf),
        abstract_text,
        introduction,
        analysis: None,
    };
    store::write_atomic(output, &record.to_text()).await?;
    Ok(FileStatus::Written)
}

/// pdfium blocks, so reading happens on the blocking pool.
async fn read_document(
    reader: &Arc<dyn DocumentReader>,
    pdf: &Path,
    max_pages: usize,
) -> Result<DocumentText, FileError> {
    let reader = Arc::clone(reader);
    let path = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || reader.read(&path, max_pages))
        .await
        .map_err(|e| FileError::PdfFailed {
            detail: format!("reader task panicked: {e}"),
        })?
}

/// The abstract from the reference manager, else from the PDF text.
async fn find_abstract(
    title: &str,
    year: &str,
    body: &str,
    config: &ExtractConfig,
    lookup: Option<&dyn ReferenceLookup>,
    notes: &mut Vec<String>,
) -> String {
    if let Some(lookup) = lookup {
        if title.is_empty() {
            notes.push(format!("{} lookup skipped: no title", lookup.name()));
        } else {
            let year = (!year.is_empty()).then_some(year);
            match lookup.lookup(title, year).await {
                Ok(Some(found)) if !found.abstract_note.trim().is_empty() => {
                    let text = clean_extracted_text(&found.abstract_note);
                    info!(
                        "Found abstract in {} ({} characters)",
                        lookup.name(),
                        text.chars().count()
                    );
                    return text;
                }
                Ok(Some(found)) => {
                    info!("{} entry {:?} has no abstract", lookup.name(), found.title);
                    notes.push(format!("{} entry has no abstract", lookup.name()));
                }
                Ok(None) => {
                    info!("No {} match for {:?}", lookup.name(), title);
                    notes.push(format!("no {} match", lookup.name()));
                }
                Err(e) => {
                    warn!("{} lookup failed: {}", lookup.name(), e);
                    notes.push(format!("{} lookup failed: {}", lookup.name(), e));
                }
            }
        }
    }

    if config.pdf_abstract_fallback {
        if let Some(text) = config.heuristics.find_abstract(body) {
            notes.push("abstract taken from PDF text".to_string());
            return text;
        }
    }
    String::new()
}
