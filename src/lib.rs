//! # paper2kb
//!
//! Turn a folder of research-paper PDFs into a markdown knowledge base.
//!
//! ## Why this crate?
//!
//! A literature review starts with dozens of PDFs and ends with notes that
//! say what each paper is about, what gap it addresses and where it sits in
//! the field. This crate automates the middle: it pulls the abstract and
//! introduction out of each paper, asks an LLM for a short structured
//! analysis, and writes one markdown note per paper with YAML front-matter
//! that note-taking tools such as Obsidian index directly.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Extract  pdfium text → title, authors, year, introduction;
//!  │              abstract from Zotero or the PDF      → <key>.txt
//!  ├─ 2. Analyze  one LLM call per paper: summary, gap,
//!  │              objectives, keywords                 → <key>.txt (in place)
//!  └─ 3. Render   YAML front-matter + fixed sections   → <key>.md
//! ```
//!
//! Every stage is rerunnable: outputs that already exist are skipped unless
//! overwrite is requested, and a failure on one paper never stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2kb::{analyze, extract, render, AnalyzeConfig, ExtractConfig, RenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / OPENAI_API_KEY / …
//!     let report = extract("papers/", "text/", &ExtractConfig::default()).await?;
//!     eprintln!("{}", report.summary_line());
//!
//!     let report = analyze("text/", &AnalyzeConfig::default()).await?;
//!     eprintln!("tokens: {} in / {} out", report.input_tokens, report.output_tokens);
//!
//!     render("text/", "notes/", &RenderConfig::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2kb` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! paper2kb = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::analyze;
pub use config::{
    AnalyzeConfig, AnalyzeConfigBuilder, ExtractConfig, ExtractConfigBuilder, RenderConfig,
    RenderConfigBuilder,
};
pub use error::{FileError, PaperKbError};
pub use extract::extract;
pub use output::{FileOutcome, FileStatus, SkipReason, Stage, StageReport};
pub use pipeline::analysis::Analysis;
pub use pipeline::llm::{Completion, CompletionBackend, CompletionRequest};
pub use pipeline::naming::NamingScheme;
pub use pipeline::pdf::{DocumentReader, DocumentText, PdfMetadata};
pub use pipeline::sections::SectionHeuristics;
pub use pipeline::zotero::{LibraryType, ReferenceLookup, ReferenceMatch, ZoteroConfig};
pub use progress::{NoopProgressCallback, ProgressCallback, StageProgressCallback};
pub use record::PaperRecord;
pub use render::render;
