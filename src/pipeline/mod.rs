//! Building blocks for the three stages.
//!
//! Each submodule does one job and most are pure functions over strings, so
//! they are tested in isolation. The stage drivers in [`crate::extract`],
//! [`crate::analyze`] and [`crate::render`] stitch them together.
//!
//! ## Data Flow
//!
//! ```text
//! Extract:  input ──▶ pdf ──▶ metadata + sections ──▶ zotero ──▶ store
//!           (*.pdf)  (pdfium)  (heuristics)          (abstract)  (*.txt)
//!
//! Analyze:  store ──▶ prompts + llm ──▶ analysis + keywords ──▶ store
//!           (*.txt)   (one call/paper)   (label parsing)         (*.txt)
//!
//! Render:   store ──▶ markdown ──▶ store
//!           (*.txt)   (YAML + H1)  (*.md)
//! ```
//!
//! 1. [`input`]    resolve a file or directory, check `%PDF` magic
//! 2. [`pdf`]      read page text and info-dictionary metadata; pdfium is
//!    not async-safe, so the driver calls it from `spawn_blocking`
//! 3. [`metadata`] title, author and year from metadata, first page and
//!    filename
//! 4. [`sections`] abstract and introduction boundaries
//! 5. [`zotero`]   abstract lookup in the reference manager; network I/O
//! 6. [`llm`]      one completion per paper with a timeout; network I/O
//! 7. [`analysis`] and [`keywords`] parse and normalise the response
//! 8. [`markdown`] front-matter and sections, deterministic
//! 9. [`naming`], [`cleanup`] and [`store`] are shared helpers

pub mod analysis;
pub mod cleanup;
pub mod input;
pub mod keywords;
pub mod llm;
pub mod markdown;
pub mod metadata;
pub mod naming;
pub mod pdf;
pub mod sections;
pub mod store;
pub mod zotero;
