//! Title, authors and year from PDF metadata, page text and the file name.
//!
//! Each field walks a fixed chain of sources and stops at the first one that
//! yields something. All of them can come back empty; downstream stages
//! tolerate empty fields.

use crate::pipeline::pdf::DocumentText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Bibliographic fields inferred for one paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: String,
    pub year: String,
}

/// Lines of page 1 scanned for an author line.
const AUTHOR_SCAN_LINES: usize = 15;
/// Characters of page 1 scanned for a year.
const YEAR_SCAN_CHARS: usize = 1000;

static RE_AUTHOR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bby\b|\bauthors?:|\bet al\.|\bcorresponding author\b").unwrap()
});
static RE_AUTHOR_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:by\b|authors?:|corresponding author:?)\s*").unwrap()
});
static RE_FILENAME_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])((?:19|20)\d{2})(?:[^0-9]|$)").unwrap());
static RE_PDF_DATE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"D:(\d{4})").unwrap());
static RE_TEXT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

/// Infer title, authors and year for a document.
///
/// `stem` is the PDF file stem; `filename_author` is the author recovered
/// from the file name, used when neither metadata nor page 1 names one.
pub fn infer_metadata(
    doc: &DocumentText,
    stem: &str,
    filename_author: Option<&str>,
) -> PaperMetadata {
    PaperMetadata {
        title: infer_title(doc),
        authors: infer_authors(doc, filename_author),
        year: infer_year(doc, stem),
    }
}

fn infer_title(doc: &DocumentText) -> String {
    if let Some(title) = doc.metadata.title.as_deref().map(str::trim) {
        let lower = title.to_lowercase();
        if !title.is_empty() && lower != "untitled" && lower != "document" {
            return title.to_string();
        }
    }
    doc.first_page()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

fn infer_authors(doc: &DocumentText, filename_author: Option<&str>) -> String {
    if let Some(author) = doc.metadata.author.as_deref().map(str::trim) {
        if !author.is_empty() && !author.eq_ignore_ascii_case("unknown author") {
            return author.to_string();
        }
    }

    let from_page = doc
        .first_page()
        .lines()
        .take(AUTHOR_SCAN_LINES)
        .find(|line| RE_AUTHOR_LINE.is_match(line))
        .map(|line| RE_AUTHOR_LABEL.replace(line.trim(), "").trim().to_string())
        .filter(|author| !author.is_empty());

    from_page
        .or_else(|| filename_author.map(str::to_string))
        .unwrap_or_default()
}

fn infer_year(doc: &DocumentText, stem: &str) -> String {
    if let Some(caps) = RE_FILENAME_YEAR.captures(stem) {
        return caps[1].to_string();
    }

    let from_dates = [&doc.metadata.creation_date, &doc.metadata.modification_date]
        .into_iter()
        .flatten()
        .find_map(|date| RE_PDF_DATE_YEAR.captures(date).map(|c| c[1].to_string()));
    if let Some(year) = from_dates {
        return year;
    }

    let head: String = doc.first_page().chars().take(YEAR_SCAN_CHARS).collect();
    RE_TEXT_YEAR
        .find(&head)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
