//! Markdown rendering: YAML front-matter plus fixed H1 sections.
//!
//! The output is a pure function of the [`PaperRecord`]: no timestamps, no
//! map iteration, so rendering the same text file twice yields identical
//! bytes. Every heading is always emitted, even when its body is empty, so
//! notes in a knowledge base share one shape.

use crate::error::FileError;
use crate::pipeline::keywords::normalize_keywords;
use crate::record::PaperRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// H1 headings in output order.
pub const SECTION_HEADINGS: [&str; 7] = [
    "TITLE",
    "AUTHOR",
    "SUMMARY",
    "KEYWORDS",
    "RESEARCH GAP/PROBLEM",
    "OBJECTIVES",
    "ABSTRACT",
];

/// YAML front-matter of a note. Field order is the output order.
#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    author: String,
    year: Year<'a>,
    tags: &'a [String],
}

/// A four-digit year is written as a number; anything else stays a string.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Year<'a> {
    Number(u16),
    Text(&'a str),
}

impl<'a> Year<'a> {
    fn new(year: &'a str) -> Self {
        let year = year.trim();
        let plain = year.len() == 4
            && !year.starts_with('0')
            && year.bytes().all(|b| b.is_ascii_digit());
        match year.parse() {
            Ok(n) if plain => Year::Number(n),
            _ => Year::Text(year),
        }
    }
}

/// Render a record as a knowledge-base markdown note.
///
/// # Errors
/// Returns [`FileError::RenderFailed`] if the front-matter cannot be
/// serialised.
pub fn render_markdown(record: &PaperRecord) -> Result<String, FileError> {
    let analysis = record.analysis.clone().unwrap_or_default();
    let keywords = normalize_keywords(&analysis.keywords);

    let front_matter = front_matter(&FrontMatter {
        title: record.title.trim(),
        author: clean_author_for_yaml(&record.authors),
        year: Year::new(&record.year),
        tags: &keywords,
    })?;

    let hashtags = keywords
        .iter()
        .map(|k| format!("#{k}"))
        .collect::<Vec<_>>()
        .join(", ");
    let bodies = [
        record.title.trim(),
        record.authors.trim(),
        analysis.summary.trim(),
        hashtags.as_str(),
        analysis.research_gap.trim(),
        analysis.objectives.trim(),
        record.abstract_text.trim(),
    ];

    let sections = SECTION_HEADINGS
        .iter()
        .zip(bodies)
        .map(|(heading, body)| {
            if body.is_empty() {
                format!("# {heading}")
            } else {
                format!("# {heading}\n{body}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!("{front_matter}\n{sections}\n"))
}

/// `---`-delimited YAML block, followed by a blank line.
fn front_matter(fm: &FrontMatter<'_>) -> Result<String, FileError> {
    let yaml = serde_yaml::to_string(fm).map_err(|e| FileError::RenderFailed {
        detail: format!("yaml encode: {e}"),
    })?;
    Ok(format!("---\n{}\n---\n", yaml.trim_end()))
}

static RE_AUTHOR_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s,;.\-]").unwrap());

/// Strip characters outside `[\w\s,;.-]` from an author string and
/// collapse whitespace.
///
/// ```
/// use paper2kb::pipeline::markdown::clean_author_for_yaml;
///
/// assert_eq!(clean_author_for_yaml("Smith, J.*  & Doe, A.†"), "Smith, J. Doe, A.");
/// ```
pub fn clean_author_for_yaml(author: &str) -> String {
    RE_AUTHOR_DISALLOWED
        .replace_all(author, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
