//! Text cleanup: deterministic passes over PDF text and LLM responses.
//!
//! pdfium hands back text with whatever line endings, soft hyphens and
//! zero-width characters the PDF producer left behind, and LLMs sometimes
//! wrap their answer in a ```` ``` ```` fence despite being told not to.
//! Both kinds of noise end up in the intermediate text file unless they are
//! removed here. Each pass is a pure `&str → String` function so the order
//! can be read top to bottom in the two entry points.

use crate::record::BLOCK_LABELS;
use once_cell::sync::Lazy;
use regex::Regex;

/// Clean text extracted from a PDF before it is stored in a text file.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines to a single blank line
/// 5. Indent lines that would be mistaken for a block label
/// 6. Trim the whole text
pub fn clean_extracted_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = guard_block_labels(&s);
    s.trim().to_string()
}

/// Clean a raw LLM response before it is parsed into an analysis.
pub fn clean_response(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    s.trim().to_string()
}

/// Collapse all whitespace (including newlines) into single spaces.
///
/// Header fields of the text file (`TITLE:`, `AUTHORS:` …) must fit on one
/// line.
pub fn single_line(input: &str) -> String {
    remove_invisible_chars(input)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Outer markdown fences ────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|text)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Line endings ─────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Trailing whitespace ──────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Blank lines ──────────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Invisible Unicode ────────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Block label collisions ───────────────────────────────────────────────────
//
// The text file parser treats a line that is exactly `ABSTRACT:` (etc.) as the
// start of a new block. A paper whose body happens to contain such a line
// would otherwise truncate its own introduction on the next read. The same
// holds for LLM answers written into the analysis block.

pub(crate) fn guard_block_labels(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            if BLOCK_LABELS.contains(&line.trim_end()) {
                format!(" {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\nSUMMARY:\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "SUMMARY:\nWorld");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\nSUMMARY:\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "SUMMARY:\nWorld");
    }

    #[test]
    fn test_no_fences_passthrough() {
        assert_eq!(strip_markdown_fences("SUMMARY: x"), "SUMMARY: x");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "deep\u{00AD}learning\u{200B} model\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "deeplearning model");
    }

    #[test]
    fn test_guard_block_labels() {
        let input = "Some text\nABSTRACT:\nmore";
        assert_eq!(guard_block_labels(input), "Some text\n ABSTRACT:\nmore");
    }

    #[test]
    fn test_guard_block_labels_trailing_space_and_idempotent() {
        let once = guard_block_labels("x\nINTRODUCTION:  \ny");
        assert_eq!(once, "x\n INTRODUCTION:  \ny");
        assert_eq!(guard_block_labels(&once), once);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(
            single_line("  Deep   Learning\nfor\r\nScience "),
            "Deep Learning for Science"
        );
    }

    #[test]
    fn test_clean_extracted_text_full_pipeline() {
        let input = "Intro line one   \r\n\r\n\r\n\r\nline two\u{200B}\n";
        assert_eq!(clean_extracted_text(input), "Intro line one\n\nline two");
    }
}
