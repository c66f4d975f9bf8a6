//! Abstract and introduction boundaries in raw page text.
//!
//! The boundaries are found with four regexes: a section starts after the
//! start match and runs to the next end match (or to the length cap when no
//! end matches). This is a heuristic and it misses papers with unusual
//! headings; a miss yields `None`, never an error. Every regex can be
//! replaced through [`SectionHeuristicsBuilder`].

use crate::error::PaperKbError;
use crate::pipeline::cleanup::clean_extracted_text;
use regex::Regex;

/// Default cap on the introduction length, in characters.
pub const DEFAULT_MAX_INTRODUCTION_CHARS: usize = 12_000;
/// Default cap on the abstract length, in characters.
pub const DEFAULT_MAX_ABSTRACT_CHARS: usize = 4_000;

/// An "Introduction" heading on its own line: `Introduction`, `1 Introduction`,
/// `1. INTRODUCTION`, `I. Introduction`.
pub const DEFAULT_INTRO_START: &str =
    r"(?m)^[ \t]*(?:(?:1|I)\.?[ \t]*)?(?i:introduction)[ \t]*:?[ \t]*$";

/// The next major heading: a line numbered `2`/`II` followed by a short
/// capitalised title, or a well-known section name.
pub const DEFAULT_INTRO_END: &str = r"(?m)^[ \t]*(?:(?:2|II)\.?[ \t]+[A-Z][^\n]{0,80}|(?:\d+\.?[ \t]*|[IVX]+\.[ \t]*)?(?i:background|related work|literature review|materials and methods|methods|methodology|results|discussion|conclusions?|experiments|experimental setup|preliminaries|problem formulation)[ \t]*:?)[ \t]*$";

/// An `Abstract` heading: alone on its line, followed by punctuation and the
/// first words of the abstract, or written `ABSTRACT` in capitals before
/// inline text. A title such as "Abstract Algebra for ..." does not match.
pub const DEFAULT_ABSTRACT_START: &str =
    r"(?m)^[ \t]*(?:(?i:abstract)[ \t]*(?:[:.\-–—][ \t]*|$)|ABSTRACT[ \t]+)";

/// Where an abstract stops: the introduction heading, a keyword line or a
/// numbered heading. A heading number has at most two digits and its title
/// is words only, so a wrapped line such as `2023 Census data show...`
/// stays in the abstract.
pub const DEFAULT_ABSTRACT_END: &str = r"(?m)^[ \t]*(?:(?:(?:1|I)\.?[ \t]*)?(?i:introduction)[ \t]*:?[ \t]*$|(?i:keywords|key words|index terms)\b|(?:\d{1,2}|[IVX]{1,4})\.?[ \t]+[A-Z][A-Za-z \t\-:,&/]{0,60}$)";

/// Configurable boundary heuristics for the abstract and introduction.
#[derive(Debug, Clone)]
pub struct SectionHeuristics {
    intro_start: Regex,
    intro_end: Regex,
    abstract_start: Regex,
    abstract_end: Regex,
    max_introduction_chars: usize,
    max_abstract_chars: usize,
}

impl Default for SectionHeuristics {
    fn default() -> Self {
        Self {
            intro_start: Regex::new(DEFAULT_INTRO_START).unwrap(),
            intro_end: Regex::new(DEFAULT_INTRO_END).unwrap(),
            abstract_start: Regex::new(DEFAULT_ABSTRACT_START).unwrap(),
            abstract_end: Regex::new(DEFAULT_ABSTRACT_END).unwrap(),
            max_introduction_chars: DEFAULT_MAX_INTRODUCTION_CHARS,
            max_abstract_chars: DEFAULT_MAX_ABSTRACT_CHARS,
        }
    }
}

impl SectionHeuristics {
    pub fn builder() -> SectionHeuristicsBuilder {
        SectionHeuristicsBuilder::default()
    }

    /// The introduction of `text`, cleaned and capped, or `None` when no
    /// introduction heading is found.
    pub fn find_introduction(&self, text: &str) -> Option<String> {
        find_section(
            text,
            &self.intro_start,
            &self.intro_end,
            self.max_introduction_chars,
        )
    }

    /// The abstract printed in `text`, cleaned and capped.
    pub fn find_abstract(&self, text: &str) -> Option<String> {
        find_section(
            text,
            &self.abstract_start,
            &self.abstract_end,
            self.max_abstract_chars,
        )
    }
}

fn find_section(text: &str, start: &Regex, end: &Regex, cap: usize) -> Option<String> {
    let body_start = start.find(text)?.end();
    // find_at keeps the full haystack as context, so `^` still means
    // "start of a line" rather than "start of the remainder".
    let body_end = end
        .find_at(text, body_start)
        .map_or(text.len(), |m| m.start());
    let cleaned = clean_extracted_text(&text[body_start..body_end]);
    let capped = truncate_chars(&cleaned, cap).trim_end();
    (!capped.is_empty()).then(|| capped.to_string())
}

/// The first `max` characters of `s`, cut at a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Builder for [`SectionHeuristics`]; unset patterns keep their defaults.
#[derive(Debug, Default)]
pub struct SectionHeuristicsBuilder {
    intro_start: Option<String>,
    intro_end: Option<String>,
    abstract_start: Option<String>,
    abstract_end: Option<String>,
    max_introduction_chars: Option<usize>,
    max_abstract_chars: Option<usize>,
}

impl SectionHeuristicsBuilder {
    pub fn intro_start_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.intro_start = Some(pattern.into());
        self
    }

    pub fn intro_end_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.intro_end = Some(pattern.into());
        self
    }

    pub fn abstract_start_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.abstract_start = Some(pattern.into());
        self
    }

    pub fn abstract_end_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.abstract_end = Some(pattern.into());
        self
    }

    pub fn max_introduction_chars(mut self, n: usize) -> Self {
        self.max_introduction_chars = Some(n.max(1));
        self
    }

    pub fn max_abstract_chars(mut self, n: usize) -> Self {
        self.max_abstract_chars = Some(n.max(1));
        self
    }

    /// Compile the patterns. An invalid regex is a configuration error.
    pub fn build(self) -> Result<SectionHeuristics, PaperKbError> {
        fn compile(name: &str, pattern: Option<String>, default: &str) -> Result<Regex, PaperKbError> {
            let pattern = pattern.as_deref().unwrap_or(default);
            Regex::new(pattern).map_err(|e| {
                PaperKbError::InvalidConfig(format!("{name} pattern {pattern:?} is not a valid regex: {e}"))
            })
        }

        Ok(SectionHeuristics {
            intro_start: compile("introduction start", self.intro_start, DEFAULT_INTRO_START)?,
            intro_end: compile("introduction end", self.intro_end, DEFAULT_INTRO_END)?,
            abstract_start: compile("abstract start", self.abstract_start, DEFAULT_ABSTRACT_START)?,
            abstract_end: compile("abstract end", self.abstract_end, DEFAULT_ABSTRACT_END)?,
            max_introduction_chars: self
                .max_introduction_chars
                .unwrap_or(DEFAULT_MAX_INTRODUCTION_CHARS),
            max_abstract_chars: self.max_abstract_chars.unwrap_or(DEFAULT_MAX_ABSTRACT_CHARS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "Deep Learning for Protein Folding
J. Smith
Abstract
We present a deep model that folds proteins.
It is fast.
Keywords: protein, folding

1 Introduction
Proteins fold into shapes.

Prediction is hard.
2 Related Work
Earlier models exist.";

    #[test]
    fn test_find_introduction() {
        let h = SectionHeuristics::default();
        assert_eq!(
            h.find_introduction(PAPER).as_deref(),
            Some("Proteins fold into shapes.\n\nPrediction is hard.")
        );
    }

    #[test]
    fn test_find_abstract_stops_at_keywords() {
        let h = SectionHeuristics::default();
        assert_eq!(
            h.find_abstract(PAPER).as_deref(),
            Some("We present a deep model that folds proteins.\nIt is fast.")
        );
    }

    #[test]
    fn test_inline_abstract_label() {
        let h = SectionHeuristics::default();
        let text = "Title\nABSTRACT: Cells divide.\nI. INTRODUCTION\nBody.";
        assert_eq!(h.find_abstract(text).as_deref(), Some("Cells divide."));
        assert_eq!(h.find_introduction(text).as_deref(), Some("Body."));
    }

    #[test]
    fn test_introduction_runs_to_end_without_next_heading() {
        let h = SectionHeuristics::default();
        let text = "Introduction\nOnly text here.";
        assert_eq!(h.find_introduction(text).as_deref(), Some("Only text here."));
    }

    #[test]
    fn test_missing_sections_are_none() {
        let h = SectionHeuristics::default();
        let text = "A paper that never names its sections.";
        assert_eq!(h.find_introduction(text), None);
        assert_eq!(h.find_abstract(text), None);
    }

    #[test]
    fn test_mention_of_introduction_in_body_is_not_a_heading() {
        let h = SectionHeuristics::default();
        assert_eq!(
            h.find_introduction("The introduction of new methods is slow."),
            None
        );
    }

    #[test]
    fn test_cap_cuts_on_char_boundary() {
        let h = SectionHeuristics::builder()
            .max_introduction_chars(5)
            .build()
            .unwrap();
        assert_eq!(
            h.find_introduction("Introduction\nÉtude über alles").as_deref(),
            Some("Étude")
        );
    }

    #[test]
    fn test_custom_patterns() {
        let h = SectionHeuristics::builder()
            .intro_start_pattern(r"(?m)^Einleitung$")
            .intro_end_pattern(r"(?m)^Methoden$")
            .build()
            .unwrap();
        let text = "Einleitung\nText.\nMethoden\nMore.";
        assert_eq!(h.find_introduction(text).as_deref(), Some("Text."));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = SectionHeuristics::builder()
            .intro_end_pattern("(unclosed")
            .build()
            .unwrap_err();
        assert!(matches!(err, PaperKbError::InvalidConfig(_)));
        assert!(err.to_string().contains("introduction end"));
    }

    #[test]
    fn test_title_starting_with_abstract_is_not_the_abstract() {
        let h = SectionHeuristics::default();
        let text = "Abstract Algebra in Lattice Cryptography\nJ. Doe\n\nAbstract\nWe study lattices.\n\n1 Introduction\nBody.";
        assert_eq!(h.find_abstract(text).as_deref(), Some("We study lattices."));
        assert_eq!(
            h.find_abstract("Abstract Algebra in Lattice Cryptography\nNo abstract here."),
            None
        );
    }

    #[test]
    fn test_wrapped_line_starting_with_a_number_stays_in_the_abstract() {
        let h = SectionHeuristics::default();
        let text = "Abstract\nWe survey census methods across\n2023 Census data releases and their gaps.\n12 Patients were enrolled.\nKeywords: census";
        assert_eq!(
            h.find_abstract(text).as_deref(),
            Some("We survey census methods across\n2023 Census data releases and their gaps.\n12 Patients were enrolled.")
        );
    }

    #[test]
    fn test_numbered_heading_still_ends_the_abstract() {
        let h = SectionHeuristics::default();
        let text = "Abstract: Short text.\n1 Motivation\nMore.";
        assert_eq!(h.find_abstract(text).as_deref(), Some("Short text."));
    }
}
