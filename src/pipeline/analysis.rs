//! Analysis sections: parse an LLM answer, serialise the `ANALYSIS:` block.
//!
//! Models are asked for four labelled sections but routinely decorate the
//! labels (`## Summary`, `**KEYWORDS:**`), rename them (`Research Gap`,
//! `Problem Statement`) or put the content on the same line as the label.
//! [`Analysis::parse`] accepts all of those and never fails: whatever it
//! cannot place is simply missing and gets written as [`MISSING_PLACEHOLDER`].

use crate::pipeline::cleanup::{clean_response, guard_block_labels};
use crate::pipeline::keywords::{normalize_keywords, parse_keyword_list};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Written in place of a field the model did not provide.
pub const MISSING_PLACEHOLDER: &str = "[not provided]";

pub const SUMMARY_LABEL: &str = "SUMMARY:";
pub const RESEARCH_GAP_LABEL: &str = "RESEARCH GAP/PROBLEM:";
pub const OBJECTIVES_LABEL: &str = "OBJECTIVES:";
pub const KEYWORDS_LABEL: &str = "KEYWORDS:";

/// The four LLM-produced fields of a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub research_gap: String,
    pub objectives: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Summary,
    ResearchGap,
    Objectives,
    Keywords,
}

// Groups: 1 heading hashes, 2 bold/underline marker, 3 label, 4 colon, 5 rest.
static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(#{1,6}\s*)?(?:\d+[.)]\s*)?(\*\*|__)?\s*(summary|research\s+gap\s*/\s*problem(?:\s+statement)?|research\s+gap|problem\s+statement|research\s+objectives|objectives(?:\s*/\s*research\s+questions)?|keywords)\s*(?:\*\*|__)?\s*(:)?\s*(?:\*\*|__)?\s*(.*)$",
    )
    .unwrap()
});

fn classify_label(line: &str) -> Option<(Field, String)> {
    let caps = RE_LABEL.captures(line)?;
    let rest = caps.get(5).map_or("", |m| m.as_str()).trim();
    let decorated = caps.get(1).is_some() || caps.get(2).is_some();
    // Without a colon only a bare decorated heading counts, so a sentence
    // starting with "Summary of" stays content.
    if caps.get(4).is_none() && !(decorated && rest.is_empty()) {
        return None;
    }

    let label = caps[3].to_lowercase();
    let field = if label.starts_with("summary") {
        Field::Summary
    } else if label.starts_with("keywords") {
        Field::Keywords
    } else if label.contains("gap") || label.starts_with("problem") {
        Field::ResearchGap
    } else {
        Field::Objectives
    };
    Some((field, rest.to_string()))
}

/// Map a stored or model-provided field to its value; the placeholder reads
/// back as empty.
fn field_value(text: &str) -> String {
    let text = text.trim();
    if text == MISSING_PLACEHOLDER {
        String::new()
    } else {
        text.to_string()
    }
}

impl Analysis {
    /// Parse a free-form LLM answer (or a stored `ANALYSIS:` block).
    ///
    /// A non-empty answer without any recognised label becomes the summary.
    pub fn parse(response: &str) -> Self {
        let cleaned = clean_response(response);
        let mut sections: Vec<(Field, Vec<String>)> = Vec::new();

        for line in cleaned.lines() {
            if let Some((field, rest)) = classify_label(line) {
                let mut lines = Vec::new();
                if !rest.is_empty() {
                    lines.push(rest);
                }
                sections.push((field, lines));
            } else if let Some((_, lines)) = sections.last_mut() {
                lines.push(line.to_string());
            }
        }

        if sections.is_empty() {
            return Self {
                summary: field_value(&cleaned),
                ..Self::default()
            };
        }

        let mut analysis = Self::default();
        for (field, lines) in sections {
            let text = field_value(&lines.join("\n"));
            if text.is_empty() {
                continue;
            }
            // First occurrence wins; models sometimes repeat a heading in a
            // closing recap.
            match field {
                Field::Summary if analysis.summary.is_empty() => analysis.summary = text,
                Field::ResearchGap if analysis.research_gap.is_empty() => {
                    analysis.research_gap = text
                }
                Field::Objectives if analysis.objectives.is_empty() => analysis.objectives = text,
                Field::Keywords if analysis.keywords.is_empty() => {
                    analysis.keywords = normalize_keywords(parse_keyword_list(&text))
                }
                _ => {}
            }
        }
        analysis
    }

    /// True when no field carries content.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.research_gap.is_empty()
            && self.objectives.is_empty()
            && self.keywords.is_empty()
    }

    /// Names of the fields that will be written as placeholders.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.summary.is_empty() {
            missing.push("summary");
        }
        if self.research_gap.is_empty() {
            missing.push("research gap");
        }
        if self.objectives.is_empty() {
            missing.push("objectives");
        }
        if self.keywords.is_empty() {
            missing.push("keywords");
        }
        missing
    }

    /// Serialise the body of the `ANALYSIS:` block (without the block label).
    ///
    /// Model text that repeats a block label of the text file on its own line
    /// is indented so it cannot open a new block when the file is read back.
    pub fn to_block(&self) -> String {
        fn or_placeholder(text: &str) -> String {
            if text.trim().is_empty() {
                MISSING_PLACEHOLDER.to_string()
            } else {
                guard_block_labels(text.trim())
            }
        }

        let keywords = self.keywords.join(", ");
        format!(
            "{SUMMARY_LABEL}\n{}\n\n{RESEARCH_GAP_LABEL}\n{}\n\n{OBJECTIVES_LABEL}\n{}\n\n{KEYWORDS_LABEL}\n{}",
            or_placeholder(&self.summary),
            or_placeholder(&self.research_gap),
            or_placeholder(&self.objectives),
            or_placeholder(&keywords),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "SUMMARY:
The paper proposes a new model.
It beats the baselines.

RESEARCH GAP/PROBLEM:
Prior models ignore context.

OBJECTIVES:
Build a context-aware model.

KEYWORDS:
transformers, attention_mechanism, benchmark, datasets, NLP";

    #[test]
    fn test_parse_well_formed() {
        let a = Analysis::parse(WELL_FORMED);
        assert_eq!(
            a.summary,
            "The paper proposes a new model.\nIt beats the baselines."
        );
        assert_eq!(a.research_gap, "Prior models ignore context.");
        assert_eq!(a.objectives, "Build a context-aware model.");
        assert_eq!(
            a.keywords,
            vec!["transformer", "attention_mechanism", "benchmark", "dataset", "NLP"]
        );
    }

    #[test]
    fn test_parse_decorated_labels_and_inline_content() {
        let response = "```markdown
## Summary
A study of cells.

**Research Gap:** Nobody looked at cells.

**Objectives:** Look at cells.

### Keywords
- cells
- microscopy
```";
        let a = Analysis::parse(response);
        assert_eq!(a.summary, "A study of cells.");
        assert_eq!(a.research_gap, "Nobody looked at cells.");
        assert_eq!(a.objectives, "Look at cells.");
        assert_eq!(a.keywords, vec!["cell", "microscopy"]);
    }

    #[test]
    fn test_parse_label_variants() {
        let a = Analysis::parse(
            "Summary: s\nProblem Statement: p\nObjectives/Research Questions: o\nKeywords: k",
        );
        assert_eq!(a.research_gap, "p");
        assert_eq!(a.objectives, "o");
        assert_eq!(a.keywords, vec!["k"]);
    }

    #[test]
    fn test_sentence_starting_with_label_word_is_content() {
        let a = Analysis::parse("SUMMARY:\nSummary of findings is positive.");
        assert_eq!(a.summary, "Summary of findings is positive.");
    }

    #[test]
    fn test_unlabelled_response_becomes_summary() {
        let a = Analysis::parse("Just a paragraph about the paper.");
        assert_eq!(a.summary, "Just a paragraph about the paper.");
        assert!(a.keywords.is_empty());
        assert_eq!(a.missing_fields(), vec!["research gap", "objectives", "keywords"]);
    }

    #[test]
    fn test_empty_response_is_empty() {
        assert!(Analysis::parse("  \n ").is_empty());
    }

    #[test]
    fn test_to_block_uses_placeholders() {
        let a = Analysis {
            summary: "Only a summary.".into(),
            ..Analysis::default()
        };
        let block = a.to_block();
        assert!(block.starts_with("SUMMARY:\nOnly a summary.\n\nRESEARCH GAP/PROBLEM:\n[not provided]"));
        assert!(block.ends_with("KEYWORDS:\n[not provided]"));
    }

    #[test]
    fn test_placeholders_read_back_as_empty() {
        let block = Analysis::default().to_block();
        assert_eq!(Analysis::parse(&block), Analysis::default());
    }

    #[test]
    fn test_block_reparses_to_same_analysis() {
        let a = Analysis::parse(WELL_FORMED);
        assert_eq!(Analysis::parse(&a.to_block()), a);
    }
}
