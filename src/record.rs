//! The intermediate text file shared by all three stages.
//!
//! ```text
//! TITLE: Deep Learning for Protein Folding
//! AUTHORS: Smith, J.
//! YEAR: 2023
//! CITATION KEY: Smith_2023
//! SOURCE: Smith_2023_DeepLearning.pdf
//!
//! ABSTRACT:
//! ...
//!
//! INTRODUCTION:
//! ...
//!
//! ANALYSIS:
//! SUMMARY:
//! ...
//! ```
//!
//! A block label counts only when it sits alone on a line at the start of the
//! file or right after a blank line. Block bodies (extracted text and LLM
//! answers alike) are written with such lines indented by one space, so a
//! paper or a model that repeats `ABSTRACT:` cannot open a new block.

use crate::pipeline::analysis::Analysis;
use crate::pipeline::cleanup::{guard_block_labels, single_line};
use serde::{Deserialize, Serialize};

pub const ABSTRACT_LABEL: &str = "ABSTRACT:";
pub const INTRODUCTION_LABEL: &str = "INTRODUCTION:";
pub const ANALYSIS_LABEL: &str = "ANALYSIS:";
/// Written by older versions of the pipeline; accepted when reading.
pub const LEGACY_ANALYSIS_LABEL: &str = "CLAUDE ANALYSIS:";

/// Lines that open a block of the text file.
pub const BLOCK_LABELS: &[&str] = &[
    ABSTRACT_LABEL,
    INTRODUCTION_LABEL,
    ANALYSIS_LABEL,
    LEGACY_ANALYSIS_LABEL,
];

/// One paper as stored between stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: String,
    pub year: String,
    pub citation_key: String,
    /// File name of the PDF the record was extracted from.
    pub source: String,
    pub abstract_text: String,
    pub introduction: String,
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Header,
    Abstract,
    Introduction,
    Analysis,
}

fn block_for(line: &str) -> Option<Block> {
    match line.trim_end() {
        ABSTRACT_LABEL => Some(Block::Abstract),
        INTRODUCTION_LABEL => Some(Block::Introduction),
        ANALYSIS_LABEL | LEGACY_ANALYSIS_LABEL => Some(Block::Analysis),
        _ => None,
    }
}

/// Split the file into blocks, remembering where each block label starts.
fn split_blocks(text: &str) -> Vec<(Block, usize, Vec<&str>)> {
    let mut blocks = vec![(Block::Header, 0, Vec::new())];
    let mut offset = 0;
    let mut after_blank = true;

    for line in text.split('\n') {
        let label = if after_blank { block_for(line) } else { None };
        match label {
            Some(block) => blocks.push((block, offset, Vec::new())),
            None => {
                if let Some((_, _, lines)) = blocks.last_mut() {
                    lines.push(line.trim_end_matches('\r'));
                }
            }
        }
        after_blank = line.trim().is_empty();
        offset += line.len() + 1;
    }
    blocks
}

fn block_text(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

impl PaperRecord {
    /// Parse a text file. Never fails: missing headers and blocks are empty.
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();

        for (block, _, lines) in split_blocks(text) {
            match block {
                Block::Header => {
                    for line in lines {
                        let Some((key, value)) = line.split_once(':') else {
                            continue;
                        };
                        let value = value.trim().to_string();
                        match key.trim().to_ascii_uppercase().as_str() {
                            "TITLE" => record.title = value,
                            "AUTHORS" | "AUTHOR" => record.authors = value,
                            "YEAR" => record.year = value,
                            "CITATION KEY" => record.citation_key = value,
                            "SOURCE" => record.source = value,
                            _ => {}
                        }
                    }
                }
                Block::Abstract => record.abstract_text = block_text(&lines),
                Block::Introduction => record.introduction = block_text(&lines),
                Block::Analysis => record.analysis = Some(Analysis::parse(&block_text(&lines))),
            }
        }
        record
    }

    /// Serialise to the text file format. Header values are forced onto a
    /// single line.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "TITLE: {}\nAUTHORS: {}\nYEAR: {}\nCITATION KEY: {}\nSOURCE: {}\n\n{ABSTRACT_LABEL}\n{}\n\n{INTRODUCTION_LABEL}\n{}\n",
            single_line(&self.title),
            single_line(&self.authors),
            single_line(&self.year),
            single_line(&self.citation_key),
            single_line(&self.source),
            guard_block_labels(self.abstract_text.trim()),
            guard_block_labels(self.introduction.trim()),
        );
        if let Some(analysis) = &self.analysis {
            push_analysis(&mut out, analysis);
        }
        out
    }

    /// True when there is something for the LLM to read.
    pub fn has_content(&self) -> bool {
        !self.abstract_text.trim().is_empty() || !self.introduction.trim().is_empty()
    }
}

fn push_analysis(out: &mut String, analysis: &Analysis) {
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push_str("\n\n");
    out.push_str(ANALYSIS_LABEL);
    out.push('\n');
    out.push_str(&analysis.to_block());
    out.push('\n');
}

/// True when the text file already carries an analysis block.
pub fn has_analysis(text: &str) -> bool {
    split_blocks(text)
        .iter()
        .any(|(block, _, _)| *block == Block::Analysis)
}

/// Return `text` with its analysis block (if any) replaced by `analysis`.
///
/// Everything before the first analysis label is kept byte for byte apart
/// from trailing whitespace.
pub fn with_analysis(text: &str, analysis: &Analysis) -> String {
    let cut = split_blocks(text)
        .iter()
        .find(|(block, _, _)| *block == Block::Analysis)
        .map_or(text.len(), |(_, offset, _)| *offset);
    let mut out = text[..cut].to_string();
    push_analysis(&mut out, analysis);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaperRecord {
        PaperRecord {
            title: "Deep Learning for Protein Folding".into(),
            authors: "Smith, J.; Doe, A.".into(),
            year: "2023".into(),
            citation_key: "Smith_2023".into(),
            source: "Smith_2023_DeepLearning.pdf".into(),
            abstract_text: "We fold proteins.\n\nWith deep nets.".into(),
            introduction: "Proteins matter.".into(),
            analysis: None,
        }
    }

    #[test]
    fn test_text_layout() {
        let text = sample().to_text();
        assert!(text.starts_with(
            "TITLE: Deep Learning for Protein Folding\nAUTHORS: Smith, J.; Doe, A.\nYEAR: 2023\n"
        ));
        assert!(text.contains("\n\nABSTRACT:\nWe fold proteins.\n\nWith deep nets.\n\nINTRODUCTION:\nProteins matter.\n"));
        assert!(!has_analysis(&text));
    }

    #[test]
    fn test_parse_round_trip() {
        let record = sample();
        assert_eq!(PaperRecord::parse(&record.to_text()), record);
    }

    #[test]
    fn test_empty_blocks_parse_as_empty() {
        let record = PaperRecord {
            abstract_text: String::new(),
            introduction: String::new(),
            ..sample()
        };
        let parsed = PaperRecord::parse(&record.to_text());
        assert_eq!(parsed.abstract_text, "");
        assert_eq!(parsed.introduction, "");
        assert!(!parsed.has_content());
    }

    #[test]
    fn test_header_values_forced_single_line() {
        let record = PaperRecord {
            title: "Multi\nline\ttitle".into(),
            ..sample()
        };
        assert!(record.to_text().starts_with("TITLE: Multi line title\n"));
    }

    #[test]
    fn test_label_inside_paragraph_is_not_a_block() {
        let text = "TITLE: T\n\nABSTRACT:\nfirst line\nINTRODUCTION:\nstill abstract\n";
        let record = PaperRecord::parse(text);
        assert_eq!(
            record.abstract_text,
            "first line\nINTRODUCTION:\nstill abstract"
        );
        assert_eq!(record.introduction, "");
    }

    #[test]
    fn test_missing_headers_are_empty() {
        let record = PaperRecord::parse("ABSTRACT:\nOnly an abstract.\n");
        assert_eq!(record.title, "");
        assert_eq!(record.year, "");
        assert_eq!(record.abstract_text, "Only an abstract.");
    }

    #[test]
    fn test_with_analysis_appends_then_replaces() {
        let text = sample().to_text();
        let first = Analysis {
            summary: "First.".into(),
            ..Analysis::default()
        };
        let once = with_analysis(&text, &first);
        assert!(has_analysis(&once));
        assert!(once.starts_with(&text));

        let second = Analysis {
            summary: "Second.".into(),
            keywords: vec!["protein".into()],
            ..Analysis::default()
        };
        let twice = with_analysis(&once, &second);
        assert_eq!(twice.matches("ANALYSIS:").count(), 1);
        let parsed = PaperRecord::parse(&twice);
        assert_eq!(parsed.analysis, Some(second));
        assert_eq!(parsed.abstract_text, sample().abstract_text);
    }

    #[test]
    fn test_legacy_analysis_label_is_read() {
        let text = format!(
            "{}\nCLAUDE ANALYSIS:\nSUMMARY:\nOld summary.\n",
            sample().to_text()
        );
        assert!(has_analysis(&text));
        let parsed = PaperRecord::parse(&text);
        assert_eq!(parsed.analysis.map(|a| a.summary).as_deref(), Some("Old summary."));
        assert!(!with_analysis(&text, &Analysis::default()).contains("CLAUDE"));
    }

    #[test]
    fn test_model_repeating_a_block_label_stays_in_the_analysis() {
        let record = PaperRecord {
            abstract_text: "Real abstract.".into(),
            ..sample()
        };
        let response = "SUMMARY: A study.\n\nABSTRACT:\nrestated by the model\n\nINTRODUCTION:\n\nRESEARCH GAP/PROBLEM: gap\n\nOBJECTIVES: obj\n\nKEYWORDS: papers, dataset";
        let text = with_analysis(&record.to_text(), &Analysis::parse(response));

        let parsed = PaperRecord::parse(&text);
        assert_eq!(parsed.abstract_text, "Real abstract.");
        assert_eq!(parsed.introduction, "Proteins matter.");
        let analysis = parsed.analysis.expect("analysis block");
        assert!(analysis.summary.starts_with("A study."));
        assert!(analysis.summary.contains("restated by the model"));
        assert_eq!(analysis.research_gap, "gap");
        assert_eq!(analysis.objectives, "obj");
        assert_eq!(analysis.keywords, vec!["paper", "dataset"]);

        // A second analysis pass replaces the block without touching the rest.
        let again = with_analysis(&text, &parsed_analysis(&text));
        assert_eq!(again, text);
    }

    #[test]
    fn test_block_label_in_abstract_is_kept_in_the_abstract() {
        let record = PaperRecord {
            abstract_text: "Part one.\n\nINTRODUCTION:\nstill the abstract".into(),
            ..sample()
        };
        let parsed = PaperRecord::parse(&record.to_text());
        assert!(parsed.abstract_text.contains("still the abstract"));
        assert_eq!(parsed.introduction, "Proteins matter.");
    }

    fn parsed_analysis(text: &str) -> Analysis {
        PaperRecord::parse(text).analysis.unwrap_or_default()
    }
}
