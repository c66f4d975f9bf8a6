//! Prompts for the Analyzer.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! unit tests can inspect the text without calling a model. Callers can
//! replace the system prompt via
//! [`crate::config::AnalyzeConfigBuilder::system_prompt`]; the instruction
//! prompt is always built by [`analysis_prompt`] because the response parser
//! depends on its section labels.

/// Default system prompt for paper analysis.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert at analyzing scientific literature. \
Focus on extracting the most important information accurately.";

/// Default number of keywords requested per paper.
pub const DEFAULT_KEYWORD_COUNT: usize = 5;

/// Build the instruction prompt for one paper.
///
/// Empty abstract or introduction sections are left out of the prompt.
pub fn analysis_prompt(
    title: &str,
    abstract_text: &str,
    introduction: &str,
    keyword_count: usize,
) -> String {
    let mut content = String::new();
    if !abstract_text.trim().is_empty() {
        content.push_str(&format!("Abstract:\n{}\n\n", abstract_text.trim()));
    }
    if !introduction.trim().is_empty() {
        content.push_str(&format!("Introduction:\n{}\n\n", introduction.trim()));
    }

    format!(
        r#"I have content from a scientific paper that I need you to analyze. Please:

1. Summarize the key points in 4-6 sentences
2. Identify the main research gap or problem being addressed
3. Extract the paper's apparent objectives or research questions
4. Generate EXACTLY {keyword_count} important keywords/concepts. Choose only the most critical {keyword_count} terms that best represent the paper.

When generating keywords, please follow these rules:
- Use SINGULAR forms only (e.g., "biomarker" not "biomarkers")
- Use underscores instead of spaces (e.g., "gene_expression")
- Maintain standard capitalization for abbreviations (RNA-Seq, miRNA, DNA)

Title: {title}

{content}Respond in this format:
SUMMARY:
[Your summary here]

RESEARCH GAP/PROBLEM:
[Identified research gap or problem]

OBJECTIVES:
[Research objectives/questions]

KEYWORDS:
[{keyword_count} singular keywords separated by commas]"#,
        title = title.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::{
        KEYWORDS_LABEL, OBJECTIVES_LABEL, RESEARCH_GAP_LABEL, SUMMARY_LABEL,
    };

    #[test]
    fn prompt_names_every_parsed_label() {
        let p = analysis_prompt("T", "A", "I", DEFAULT_KEYWORD_COUNT);
        for label in [SUMMARY_LABEL, RESEARCH_GAP_LABEL, OBJECTIVES_LABEL, KEYWORDS_LABEL] {
            assert!(p.contains(label), "prompt is missing {label}");
        }
    }

    #[test]
    fn prompt_includes_content_and_count() {
        let p = analysis_prompt("Deep Folding", "We fold.", "", 7);
        assert!(p.contains("Title: Deep Folding"));
        assert!(p.contains("Abstract:\nWe fold."));
        assert!(!p.contains("Introduction:"));
        assert!(p.contains("EXACTLY 7 important keywords"));
        assert!(p.contains("SINGULAR forms only"));
    }
}
