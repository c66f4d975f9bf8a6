//! File names → keys.
//!
//! Reference managers export PDFs under a handful of naming conventions
//! (`Author et al. - 2023 - Title.pdf`, `Author_2023_Title.pdf`, …). The
//! citation key (`Author_et_al_2023`) is recovered from whichever convention
//! matches; the file key decides the names of the `.txt` and `.md` outputs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Which key names the stage outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingScheme {
    /// The sanitised PDF file stem: `Smith_2023_DeepLearning.pdf` →
    /// `Smith_2023_DeepLearning.txt`. (default)
    #[default]
    SourceStem,
    /// The citation key: `Smith_2023_DeepLearning.pdf` → `Smith_2023.txt`.
    /// Two PDFs by the same first author in the same year collide.
    CitationKey,
}

/// Names derived from one PDF path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperName {
    /// Stem of the `.txt` and `.md` outputs.
    pub file_key: String,
    pub citation_key: String,
    /// Author as written in the file name, if a convention matched.
    pub filename_author: Option<String>,
}

static RE_AUTHOR_DASH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*-\s*(\d{4})\s*-\s*(.*)$").unwrap());
static RE_AUTHOR_UNDERSCORE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)_(\d{4})_(.*)$").unwrap());
static RE_AUTHOR_SEP_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)[\s_](\d{4})(?:[\s_]|$)").unwrap());
static RE_NON_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());
static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());
static RE_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());
static RE_ET_AL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bet al\b\.?").unwrap());

/// Derive every name for `path` under the given scheme.
pub fn derive_names(path: &Path, scheme: NamingScheme) -> PaperName {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let citation_key = citation_key(&stem);
    let file_key = match scheme {
        NamingScheme::SourceStem => file_key(&stem),
        NamingScheme::CitationKey => file_key(&citation_key),
    };
    PaperName {
        file_key,
        citation_key,
        filename_author: filename_author(&stem),
    }
}

/// Sanitise a stem into a key safe for every file system.
///
/// Runs of characters outside `[A-Za-z0-9_-]` become `_`; leading and
/// trailing `_` are trimmed. An empty result becomes `paper`.
pub fn file_key(stem: &str) -> String {
    let key = RE_NON_KEY.replace_all(stem, "_");
    let key = key.trim_matches('_');
    if key.is_empty() {
        "paper".to_string()
    } else {
        key.to_string()
    }
}

/// Make the file keys of one batch unique.
///
/// Keys are compared case-insensitively, since `Smith_2023` and `smith_2023`
/// are the same file on some file systems. The first file keeps its key;
/// later ones get the first free `_2`, `_3`, … suffix that is not another
/// file's own key. The result depends only on the (sorted) input, so a
/// rerun maps every PDF to the same output again.
///
/// ```
/// use paper2kb::pipeline::naming::dedupe_file_keys;
///
/// let keys = vec!["Smith_2023".to_string(), "Smith_2023".to_string()];
/// assert_eq!(dedupe_file_keys(&keys), vec!["Smith_2023", "Smith_2023_2"]);
/// ```
pub fn dedupe_file_keys(keys: &[String]) -> Vec<String> {
    let own: HashSet<String> = keys.iter().map(|k| k.to_lowercase()).collect();
    let mut taken = HashSet::new();
    keys.iter()
        .map(|key| {
            if taken.insert(key.to_lowercase()) {
                return key.clone();
            }
            (2..)
                .map(|n| format!("{key}_{n}"))
                .find(|candidate| {
                    let lower = candidate.to_lowercase();
                    !own.contains(&lower) && taken.insert(lower)
                })
                .unwrap_or_else(|| key.clone())
        })
        .collect()
}

/// `(author part, year)` of the first naming convention that matches.
fn author_and_year(stem: &str) -> Option<(&str, &str)> {
    [
        &*RE_AUTHOR_DASH_YEAR,
        &*RE_AUTHOR_UNDERSCORE_YEAR,
        &*RE_AUTHOR_SEP_YEAR,
    ]
    .into_iter()
    .filter_map(|re| re.captures(stem))
    .map(|caps| {
        let author = caps.get(1).map_or("", |m| m.as_str());
        let year = caps.get(2).map_or("", |m| m.as_str());
        (author, year)
    })
    .find(|(author, _)| !clean_key_author(author).is_empty())
}

fn clean_key_author(author: &str) -> String {
    let author = author.replace('.', "");
    let author = author.trim().replace(' ', "_");
    let author = RE_NON_WORD.replace_all(&author, "");
    RE_UNDERSCORES
        .replace_all(&author, "_")
        .trim_matches('_')
        .to_string()
}

/// Citation key in the `Author_et_al_YEAR` form.
///
/// ```
/// use paper2kb::pipeline::naming::citation_key;
///
/// assert_eq!(citation_key("Revkov et al. - 2023 - Single cell atlas"), "Revkov_et_al_2023");
/// assert_eq!(citation_key("Smith_2023_DeepLearning"), "Smith_2023");
/// ```
pub fn citation_key(stem: &str) -> String {
    if let Some((author, year)) = author_and_year(stem) {
        return format!("{}_{}", clean_key_author(author), year);
    }
    let fallback = RE_NON_WORD.replace_all(stem, "_");
    let fallback = RE_UNDERSCORES.replace_all(&fallback, "_");
    fallback.trim_matches('_').to_string()
}

/// The author as a human would write it: `Revkov_et_al` → `Revkov et al.`.
pub fn filename_author(stem: &str) -> Option<String> {
    let (author, _) = author_and_year(stem)?;
    let spaced = author.replace('_', " ");
    let spaced = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let author = RE_ET_AL.replace_all(&spaced, "et al.").to_string();
    (!author.is_empty()).then_some(author)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_citation_key_patterns() {
        assert_eq!(
            citation_key("Revkov et al. - 2023 - Single cell atlas"),
            "Revkov_et_al_2023"
        );
        assert_eq!(citation_key("Smith_2023_DeepLearning"), "Smith_2023");
        assert_eq!(citation_key("Smith et al_2021_Title"), "Smith_et_al_2021");
        assert_eq!(citation_key("Doe 2019 notes"), "Doe_2019");
        assert_eq!(citation_key("Doe_2019"), "Doe_2019");
    }

    #[test]
    fn test_citation_key_fallback() {
        assert_eq!(citation_key("my paper (final)"), "my_paper_final");
        assert_eq!(citation_key("2023_Title"), "2023_Title");
    }

    #[test]
    fn test_file_key_sanitises() {
        assert_eq!(file_key("Smith_2023_DeepLearning"), "Smith_2023_DeepLearning");
        assert_eq!(
            file_key("Revkov et al. - 2023 - Atlas"),
            "Revkov_et_al_-_2023_-_Atlas"
        );
        assert_eq!(file_key("  "), "paper");
    }

    #[test]
    fn test_filename_author() {
        assert_eq!(
            filename_author("Smith_2023_DeepLearning").as_deref(),
            Some("Smith")
        );
        assert_eq!(
            filename_author("Revkov_et_al_2023_Atlas").as_deref(),
            Some("Revkov et al.")
        );
        assert_eq!(
            filename_author("Revkov et al. - 2023 - Atlas").as_deref(),
            Some("Revkov et al.")
        );
        assert_eq!(filename_author("untitled scan"), None);
    }

    #[test]
    fn test_derive_names_schemes() {
        let path = PathBuf::from("/papers/Smith_2023_DeepLearning.pdf");
        let default = derive_names(&path, NamingScheme::SourceStem);
        assert_eq!(default.file_key, "Smith_2023_DeepLearning");
        assert_eq!(default.citation_key, "Smith_2023");

        let by_key = derive_names(&path, NamingScheme::CitationKey);
        assert_eq!(by_key.file_key, "Smith_2023");
    }

    #[test]
    fn test_dedupe_file_keys() {
        let keys: Vec<String> = ["Smith_2023", "Smith_2023", "smith_2023", "Smith_2023_2", "Doe"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(
            dedupe_file_keys(&keys),
            vec!["Smith_2023", "Smith_2023_3", "smith_2023_4", "Smith_2023_2", "Doe"]
        );
    }

    #[test]
    fn test_separator_variants_share_a_key() {
        assert_eq!(file_key("Smith 2023"), file_key("Smith_2023"));
        let keys = vec![file_key("Smith 2023"), file_key("Smith_2023")];
        assert_eq!(dedupe_file_keys(&keys), vec!["Smith_2023", "Smith_2023_2"]);
    }
}
