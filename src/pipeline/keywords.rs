//! Keyword normalisation: one tag per concept, singular, hashtag-safe.
//!
//! The model is asked for singular keywords joined by underscores, but it
//! does not always comply. Every keyword is therefore normalised here before
//! it reaches the text file or the markdown front-matter, so a knowledge base
//! built from many runs shares one spelling per tag (`#dataset`, never also
//! `#datasets`).

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that end in `s` but are already singular (or have no singular).
const SINGULAR_EXCEPTIONS: &[&str] = &[
    "alias", "atlas", "bias", "canvas", "chaos", "corpus", "data", "diabetes", "gas", "lens",
    "means", "news", "series", "species", "status", "virus",
];

/// Split a model's keyword answer into raw entries.
///
/// Accepts comma, semicolon and newline separated lists, bulleted or
/// numbered lists, and stray `#`, brackets or quotes around each entry.
pub fn parse_keyword_list(text: &str) -> Vec<String> {
    static RE_LIST_MARKER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+").unwrap());

    text.split([',', ';', '\n'])
        .map(|entry| {
            let entry = entry.trim();
            let entry = RE_LIST_MARKER.replace(entry, "");
            entry
                .trim_matches(|c: char| {
                    matches!(c, '#' | '[' | ']' | '"' | '\'' | '`' | '.' | '*') || c.is_whitespace()
                })
                .to_string()
        })
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Normalise a list of keywords: underscores for spaces, singular form,
/// empty entries and duplicates (case-insensitive) dropped, order kept.
///
/// ```
/// use paper2kb::pipeline::keywords::normalize_keywords;
///
/// let tags = normalize_keywords(["papers", "dataset"]);
/// assert_eq!(tags, vec!["paper", "dataset"]);
/// ```
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for keyword in keywords {
        if let Some(normalized) = normalize_keyword(keyword.as_ref()) {
            if seen.insert(normalized.to_lowercase()) {
                out.push(normalized);
            }
        }
    }
    out
}

/// Normalise a single keyword. Returns `None` when nothing is left.
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let joined = raw
        .trim()
        .trim_start_matches('#')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        return None;
    }

    // Only the head noun (the last underscore-separated word) is inflected:
    // `neural_networks` → `neural_network`.
    let (prefix, last) = match joined.rfind('_') {
        Some(idx) => (&joined[..=idx], &joined[idx + 1..]),
        None => ("", joined.as_str()),
    };
    let singular = singularize(last);
    if singular.is_empty() {
        return None;
    }
    Some(format!("{prefix}{singular}"))
}

/// Best-effort English singularisation of one word.
///
/// Rules, first match wins:
/// - words of three letters or fewer, known exceptions and `-ics` fields
///   (`genomics`) are kept
/// - `-ies` → `-y` (`studies` → `study`)
/// - `-yses`/`-eses` → `-ysis`/`-esis` (`analyses` → `analysis`)
/// - `-sses`, `-xes`, `-zes`, `-ches`, `-shes` lose `-es` (`boxes` → `box`)
/// - a final `-s` is dropped unless the word ends in `ss`, `is`, `us`, `os`
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if word.chars().count() <= 3
        || SINGULAR_EXCEPTIONS.contains(&lower.as_str())
        || lower.ends_with("ics")
    {
        return word.to_string();
    }

    if lower.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if lower.ends_with("yses") || lower.ends_with("eses") {
        return format!("{}is", &word[..word.len() - 2]);
    }
    if ["sses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if lower.ends_with('s') && !["ss", "is", "us", "os"].iter().any(|s| lower.ends_with(s)) {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
