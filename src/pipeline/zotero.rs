//! Reference-manager lookup: fetch a stored abstract from the Zotero Web API.
//!
//! Lookups are best effort. Any failure (network, HTTP status, no match) is
//! reported to the Extractor as a miss and never aborts the batch.

use crate::error::PaperKbError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_ZOTERO_BASE_URL: &str = "https://api.zotero.org";
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;
/// Title words sent as the search query.
const QUERY_WORDS: usize = 5;
const RESULT_LIMIT: usize = 5;

/// Whether the library belongs to a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    fn path_segment(self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

impl FromStr for LibraryType {
    type Err = PaperKbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(LibraryType::User),
            "group" | "groups" => Ok(LibraryType::Group),
            other => Err(PaperKbError::InvalidConfig(format!(
                "ZOTERO_LIBRARY_TYPE must be 'user' or 'group', got '{other}'"
            ))),
        }
    }
}

/// Credentials and endpoint for a Zotero library.
#[derive(Clone)]
pub struct ZoteroConfig {
    pub library_id: String,
    pub api_key: String,
    pub library_type: LibraryType,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for ZoteroConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoteroConfig")
            .field("library_id", &self.library_id)
            .field("api_key", &"<redacted>")
            .field("library_type", &self.library_type)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ZoteroConfig {
    pub fn new(library_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            library_id: library_id.into(),
            api_key: api_key.into(),
            library_type: LibraryType::default(),
            base_url: DEFAULT_ZOTERO_BASE_URL.to_string(),
            timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }

    pub fn library_type(mut self, library_type: LibraryType) -> Self {
        self.library_type = library_type;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Build a config from optional credential values.
    ///
    /// Both absent → `Ok(None)` (lookups disabled). Exactly one present →
    /// [`PaperKbError::MissingCredential`]. Empty strings count as absent.
    pub fn from_parts(
        library_id: Option<String>,
        api_key: Option<String>,
        library_type: Option<&str>,
    ) -> Result<Option<Self>, PaperKbError> {
        let library_id = library_id.filter(|v| !v.trim().is_empty());
        let api_key = api_key.filter(|v| !v.trim().is_empty());

        let (library_id, api_key) = match (library_id, api_key) {
            (None, None) => return Ok(None),
            (Some(id), Some(key)) => (id, key),
            (Some(_), None) => {
                return Err(PaperKbError::MissingCredential {
                    variable: "ZOTERO_API_KEY".into(),
                    hint: "ZOTERO_LIBRARY_ID is set but the API key is not. Set both or neither."
                        .into(),
                })
            }
            (None, Some(_)) => {
                return Err(PaperKbError::MissingCredential {
                    variable: "ZOTERO_LIBRARY_ID".into(),
                    hint: "ZOTERO_API_KEY is set but the library ID is not. Set both or neither."
                        .into(),
                })
            }
        };

        let library_type = match library_type.filter(|t| !t.trim().is_empty()) {
            Some(t) => t.parse()?,
            None => LibraryType::default(),
        };

        Ok(Some(
            Self::new(library_id.trim(), api_key.trim()).library_type(library_type),
        ))
    }

    /// Read `ZOTERO_LIBRARY_ID`, `ZOTERO_API_KEY` and `ZOTERO_LIBRARY_TYPE`.
    pub fn from_env() -> Result<Option<Self>, PaperKbError> {
        let library_type = std::env::var("ZOTERO_LIBRARY_TYPE").ok();
        Self::from_parts(
            std::env::var("ZOTERO_LIBRARY_ID").ok(),
            std::env::var("ZOTERO_API_KEY").ok(),
            library_type.as_deref(),
        )
    }

    fn items_url(&self) -> String {
        format!(
            "{}/{}/{}/items",
            self.base_url,
            self.library_type.path_segment(),
            self.library_id
        )
    }
}

/// A reference-manager entry chosen for a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    pub title: String,
    pub date: String,
    /// May be empty when the entry has no stored abstract.
    pub abstract_note: String,
}

/// A bibliography service that can find a paper by title.
pub trait ReferenceLookup: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Find the best entry for `title`, preferring entries dated `year`.
    fn lookup<'a>(
        &'a self,
        title: &'a str,
        year: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ReferenceMatch>, String>> + Send + 'a>>;
}

/// [`ReferenceLookup`] against the Zotero Web API v3.
pub struct ZoteroClient {
    config: ZoteroConfig,
    client: reqwest::Client,
}

impl ZoteroClient {
    pub fn new(config: ZoteroConfig) -> Result<Self, PaperKbError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaperKbError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Probe the library with a one-item request.
    pub async fn check_connection(&self) -> Result<(), String> {
        self.get_items(&[("limit", "1".to_string())]).await?;
        info!(
            "Connected to Zotero library {} ({:?})",
            self.config.library_id, self.config.library_type
        );
        Ok(())
    }

    async fn get_items(&self, query: &[(&str, String)]) -> Result<Vec<serde_json::Value>, String> {
        let resp = self
            .client
            .get(self.config.items_url())
            .header("Zotero-API-Key", &self.config.api_key)
            .header("Zotero-API-Version", "3")
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("timed out after {}s", self.config.timeout_secs)
                } else {
                    e.to_string()
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 403 {
            return Err("HTTP 403 (check ZOTERO_API_KEY and library access)".into());
        }
        if status.as_u16() == 429 {
            return Err("Rate limited (429)".into());
        }
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let data: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
        Ok(data.as_array().cloned().unwrap_or_default())
    }
}

impl ReferenceLookup for ZoteroClient {
    fn name(&self) -> &str {
        "Zotero"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        year: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ReferenceMatch>, String>> + Send + 'a>> {
        Box::pin(async move {
            let terms = search_terms(title);
            if terms.is_empty() {
                return Ok(None);
            }
            debug!("Searching Zotero for: {}", terms);
            let items = self
                .get_items(&[("q", terms), ("limit", RESULT_LIMIT.to_string())])
                .await?;
            Ok(select_match(&items, title, year))
        })
    }
}

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Lowercased title with punctuation replaced by spaces and whitespace
/// collapsed.
fn normalize_title(title: &str) -> String {
    RE_NON_WORD
        .replace_all(title, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The search query for a title: its first few words, punctuation removed.
pub fn search_terms(title: &str) -> String {
    RE_NON_WORD
        .replace_all(title, " ")
        .split_whitespace()
        .take(QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pick the entry for `title` among search results.
///
/// Attachments and notes are ignored. An entry matches when either
/// normalised title contains the other and, if `year` is known, the year
/// appears in the entry's date. Without a match the first result is taken.
pub fn select_match(
    items: &[serde_json::Value],
    title: &str,
    year: Option<&str>,
) -> Option<ReferenceMatch> {
    let wanted = normalize_title(title);
    let year = year.map(str::trim).filter(|y| !y.is_empty());

    let candidates: Vec<ReferenceMatch> = items
        .iter()
        .filter(|item| {
            !matches!(
                item["data"]["itemType"].as_str(),
                Some("attachment") | Some("note")
            )
        })
        .map(|item| {
            let data = &item["data"];
            ReferenceMatch {
                title: data["title"].as_str().unwrap_or("").to_string(),
                date: data["date"].as_str().unwrap_or("").to_string(),
                abstract_note: data["abstractNote"].as_str().unwrap_or("").trim().to_string(),
            }
        })
        .collect();

    let matched = candidates.iter().find(|c| {
        let found = normalize_title(&c.title);
        let titles_overlap =
            !found.is_empty() && (found.contains(&wanted) || wanted.contains(&found));
        let year_ok = year.is_none_or(|y| c.date.contains(y));
        titles_overlap && year_ok
    });

    match matched {
        Some(m) => {
            info!("Found match in Zotero: {}", m.title);
            Some(m.clone())
        }
        None => {
            let first = candidates.into_iter().next()?;
            info!("No exact match, using closest result: {}", first.title);
            Some(first)
        }
    }
}
