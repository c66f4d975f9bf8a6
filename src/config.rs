//! Configuration types for the three pipeline stages.
//!
//! Each stage is controlled through one config struct built via its builder:
//! [`ExtractConfig`], [`AnalyzeConfig`] and [`RenderConfig`]. Callers set only
//! what they care about and rely on the documented defaults for the rest.
//! Collaborators that talk to the outside world (PDF reader, reference
//! manager, LLM backend) are injectable so the stages can run offline.

use crate::error::PaperKbError;
use crate::pipeline::llm::CompletionBackend;
use crate::pipeline::naming::NamingScheme;
use crate::pipeline::pdf::DocumentReader;
use crate::pipeline::sections::SectionHeuristics;
use crate::pipeline::zotero::{ReferenceLookup, ZoteroConfig};
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_KEYWORD_COUNT;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// ── Extract ──────────────────────────────────────────────────────────────

/// Configuration for the Extractor.
///
/// # Example
/// ```rust
/// use paper2kb::ExtractConfig;
///
/// let config = ExtractConfig::builder()
///     .overwrite(true)
///     .max_pages(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, 4);
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Replace existing text files. Default: false.
    pub overwrite: bool,

    /// How output files are named. Default: [`NamingScheme::SourceStem`].
    pub naming: NamingScheme,

    /// Pages read from each PDF. Default: 8.
    ///
    /// Abstracts and introductions live on the first pages; reading the
    /// whole of a 60-page thesis only slows the run down.
    pub max_pages: usize,

    /// Abstract and introduction boundary heuristics.
    pub heuristics: SectionHeuristics,

    /// Zotero credentials. `None` disables the reference-manager lookup
    /// unless `lookup` is injected.
    pub zotero: Option<ZoteroConfig>,

    /// Use the abstract printed in the PDF when the reference manager has
    /// none. Default: true.
    pub pdf_abstract_fallback: bool,

    /// Custom PDF reader. If None, pdfium is bound at start-up.
    pub reader: Option<Arc<dyn DocumentReader>>,

    /// Explicit path to libpdfium (otherwise `PDFIUM_LIB_PATH` or the
    /// system library).
    pub pdfium_library: Option<PathBuf>,

    /// Pre-constructed reference lookup. Takes precedence over `zotero`.
    pub lookup: Option<Arc<dyn ReferenceLookup>>,

    /// Optional per-file progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            naming: NamingScheme::default(),
            max_pages: 8,
            heuristics: SectionHeuristics::default(),
            zotero: None,
            pdf_abstract_fallback: true,
            reader: None,
            pdfium_library: None,
            lookup: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("overwrite", &self.overwrite)
            .field("naming", &self.naming)
            .field("max_pages", &self.max_pages)
            .field("heuristics", &self.heuristics)
            .field("zotero", &self.zotero)
            .field("pdf_abstract_fallback", &self.pdf_abstract_fallback)
            .field("reader", &self.reader.as_ref().map(|_| "<dyn DocumentReader>"))
            .field("pdfium_library", &self.pdfium_library)
            .field("lookup", &self.lookup.as_ref().map(|_| "<dyn ReferenceLookup>"))
            .finish()
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn naming(mut self, scheme: NamingScheme) -> Self {
        self.config.naming = scheme;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn heuristics(mut self, heuristics: SectionHeuristics) -> Self {
        self.config.heuristics = heuristics;
        self
    }

    pub fn zotero(mut self, zotero: ZoteroConfig) -> Self {
        self.config.zotero = Some(zotero);
        self
    }

    pub fn pdf_abstract_fallback(mut self, v: bool) -> Self {
        self.config.pdf_abstract_fallback = v;
        self
    }

    pub fn reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.config.reader = Some(reader);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn ReferenceLookup>) -> Self {
        self.config.lookup = Some(lookup);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, PaperKbError> {
        if self.config.max_pages == 0 {
            return Err(PaperKbError::InvalidConfig(
                "max_pages must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Analyze ──────────────────────────────────────────────────────────────

/// Configuration for the Analyzer.
///
/// # Example
/// ```rust
/// use paper2kb::AnalyzeConfig;
///
/// let config = AnalyzeConfig::builder()
///     .provider_name("anthropic")
///     .model("claude-sonnet-4-20250514")
///     .request_delay_ms(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.keyword_count, 5);
/// ```
#[derive(Clone)]
pub struct AnalyzeConfig {
    /// Replace an existing analysis block. Default: false.
    pub overwrite: bool,

    /// LLM model identifier, e.g. "claude-sonnet-4-20250514", "gpt-4.1-mini".
    /// If None, the resolved provider's default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per paper. Default: 1024.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Pause between consecutive API calls, in milliseconds. Default: 1000.
    ///
    /// Keeps a large batch under provider rate limits without a retry loop.
    pub request_delay_ms: u64,

    /// Keywords requested per paper. Default: 5.
    pub keyword_count: usize,

    /// Optional per-file progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            model: None,
            provider_name: None,
            backend: None,
            system_prompt: None,
            temperature: 0.2,
            max_tokens: 1024,
            api_timeout_secs: 120,
            request_delay_ms: 1000,
            keyword_count: DEFAULT_KEYWORD_COUNT,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeConfig")
            .field("overwrite", &self.overwrite)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("keyword_count", &self.keyword_count)
            .finish()
    }
}

impl AnalyzeConfig {
    pub fn builder() -> AnalyzeConfigBuilder {
        AnalyzeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the LLM backend now and pin it in the config.
    ///
    /// [`crate::analyze`] otherwise resolves it when it starts, which in a
    /// multi-stage run is only after extraction has finished.
    ///
    /// # Errors
    /// [`PaperKbError::ProviderNotConfigured`] when no provider can be built.
    pub fn with_resolved_backend(mut self) -> Result<Self, PaperKbError> {
        self.backend = Some(crate::pipeline::llm::resolve_backend(&self)?);
        Ok(self)
    }
}

/// Builder for [`AnalyzeConfig`].
#[derive(Debug)]
pub struct AnalyzeConfigBuilder {
    config: AnalyzeConfig,
}

impl AnalyzeConfigBuilder {
    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn request_delay_ms(mut self, ms: u64) -> Self {
        self.config.request_delay_ms = ms;
        self
    }

    pub fn keyword_count(mut self, n: usize) -> Self {
        self.config.keyword_count = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzeConfig, PaperKbError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PaperKbError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(PaperKbError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.keyword_count == 0 {
            return Err(PaperKbError::InvalidConfig(
                "keyword_count must be ≥ 1".into(),
            ));
        }
        if c.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(PaperKbError::InvalidConfig(
                "system prompt is empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Render ───────────────────────────────────────────────────────────────

/// Configuration for the Renderer.
#[derive(Clone, Default)]
pub struct RenderConfig {
    /// Replace existing markdown files. Default: false.
    pub overwrite: bool,

    /// Skip text files without an analysis block instead of rendering them
    /// with empty analysis sections. Default: false.
    pub require_analysis: bool,

    /// Optional per-file progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("overwrite", &self.overwrite)
            .field("require_analysis", &self.require_analysis)
            .finish()
    }
}

impl RenderConfig {
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn require_analysis(mut self, v: bool) -> Self {
        self.config.require_analysis = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<RenderConfig, PaperKbError> {
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_defaults() {
        let c = ExtractConfig::default();
        assert!(!c.overwrite);
        assert_eq!(c.max_pages, 8);
        assert_eq!(c.naming, NamingScheme::SourceStem);
        assert!(c.pdf_abstract_fallback);
        assert!(c.zotero.is_none());
    }

    #[test]
    fn extract_rejects_zero_pages() {
        let err = ExtractConfig::builder().max_pages(0).build().unwrap_err();
        assert!(matches!(err, PaperKbError::InvalidConfig(_)));
    }

    #[test]
    fn analyze_defaults() {
        let c = AnalyzeConfig::default();
        assert_eq!(c.temperature, 0.2);
        assert_eq!(c.max_tokens, 1024);
        assert_eq!(c.api_timeout_secs, 120);
        assert_eq!(c.request_delay_ms, 1000);
        assert_eq!(c.keyword_count, 5);
    }

    #[test]
    fn analyze_builder_validates() {
        assert!(AnalyzeConfig::builder().keyword_count(0).build().is_err());
        assert!(AnalyzeConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(AnalyzeConfig::builder().system_prompt("  ").build().is_err());
        let c = AnalyzeConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_hides_injected_objects() {
        let dbg = format!("{:?}", ExtractConfig::default());
        assert!(dbg.contains("max_pages: 8"));
        assert!(dbg.contains("reader: None"));
    }
}
