//! LLM interaction: resolve a backend and run one bounded completion.
//!
//! The Analyzer talks to a [`CompletionBackend`], not to `edgequake-llm`
//! directly, so tests can script answers without network access. The
//! production backend, [`ProviderBackend`], wraps any
//! `edgequake_llm::LLMProvider`.
//!
//! There is no retry loop: a failed call marks the file as failed and a later
//! run picks it up again (files that already carry an analysis are skipped).

use crate::config::AnalyzeConfig;
use crate::error::{FileError, PaperKbError};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

/// One request to the model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// The model's answer and its token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Something that can answer a system + user prompt pair.
pub trait CompletionBackend: Send + Sync {
    /// `provider/model`, for log lines.
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>>;
}

/// [`CompletionBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>> {
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(request.system.as_str()),
                ChatMessage::user(request.prompt.as_str()),
            ];
            let options = CompletionOptions {
                temperature: Some(request.temperature),
                max_tokens: Some(request.max_tokens),
                ..Default::default()
            };
            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| e.to_string())?;
            Ok(Completion {
                content: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

/// Run one completion with a timeout.
///
/// A transport error, an elapsed timeout, and a blank answer are the three
/// per-file failures of the Analyzer.
pub async fn run_completion(
    backend: &dyn CompletionBackend,
    request: &CompletionRequest,
    timeout_secs: u64,
) -> Result<Completion, FileError> {
    let start = Instant::now();
    let completion = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        backend.complete(request),
    )
    .await
    .map_err(|_| FileError::Timeout { secs: timeout_secs })?
    .map_err(|detail| FileError::LlmFailed { detail })?;

    debug!(
        "{}: {} input tokens, {} output tokens, {:?}",
        backend.name(),
        completion.input_tokens,
        completion.output_tokens,
        start.elapsed()
    );

    if completion.content.trim().is_empty() {
        return Err(FileError::EmptyResponse);
    }
    Ok(completion)
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn CompletionBackend>, PaperKbError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PaperKbError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderBackend::new(
        provider,
        format!("{provider_name}/{model}"),
    )))
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the completion backend, from most-specific to least-specific.
///
/// 1. **Injected backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name` + `config.model`).
/// 3. **`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`**, when both are set.
/// 4. **`ANTHROPIC_API_KEY`** → Anthropic, default model
///    [`DEFAULT_ANTHROPIC_MODEL`].
/// 5. **`OPENAI_API_KEY`** → OpenAI, default model [`DEFAULT_OPENAI_MODEL`].
/// 6. **`ProviderFactory::from_env()`** for anything else edgequake-llm
///    can detect.
pub fn resolve_backend(config: &AnalyzeConfig) -> Result<Arc<dyn CompletionBackend>, PaperKbError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(match name.as_str() {
            "anthropic" => DEFAULT_ANTHROPIC_MODEL,
            _ => DEFAULT_OPENAI_MODEL,
        });
        return create_provider(name, model);
    }

    if let (Some(provider), Some(model)) = (
        env_non_empty("EDGEQUAKE_LLM_PROVIDER"),
        env_non_empty("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&provider, &model);
    }

    if env_non_empty("ANTHROPIC_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL);
        return create_provider("anthropic", model);
    }

    if env_non_empty("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PaperKbError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(ProviderBackend::new(llm_provider, "auto")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Result<&'static str, &'static str>);

    impl CompletionBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>> {
            let result = self.0;
            Box::pin(async move {
                result
                    .map(|content| Completion {
                        content: content.to_string(),
                        input_tokens: 10,
                        output_tokens: 5,
                    })
                    .map_err(str::to_string)
            })
        }
    }

    struct Hanging;

    impl CompletionBackend for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>> {
            Box::pin(std::future::pending())
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".into(),
            prompt: "prompt".into(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn run_completion_ok() {
        let c = run_completion(&Scripted(Ok("SUMMARY: x")), &request(), 5)
            .await
            .unwrap();
        assert_eq!(c.content, "SUMMARY: x");
        assert_eq!(c.input_tokens, 10);
    }

    #[tokio::test]
    async fn run_completion_maps_errors() {
        let err = run_completion(&Scripted(Err("HTTP 500")), &request(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::LlmFailed { ref detail } if detail == "HTTP 500"));

        let err = run_completion(&Scripted(Ok("   ")), &request(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::EmptyResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn run_completion_times_out() {
        let err = run_completion(&Hanging, &request(), 120).await.unwrap_err();
        assert!(matches!(err, FileError::Timeout { secs: 120 }));
    }

    #[test]
    fn injected_backend_wins() {
        let backend: Arc<dyn CompletionBackend> = Arc::new(Scripted(Ok("x")));
        let config = AnalyzeConfig::builder()
            .backend(Arc::clone(&backend))
            .provider_name("does-not-exist")
            .build()
            .unwrap();
        let resolved = resolve_backend(&config).unwrap();
        assert_eq!(resolved.name(), "scripted");
    }

    #[test]
    fn early_resolution_pins_the_backend() {
        let backend: Arc<dyn CompletionBackend> = Arc::new(Scripted(Ok("x")));
        let config = AnalyzeConfig::builder()
            .backend(Arc::clone(&backend))
            .build()
            .unwrap()
            .with_resolved_backend()
            .unwrap();
        let pinned = config.backend.as_ref().unwrap();
        assert!(Arc::ptr_eq(pinned, &backend));
        assert!(Arc::ptr_eq(&resolve_backend(&config).unwrap(), &backend));
    }
}
