//! Analyzer: one LLM call per text file, result appended as an analysis
//! block.
//!
//! Files are processed sequentially with a fixed pause between API calls.
//! A failed call leaves its text file untouched, so rerunning the stage
//! picks up exactly the files that are still missing an analysis.

use crate::config::AnalyzeConfig;
use crate::error::{FileError, PaperKbError};
use crate::output::{FileOutcome, FileStatus, SkipReason, Stage, StageReport};
use crate::pipeline::analysis::Analysis;
use crate::pipeline::llm::{self, CompletionBackend, CompletionRequest};
use crate::pipeline::{input, store};
use crate::progress::{display_name, StageTracker};
use crate::prompts::{analysis_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::record::{self, PaperRecord};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Analyze every text file under `input` in place.
///
/// `input` is a single `.txt` file or a directory of them.
///
/// # Errors
/// Returns `Err(PaperKbError)` only for fatal errors: input path problems,
/// or no LLM provider could be configured. Per-file failures (API errors,
/// timeouts, empty answers) are recorded in the returned [`StageReport`].
pub async fn analyze(
    input: impl AsRef<Path>,
    config: &AnalyzeConfig,
) -> Result<StageReport, PaperKbError> {
    let input = input.as_ref();
    info!("Analyzing {}", input.display());

    let inputs = input::resolve_inputs(input, "txt", "text")?;
    let backend = llm::resolve_backend(config)?;
    info!("Using LLM backend {}", backend.name());

    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let mut session = Session {
        backend: backend.as_ref(),
        system_prompt,
        config,
        api_calls: 0,
    };

    let mut tracker = StageTracker::start(
        Stage::Analyze,
        inputs.files.len(),
        config.progress_callback.as_ref(),
    );
    for (index, path) in inputs.files.iter().enumerate() {
        tracker.file_start(index, path);
        let (outcome, usage) = session.analyze_file(path).await;
        if let Some((input_tokens, output_tokens)) = usage {
            tracker.add_tokens(input_tokens, output_tokens);
        }
        tracker.file_done(index, outcome);
    }

    Ok(tracker.finish())
}

/// State carried across files of one run.
struct Session<'a> {
    backend: &'a dyn CompletionBackend,
    system_prompt: &'a str,
    config: &'a AnalyzeConfig,
    api_calls: usize,
}

impl Session<'_> {
    async fn analyze_file(&mut self, path: &Path) -> (FileOutcome, Option<(usize, usize)>) {
        let start = Instant::now();
        let mut notes = Vec::new();
        let mut usage = None;

        let status = match self.analyze_to(path, &mut notes, &mut usage).await {
            Ok(status) => status,
            Err(e) => FileStatus::Failed(e),
        };

        let outcome = FileOutcome {
            source: path.to_path_buf(),
            output: Some(path.to_path_buf()),
            status,
            notes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (outcome, usage)
    }

    async fn analyze_to(
        &mut self,
        path: &Path,
        notes: &mut Vec<String>,
        usage: &mut Option<(usize, usize)>,
    ) -> Result<FileStatus, FileError> {
        let text = store::read_text(path).await?;
        if !self.config.overwrite && record::has_analysis(&text) {
            return Ok(FileStatus::Skipped(SkipReason::AlreadyAnalyzed));
        }

        let paper = PaperRecord::parse(&text);
        let analysis = if paper.has_content() {
            let analysis = self.request_analysis(&paper, usage).await?;
            let missing = analysis.missing_fields();
            if !missing.is_empty() {
                warn!(
                    "{}: response missing {}",
                    display_name(path),
                    missing.join(", ")
                );
                notes.push(format!("missing from response: {}", missing.join(", ")));
            }
            analysis
        } else {
            warn!(
                "{} has neither abstract nor introduction; writing an empty analysis",
                display_name(path)
            );
            notes.push("no content to analyze".to_string());
            Analysis::default()
        };

        store::write_atomic(path, &record::with_analysis(&text, &analysis)).await?;
        Ok(FileStatus::Written)
    }

    async fn request_analysis(
        &mut self,
        paper: &PaperRecord,
        usage: &mut Option<(usize, usize)>,
    ) -> Result<Analysis, FileError> {
        if self.api_calls > 0 && self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }
        self.api_calls += 1;

        let request = CompletionRequest {
            system: self.system_prompt.to_string(),
            prompt: analysis_prompt(
                &paper.title,
                &paper.abstract_text,
                &paper.introduction,
                self.config.keyword_count,
            ),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let completion =
            llm::run_completion(self.backend, &request, self.config.api_timeout_secs).await?;
        *usage = Some((completion.input_tokens, completion.output_tokens));

        let analysis = Analysis::parse(&completion.content);
        if analysis.is_empty() {
            return Err(FileError::EmptyResponse);
        }
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::Completion;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CompletionBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                Ok(Completion {
                    content: "SUMMARY: Short.\nKEYWORDS: cells".to_string(),
                    input_tokens: 10,
                    output_tokens: 5,
                })
            })
        }
    }

    #[tokio::test]
    async fn empty_record_gets_placeholder_without_api_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, PaperRecord::default().to_text()).unwrap();

        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let config = AnalyzeConfig::builder()
            .backend(backend.clone())
            .request_delay_ms(0)
            .build()
            .unwrap();
        let report = analyze(&path, &config).await.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(record::has_analysis(&text));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_calls_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt"] {
            let record = PaperRecord {
                abstract_text: "Something.".into(),
                ..PaperRecord::default()
            };
            std::fs::write(dir.path().join(name), record.to_text()).unwrap();
        }

        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let config = AnalyzeConfig::builder()
            .backend(backend.clone())
            .request_delay_ms(5_000)
            .build()
            .unwrap();

        let start = tokio::time::Instant::now();
        let report = analyze(dir.path(), &config).await.unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!((report.input_tokens, report.output_tokens), (20, 10));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(5_000));
        assert!(waited < Duration::from_millis(10_000));
    }
}
