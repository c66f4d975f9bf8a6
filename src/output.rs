//! Stage results: what each stage did to each file.
//!
//! A stage never returns `Err` for a single bad paper; it records a
//! [`FileOutcome`] and moves on. The [`StageReport`] is what the CLI prints
//! (or serialises with `--json`) and what the exit status is derived from.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Analyze,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Analyze => "analyze",
            Stage::Render => "render",
        })
    }
}

/// Why a file was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The output exists and overwrite is off.
    OutputExists,
    /// The text file already carries an analysis and overwrite is off.
    AlreadyAnalyzed,
    /// Rendering requires an analysis and the text file has none.
    NoAnalysis,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::OutputExists => "output already exists",
            SkipReason::AlreadyAnalyzed => "analysis already present",
            SkipReason::NoAnalysis => "no analysis to render",
        })
    }
}

/// Result for a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    Skipped(SkipReason),
    Failed(FileError),
}

impl FileStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileStatus::Failed(_))
    }
}

/// One input file as seen by one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// The file written or that would have been written.
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    /// Heuristic misses and other warnings worth showing next to the file.
    pub notes: Vec<String>,
    pub duration_ms: u64,
}

/// Everything one stage invocation did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// LLM prompt tokens (Analyzer only).
    pub input_tokens: usize,
    /// LLM completion tokens (Analyzer only).
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<FileOutcome>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            total: 0,
            written: 0,
            skipped: 0,
            failed: 0,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            outcomes: Vec::new(),
        }
    }

    /// Record an outcome and update the counters.
    pub fn push(&mut self, outcome: FileOutcome) {
        self.total += 1;
        match outcome.status {
            FileStatus::Written => self.written += 1,
            FileStatus::Skipped(_) => self.skipped += 1,
            FileStatus::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// One-line human summary, e.g. `extract: 3 written, 1 skipped, 0 failed`.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} written, {} skipped, {} failed",
            self.stage, self.written, self.skipped, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: FileStatus) -> FileOutcome {
        FileOutcome {
            source: PathBuf::from("a.pdf"),
            output: Some(PathBuf::from("out/a.txt")),
            status,
            notes: vec![],
            duration_ms: 3,
        }
    }

    #[test]
    fn push_updates_counters() {
        let mut report = StageReport::new(Stage::Extract);
        report.push(outcome(FileStatus::Written));
        report.push(outcome(FileStatus::Skipped(SkipReason::OutputExists)));
        report.push(outcome(FileStatus::Failed(FileError::EmptyResponse)));
        assert_eq!(report.total, 3);
        assert_eq!((report.written, report.skipped, report.failed), (1, 1, 1));
        assert!(report.has_failures());
        assert_eq!(report.summary_line(), "extract: 1 written, 1 skipped, 1 failed");
    }

    #[test]
    fn report_serialises_status_tags() {
        let mut report = StageReport::new(Stage::Render);
        report.push(outcome(FileStatus::Skipped(SkipReason::NoAnalysis)));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "render");
        assert_eq!(json["outcomes"][0]["status"]["status"], "skipped");
        assert_eq!(json["outcomes"][0]["status"]["detail"], "no_analysis");
    }
}
