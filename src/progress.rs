//! Progress-callback trait for per-file stage events.
//!
//! Inject an [`Arc<dyn StageProgressCallback>`] via the `progress_callback`
//! method of any stage config builder to receive events as the stage walks
//! its input files. The CLI uses it to drive an `indicatif` progress bar; a
//! library caller can forward events to a channel, a log, or nothing at all.
//!
//! # Example
//!
//! ```rust
//! use paper2kb::{ExtractConfig, FileOutcome, StageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_file_done(&self, index: usize, total: usize, outcome: &FileOutcome) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index + 1, total, outcome.source.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//!
//! let config = ExtractConfig::builder()
//!     .progress_callback(counter as Arc<dyn StageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{FileOutcome, FileStatus, Stage, StageReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Called by a stage as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed one at a time, but the trait is
/// `Send + Sync` so implementations can be shared with other tasks.
pub trait StageProgressCallback: Send + Sync {
    /// Called once, after the input files are collected.
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called before a file is processed. `index` is 0-based.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called after a file is written, skipped or failed.
    fn on_file_done(&self, index: usize, total: usize, outcome: &FileOutcome) {
        let _ = (index, total, outcome);
    }

    /// Called once after every file has been attempted.
    fn on_stage_complete(&self, report: &StageReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the stage configs.
pub type ProgressCallback = Arc<dyn StageProgressCallback>;

/// Bookkeeping shared by the three stage loops: fires callbacks, logs each
/// outcome and accumulates the report.
pub(crate) struct StageTracker<'a> {
    report: StageReport,
    callback: Option<&'a ProgressCallback>,
    total: usize,
    start: Instant,
}

impl<'a> StageTracker<'a> {
    pub(crate) fn start(stage: Stage, total: usize, callback: Option<&'a ProgressCallback>) -> Self {
        info!("{}: {} file(s) to process", stage, total);
        if let Some(cb) = callback {
            cb.on_stage_start(stage, total);
        }
        Self {
            report: StageReport::new(stage),
            callback,
            total,
            start: Instant::now(),
        }
    }

    pub(crate) fn file_start(&self, index: usize, path: &Path) {
        info!(
            "Processing file {}/{}: {}",
            index + 1,
            self.total,
            display_name(path)
        );
        if let Some(cb) = self.callback {
            cb.on_file_start(index, self.total, path);
        }
    }

    pub(crate) fn file_done(&mut self, index: usize, outcome: FileOutcome) {
        let name = display_name(&outcome.source);
        match &outcome.status {
            FileStatus::Written => match &outcome.output {
                Some(out) => info!("{}: wrote {}", name, out.display()),
                None => info!("{}: done", name),
            },
            FileStatus::Skipped(reason) => info!("Skipping {} - {}", name, reason),
            FileStatus::Failed(e) => error!("{}: {}", name, e),
        }
        if let Some(cb) = self.callback {
            cb.on_file_done(index, self.total, &outcome);
        }
        self.report.push(outcome);
    }

    pub(crate) fn add_tokens(&mut self, input: usize, output: usize) {
        self.report.input_tokens += input;
        self.report.output_tokens += output;
    }

    pub(crate) fn finish(mut self) -> StageReport {
        self.report.duration_ms = self.start.elapsed().as_millis() as u64;
        info!("{}", self.report.summary_line());
        if let Some(cb) = self.callback {
            cb.on_stage_complete(&self.report);
        }
        self.report
    }
}

/// File name for log lines.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FileStatus;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        dones: AtomicUsize,
        completed_written: AtomicUsize,
    }

    impl StageProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_file_start(&self, _index: usize, _total: usize, _path: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_done(&self, _index: usize, _total: usize, _outcome: &FileOutcome) {
            self.dones.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, report: &StageReport) {
            self.completed_written.store(report.written, Ordering::SeqCst);
        }
    }

    fn outcome() -> FileOutcome {
        FileOutcome {
            source: PathBuf::from("a.txt"),
            output: None,
            status: FileStatus::Written,
            notes: vec![],
            duration_ms: 0,
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Analyze, 2);
        cb.on_file_start(0, 2, Path::new("a.txt"));
        cb.on_file_done(0, 2, &outcome());
        cb.on_stage_complete(&StageReport::new(Stage::Analyze));
    }

    #[test]
    fn tracker_accumulates_report() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        let mut tracker = StageTracker::start(Stage::Analyze, 1, Some(&cb));
        tracker.file_start(0, Path::new("a.txt"));
        tracker.file_done(0, outcome());
        tracker.add_tokens(100, 20);
        let report = tracker.finish();
        assert_eq!(report.written, 1);
        assert_eq!((report.input_tokens, report.output_tokens), (100, 20));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            started_total: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            dones: AtomicUsize::new(0),
            completed_written: AtomicUsize::new(0),
        };

        tracker.on_stage_start(Stage::Render, 2);
        let mut report = StageReport::new(Stage::Render);
        for i in 0..2 {
            tracker.on_file_start(i, 2, Path::new("a.txt"));
            let o = outcome();
            tracker.on_file_done(i, 2, &o);
            report.push(o);
        }
        tracker.on_stage_complete(&report);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.dones.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completed_written.load(Ordering::SeqCst), 2);
    }
}
