//! CLI binary for paper2kb.
//!
//! A thin shim over the library crate that maps CLI flags onto the stage
//! configs and prints the stage reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paper2kb::pipeline::sections::SectionHeuristics;
use paper2kb::{
    analyze, extract, render, AnalyzeConfig, ExtractConfig, FileOutcome, FileStatus,
    NamingScheme, ProgressCallback, RenderConfig, Stage, StageProgressCallback, StageReport,
    ZoteroConfig,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per stage plus a log line per file.
struct CliProgressCallback {
    /// Replaced at every stage start; `run` drives three stages in a row.
    bar: Mutex<Option<ProgressBar>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(ref bar) = *self.bar.lock().unwrap() {
            f(bar);
        }
    }
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix(stage.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{stage}: {total} file(s)"))
        ));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.with_bar(|bar| bar.set_message(name));
    }

    fn on_file_done(&self, index: usize, total: usize, outcome: &FileOutcome) {
        let name = outcome
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let secs = dim(&format!("{:.1}s", outcome.duration_ms as f64 / 1000.0));

        let line = match &outcome.status {
            FileStatus::Written => {
                let notes = if outcome.notes.is_empty() {
                    String::new()
                } else {
                    yellow(&format!("  ({})", outcome.notes.join("; ")))
                };
                format!(
                    "  {} {:>3}/{:<3}  {}  {}{}",
                    green("✓"),
                    index + 1,
                    total,
                    name,
                    secs,
                    notes
                )
            }
            FileStatus::Skipped(reason) => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                dim("–"),
                index + 1,
                total,
                name,
                dim(&reason.to_string())
            ),
            FileStatus::Failed(e) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                // Keep one line per file.
                let msg = e.to_string().replace('\n', " ");
                let msg = if msg.chars().count() > 80 {
                    format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
                } else {
                    msg
                };
                format!(
                    "  {} {:>3}/{:<3}  {}  {}  {}",
                    red("✗"),
                    index + 1,
                    total,
                    name,
                    red(&msg),
                    secs
                )
            }
        };

        self.with_bar(|bar| {
            bar.println(line);
            bar.inc(1);
        });
    }

    fn on_stage_complete(&self, report: &StageReport) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        let mark = if report.failed == 0 {
            green("✔")
        } else if report.written == 0 && report.skipped == 0 {
            red("✘")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{} {}  {}",
            mark,
            bold(&report.summary_line()),
            dim(&format!("{}ms", report.duration_ms))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole pipeline over a folder of PDFs
  paper2kb run papers/ text/ notes/

  # Stage by stage
  paper2kb extract papers/ text/
  paper2kb analyze text/
  paper2kb render text/ notes/

  # Redo the analysis of one paper with another model
  paper2kb analyze text/Smith_2023_DeepLearning.txt --overwrite \
      --provider openai --model gpt-4.1

  # Machine-readable stage report
  paper2kb --json extract papers/ text/ > report.json

ENVIRONMENT VARIABLES (a .env file in the working directory is loaded):
  ZOTERO_LIBRARY_ID       Zotero library ID (abstract lookup; optional)
  ZOTERO_API_KEY          Zotero API key (set both or neither)
  ZOTERO_LIBRARY_TYPE     user (default) or group
  ANTHROPIC_API_KEY       Anthropic API key (default model claude-sonnet-4-20250514)
  OPENAI_API_KEY          OpenAI API key (default model gpt-4.1-mini)
  EDGEQUAKE_LLM_PROVIDER  Provider name, used together with EDGEQUAKE_MODEL
  EDGEQUAKE_MODEL         Model ID, used together with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to libpdfium
  RUST_LOG                Log filter, overrides -v / -q

OUTPUT:
  extract  <text_dir>/<key>.txt   header, ABSTRACT:, INTRODUCTION:
  analyze  same file, ANALYSIS: block appended or replaced
  render   <markdown_dir>/<key>.md   YAML front-matter + H1 sections
"#;

/// Turn PDF research papers into knowledge-base Markdown notes.
#[derive(Parser, Debug)]
#[command(
    name = "paper2kb",
    version,
    about = "Turn PDF research papers into knowledge-base Markdown notes",
    long_about = "Extract the abstract and introduction of research papers, analyze them with \
an LLM (summary, research gap, objectives, keywords), and render one Markdown note per paper \
with YAML front-matter.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPER2KB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPER2KB_QUIET")]
    quiet: bool,

    /// Print the stage report(s) as JSON on stdout.
    #[arg(long, global = true, env = "PAPER2KB_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PAPER2KB_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage 1: extract metadata, abstract and introduction from PDFs.
    #[command(alias = "stage1")]
    Extract {
        /// A PDF file or a directory of PDFs.
        input: PathBuf,
        /// Directory for the text files.
        output_dir: PathBuf,
        /// Replace existing text files.
        #[arg(long)]
        overwrite: bool,
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Stage 2: add an LLM analysis to each text file.
    #[command(alias = "stage2")]
    Analyze {
        /// A text file or a directory of text files.
        input: PathBuf,
        /// Replace existing analyses.
        #[arg(long)]
        overwrite: bool,
        #[command(flatten)]
        analyze: AnalyzeArgs,
    },

    /// Stage 3: render text files as Markdown notes.
    #[command(alias = "stage3")]
    Render {
        /// A text file or a directory of text files.
        input: PathBuf,
        /// Directory for the Markdown notes.
        markdown_dir: PathBuf,
        /// Replace existing Markdown files.
        #[arg(long)]
        overwrite: bool,
        #[command(flatten)]
        render: RenderArgs,
    },

    /// All three stages in order.
    Run {
        /// A PDF file or a directory of PDFs.
        input: PathBuf,
        /// Directory for the text files.
        text_dir: PathBuf,
        /// Directory for the Markdown notes.
        markdown_dir: PathBuf,
        /// Replace existing outputs in every stage.
        #[arg(long)]
        overwrite: bool,
        #[command(flatten)]
        extract: ExtractArgs,
        #[command(flatten)]
        analyze: AnalyzeArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Pages read from each PDF.
    #[arg(long, env = "PAPER2KB_MAX_PAGES", default_value_t = 8,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: u64,

    /// How text and Markdown files are named.
    #[arg(long, env = "PAPER2KB_NAMING", value_enum, default_value = "stem")]
    naming: NamingArg,

    /// Regex for the introduction heading.
    #[arg(long, env = "PAPER2KB_INTRO_START_PATTERN")]
    intro_start_pattern: Option<String>,

    /// Regex for the heading that ends the introduction.
    #[arg(long, env = "PAPER2KB_INTRO_END_PATTERN")]
    intro_end_pattern: Option<String>,

    /// Never take the abstract from the PDF text, only from Zotero.
    #[arg(long)]
    no_pdf_abstract: bool,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Zotero library ID.
    #[arg(long, env = "ZOTERO_LIBRARY_ID", hide_env_values = true)]
    zotero_library_id: Option<String>,

    /// Zotero API key.
    #[arg(long, env = "ZOTERO_API_KEY", hide_env_values = true)]
    zotero_api_key: Option<String>,

    /// Zotero library type: user or group.
    #[arg(long, env = "ZOTERO_LIBRARY_TYPE")]
    zotero_library_type: Option<String>,

    /// Skip the Zotero lookup even when credentials are set.
    #[arg(long)]
    no_zotero: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// LLM provider: anthropic, openai, gemini, ollama, …
    #[arg(
        long,
        env = "PAPER2KB_PROVIDER",
        long_help = "LLM provider. Auto-detected from EDGEQUAKE_LLM_PROVIDER/EDGEQUAKE_MODEL, \
          ANTHROPIC_API_KEY or OPENAI_API_KEY if not set."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. claude-sonnet-4-20250514, gpt-4.1-mini).
    #[arg(long, env = "PAPER2KB_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAPER2KB_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per paper.
    #[arg(long, env = "PAPER2KB_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Per-paper LLM call timeout in seconds.
    #[arg(long, env = "PAPER2KB_API_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Pause between API calls in milliseconds.
    #[arg(long, env = "PAPER2KB_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// Keywords requested per paper.
    #[arg(long, env = "PAPER2KB_KEYWORDS", default_value_t = 5)]
    keywords: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PAPER2KB_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Skip text files that have no analysis yet.
    #[arg(long)]
    require_analysis: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    /// Sanitised PDF file name.
    Stem,
    /// Citation key (Author_Year).
    CitationKey,
}

impl From<NamingArg> for NamingScheme {
    fn from(v: NamingArg) -> Self {
        match v {
            NamingArg::Stem => NamingScheme::SourceStem,
            NamingArg::CitationKey => NamingScheme::CitationKey,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so clap's `env` attributes see values from `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // While the progress bar is active it carries the per-file feedback;
    // only warnings and errors are logged next to it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StageProgressCallback>)
    } else {
        None
    };

    let mut reports = Vec::new();
    match &cli.command {
        Command::Extract {
            input,
            output_dir,
            overwrite,
            extract: args,
        } => {
            let config = extract_config(args, *overwrite, progress)?;
            let report = extract(input, output_dir, &config)
                .await
                .context("Extraction failed")?;
            reports.push(report);
        }
        Command::Analyze {
            input,
            overwrite,
            analyze: args,
        } => {
            let config = analyze_config(args, *overwrite, progress).await?;
            let report = analyze(input, &config)
                .await
                .context("Analysis failed")?;
            reports.push(report);
        }
        Command::Render {
            input,
            markdown_dir,
            overwrite,
            render: args,
        } => {
            let config = render_config(args, *overwrite, progress)?;
            let report = render(input, markdown_dir, &config)
                .await
                .context("Rendering failed")?;
            reports.push(report);
        }
        Command::Run {
            input,
            text_dir,
            markdown_dir,
            overwrite,
            extract: extract_args,
            analyze: analyze_args,
            render: render_args,
        } => {
            // Check every stage's configuration, the LLM provider included,
            // before spending any work.
            let extract_cfg = extract_config(extract_args, *overwrite, progress.clone())?;
            let analyze_cfg = analyze_config(analyze_args, *overwrite, progress.clone())
                .await?
                .with_resolved_backend()
                .context("LLM provider setup failed")?;
            let render_cfg = render_config(render_args, *overwrite, progress)?;

            let report = extract(input, text_dir, &extract_cfg)
                .await
                .context("Extraction failed")?;

            // A single PDF carries on with its own text file only.
            let text_input = if input.is_file() {
                single_file_result(&report)?;
                report
                    .outcomes
                    .first()
                    .and_then(|o| o.output.clone())
                    .unwrap_or_else(|| text_dir.clone())
            } else {
                text_dir.clone()
            };
            reports.push(report);

            let report = analyze(&text_input, &analyze_cfg)
                .await
                .context("Analysis failed")?;
            reports.push(report);

            let report = render(&text_input, markdown_dir, &render_cfg)
                .await
                .context("Rendering failed")?;
            reports.push(report);
        }
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])
        } else {
            serde_json::to_string_pretty(&reports)
        }
        .context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        for report in &reports {
            // The progress callback already printed the summary line.
            if !show_progress {
                eprintln!(
                    "{}  {}ms",
                    report.summary_line(),
                    report.duration_ms
                );
            }
            if report.stage == Stage::Analyze && report.input_tokens + report.output_tokens > 0 {
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&report.input_tokens.to_string()),
                    dim(&report.output_tokens.to_string()),
                );
            }
        }
    }

    // ── Exit status ──────────────────────────────────────────────────────
    // In directory mode failures are per file; a single file that fails
    // fails the invocation.
    let single_input = match &cli.command {
        Command::Extract { input, .. }
        | Command::Analyze { input, .. }
        | Command::Render { input, .. }
        | Command::Run { input, .. } => input.is_file(),
    };
    if single_input {
        for report in &reports {
            single_file_result(report)?;
        }
    }

    Ok(())
}

/// `Err` when the only file of a single-file invocation failed.
fn single_file_result(report: &StageReport) -> Result<()> {
    if let Some(FileStatus::Failed(e)) = report.outcomes.first().map(|o| &o.status) {
        anyhow::bail!("{} failed: {}", report.stage, e);
    }
    Ok(())
}

/// Map extract flags to `ExtractConfig`.
fn extract_config(
    args: &ExtractArgs,
    overwrite: bool,
    progress: Option<ProgressCallback>,
) -> Result<ExtractConfig> {
    let mut heuristics = SectionHeuristics::builder();
    if let Some(ref p) = args.intro_start_pattern {
        heuristics = heuristics.intro_start_pattern(p);
    }
    if let Some(ref p) = args.intro_end_pattern {
        heuristics = heuristics.intro_end_pattern(p);
    }
    let heuristics = heuristics
        .build()
        .context("Invalid introduction pattern")?;

    let mut builder = ExtractConfig::builder()
        .overwrite(overwrite)
        .naming(args.naming.into())
        .max_pages(args.max_pages as usize)
        .heuristics(heuristics)
        .pdf_abstract_fallback(!args.no_pdf_abstract);

    if !args.no_zotero {
        let zotero = ZoteroConfig::from_parts(
            args.zotero_library_id.clone(),
            args.zotero_api_key.clone(),
            args.zotero_library_type.as_deref(),
        )
        .context("Invalid Zotero configuration")?;
        if let Some(zotero) = zotero {
            builder = builder.zotero(zotero);
        }
    }
    if let Some(ref path) = args.pdfium_lib {
        builder = builder.pdfium_library(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map analyze flags to `AnalyzeConfig`.
async fn analyze_config(
    args: &AnalyzeArgs,
    overwrite: bool,
    progress: Option<ProgressCallback>,
) -> Result<AnalyzeConfig> {
    let mut builder = AnalyzeConfig::builder()
        .overwrite(overwrite)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .api_timeout_secs(args.timeout)
        .request_delay_ms(args.delay_ms)
        .keyword_count(args.keywords);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map render flags to `RenderConfig`.
fn render_config(
    args: &RenderArgs,
    overwrite: bool,
    progress: Option<ProgressCallback>,
) -> Result<RenderConfig> {
    let mut builder = RenderConfig::builder()
        .overwrite(overwrite)
        .require_analysis(args.require_analysis);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}
