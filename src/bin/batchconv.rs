//! CLI binary for batch-convert.
//!
//! A thin shim over the library crate that stages files from disk, submits
//! them as one batch and prints the resulting ledger.

use anyhow::{Context, Result};
use batch_convert::config::DEFAULT_ENDPOINT;
use batch_convert::formats::{self, SUPPORTED_FORMATS};
use batch_convert::{
    format_file_size, render_jobs, ConvertError, Coordinator, ConverterConfig, JobId, ProgressCallback,
    StagedFile, StagingBuffer, SubmissionPolicy, SubmissionProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// resolved job. Jobs may resolve in any order.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-job wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<JobId, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} jobs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn start_times(&self) -> MutexGuard<'_, HashMap<JobId, Instant>> {
        self.start_times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn elapsed_secs(&self, id: JobId) -> f64 {
        self.start_times()
            .remove(&id)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SubmissionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_jobs: usize) {
        self.bar.set_length(total_jobs as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Submitting {total_jobs} job(s)…"))
        ));
    }

    fn on_job_start(&self, id: JobId, label: &str) {
        self.start_times().insert(id, Instant::now());
        self.bar.set_message(label.to_string());
    }

    fn on_job_complete(&self, id: JobId, label: &str, _download_ref: &str) {
        let secs = self.elapsed_secs(id);
        self.bar.println(format!(
            "  {} {:<5} {}  {}",
            green("✓"),
            id,
            label,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_job_error(&self, id: JobId, label: &str, error: &str) {
        let secs = self.elapsed_secs(id);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one log line per job.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<5} {}  {}  {}",
            red("✗"),
            id,
            label,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_jobs: usize, succeeded: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} job(s) converted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} job(s) converted  ({} failed)",
                if failed == total_jobs {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two documents to PDF, one job each
  batchconv report.docx notes.txt

  # Merge scanned pages into a single PDF
  batchconv --merge scan-1.png scan-2.png scan-3.png

  # Convert to DOCX against a custom service
  batchconv --to docx --endpoint https://convert.example.com/api/v1/convert paper.pdf

  # Machine-readable ledger
  batchconv --json a.txt b.png > jobs.json

  # List the supported conversions
  batchconv --formats

ENVIRONMENT VARIABLES:
  BATCHCONV_ENDPOINT       Conversion service URL
  BATCHCONV_FORMAT         Target format (default: pdf)
  BATCHCONV_MERGE          Merge all files into one output
  BATCHCONV_CONCURRENCY    Requests in flight at once
  BATCHCONV_TIMEOUT        Per-request timeout in seconds (default: none)
  RUST_LOG                 Override log filter (e.g. batch_convert=debug)
"#;

/// Convert files through a remote conversion service and track each job.
#[derive(clap::Parser, Debug)]
#[command(
    name = "batchconv",
    version,
    about = "Submit files to a conversion service and track every job",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to convert.
    #[arg(required_unless_present = "formats")]
    files: Vec<PathBuf>,

    /// Target format (pdf, docx, txt, png, …).
    #[arg(short = 't', long = "to", env = "BATCHCONV_FORMAT", default_value = "pdf")]
    target_format: String,

    /// Merge all files into one output instead of converting each file.
    #[arg(long, env = "BATCHCONV_MERGE")]
    merge: bool,

    /// Conversion service endpoint.
    #[arg(long, env = "BATCHCONV_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Number of requests in flight at once.
    #[arg(short, long, env = "BATCHCONV_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Per-request timeout in seconds. Without it a hung request waits forever.
    #[arg(long, env = "BATCHCONV_TIMEOUT")]
    timeout: Option<u64>,

    /// Skip files larger than this many MiB.
    #[arg(long, env = "BATCHCONV_MAX_FILE_SIZE_MB", default_value_t = 10)]
    max_file_size_mb: u64,

    /// Print the ledger as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BATCHCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Print the supported conversions and exit.
    #[arg(long)]
    formats: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = <Cli as clap::Parser>::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs when it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.formats {
        print_formats();
        return Ok(ExitCode::SUCCESS);
    }

    // ── Stage files ──────────────────────────────────────────────────────
    let max_file_bytes = cli.max_file_size_mb.saturating_mul(1024 * 1024);
    let mut staging = StagingBuffer::new();
    for path in &cli.files {
        let file = match StagedFile::from_path_within(path, max_file_bytes).await {
            Ok(file) => file,
            Err(ConvertError::FileTooLarge { size, limit, .. }) => {
                eprintln!(
                    "{} skipping {} ({} exceeds the {} limit)",
                    cyan("⚠"),
                    path.display(),
                    format_file_size(size),
                    format_file_size(limit)
                );
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stage {}", path.display()))
            }
        };

        if !formats::is_accepted(file.name()) {
            warn!("{} has an unusual extension; the service may reject it", file.name());
        }
        staging.push(file);
    }

    if staging.is_empty() {
        if !cli.quiet {
            eprintln!("Nothing to convert.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SubmissionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, max_file_bytes, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let coordinator = Coordinator::with_http(config).context("Failed to set up the service client")?;
    let report = coordinator
        .convert(&mut staging)
        .await
        .context("Job ledger is inconsistent")?;

    let jobs = coordinator.ledger().list();
    if cli.json {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "report": report,
            "jobs": jobs,
        }))
        .context("Failed to serialise ledger")?;
        println!("{json}");
    } else if !cli.quiet {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(render_jobs(&jobs).as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Converted {}/{} job(s), {} failed",
            report.completed,
            report.total(),
            report.failed
        );
    }

    Ok(if report.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ConverterConfig`.
fn build_config(
    cli: &Cli,
    max_file_bytes: u64,
    progress: Option<ProgressCallback>,
) -> Result<ConverterConfig> {
    let policy = if cli.merge {
        SubmissionPolicy::MergeAll
    } else {
        SubmissionPolicy::PerFile
    };

    let mut builder = ConverterConfig::builder()
        .endpoint(&cli.endpoint)
        .target_format(&cli.target_format)
        .policy(policy)
        .concurrency(cli.concurrency)
        .max_file_bytes(max_file_bytes);

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_formats() {
    println!("{}", bold("Supported conversions"));
    for (source, targets) in SUPPORTED_FORMATS.iter() {
        println!(
            "  {} {:<5} → {}",
            formats::FileKind::from_name(&format!("x.{source}")).icon(),
            source.to_uppercase(),
            targets.join(", ")
        );
    }
    println!();
    println!(
        "{} {}",
        dim("Accepted inputs:"),
        formats::ACCEPTED_EXTENSIONS.join(" ")
    );
}
