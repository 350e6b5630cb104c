//! # batch-convert
//!
//! Stage files, submit them to a remote conversion service, and track every
//! resulting job until it completes or fails.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Stage     StagingBuffer: add / remove / inspect
//!  ├─ 2. Build     one request per file, or one merged request
//!  ├─ 3. Record    Ledger: one `processing` job per request, newest first
//!  ├─ 4. Submit    one multipart POST per job, concurrent, no retry
//!  ├─ 5. Resolve   each job → `completed` (download URL) or `error` (message)
//!  └─ 6. Present   read-only rows with status icons and download links
//! ```
//!
//! A failure of one per-file job never touches the others. A merged job is
//! all-or-nothing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_convert::{Coordinator, ConverterConfig, StagedFile, StagingBuffer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::builder()
//!         .endpoint("https://convert.example.com/api/v1/convert")
//!         .target_format("pdf")
//!         .build()?;
//!     let coordinator = Coordinator::with_http(config)?;
//!
//!     let mut staging = StagingBuffer::new();
//!     staging.push(StagedFile::from_path("report.docx").await?);
//!
//!     let report = coordinator.convert(&mut staging).await?;
//!     for job in coordinator.ledger().list() {
//!         println!("{} {} {:?}", job.id, job.status, job.download_ref);
//!     }
//!     eprintln!("{}/{} completed", report.completed, report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `batchconv` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod coordinator;
pub mod error;
pub mod formats;
pub mod ledger;
pub mod present;
pub mod progress;
pub mod request;
pub mod service;
pub mod staging;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use coordinator::{Batch, BatchReport, Coordinator};
pub use error::{ConvertError, LedgerError, ServiceError};
pub use formats::FileKind;
pub use ledger::{ConversionJob, JobId, JobOutcome, JobStatus, Ledger, LedgerCounts};
pub use present::{format_file_size, render_jobs, JobView, StatusIcon};
pub use progress::{NoopProgressCallback, ProgressCallback, SubmissionProgressCallback};
pub use request::{build_requests, ConversionRequest, SubmissionPolicy};
pub use service::{ConversionService, HttpConversionService, ServiceReceipt};
pub use staging::{StagedFile, StagingBuffer};
pub use stream::{JobStream, JobUpdate};
