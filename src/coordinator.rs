//! Submission coordinator: staged files → ledger jobs → service exchanges.
//!
//! ## Lifecycle of one submission
//!
//! ```text
//! submit()  (synchronous)
//!  ├─ 1. drain the staging buffer
//!  ├─ 2. build requests for the configured policy
//!  └─ 3. create one `processing` ledger job per request
//! Batch::run()  (async)
//!  ├─ 4. one exchange per job, up to `concurrency` in flight
//!  └─ 5. resolve each job from its own exchange's outcome
//! ```
//!
//! Steps 1–3 never suspend, so by the time [`Coordinator::submit`] returns
//! every job is visible in the ledger and the buffer is empty. All exchanges
//! of a batch are driven from the single task awaiting the [`Batch`]; they
//! interleave at their network awaits but never run in parallel, and each one
//! only ever touches its own ledger entry.
//!
//! There is no retry and no cancellation. A failed exchange marks its job
//! `error` for good; other jobs of the batch carry on.

use crate::config::ConverterConfig;
use crate::error::{ConvertError, LedgerError};
use crate::ledger::{JobId, JobOutcome, JobStatus, Ledger};
use crate::progress::ProgressCallback;
use crate::request::{build_requests, ConversionRequest};
use crate::service::{ConversionService, HttpConversionService};
use crate::staging::StagingBuffer;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives submissions for one ledger.
pub struct Coordinator {
    service: Arc<dyn ConversionService>,
    ledger: Ledger,
    config: ConverterConfig,
}

impl Coordinator {
    pub fn new(service: Arc<dyn ConversionService>, ledger: Ledger, config: ConverterConfig) -> Self {
        Self {
            service,
            ledger,
            config,
        }
    }

    /// Coordinator backed by [`HttpConversionService`] and a fresh ledger.
    pub fn with_http(config: ConverterConfig) -> Result<Self, ConvertError> {
        let service = HttpConversionService::new(&config)?;
        Ok(Self::new(Arc::new(service), Ledger::new(), config))
    }

    /// Handle to the ledger this coordinator writes to.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Drain `staging` and create a `processing` job for every request.
    ///
    /// No network traffic happens until the returned [`Batch`] is run. An
    /// empty buffer yields an empty batch and leaves the ledger untouched.
    pub fn submit(&self, staging: &mut StagingBuffer) -> Batch {
        let files = staging.drain();
        let requests = build_requests(&files, self.config.policy, &self.config.target_format);

        if requests.is_empty() {
            debug!("Nothing staged; submission is a no-op");
        } else {
            info!(
                "Submitting {} file(s) as {} job(s) [{} → {}]",
                files.len(),
                requests.len(),
                self.config.policy,
                self.config.target_format
            );
        }

        let jobs = requests
            .into_iter()
            .map(|request| PendingJob {
                id: self.ledger.create_job(&request),
                request,
            })
            .collect();

        Batch {
            jobs,
            service: Arc::clone(&self.service),
            ledger: self.ledger.clone(),
            concurrency: self.config.concurrency.max(1),
            progress: self.config.progress_callback.clone(),
        }
    }

    /// [`submit`](Self::submit) then [`Batch::run`].
    ///
    /// # Errors
    /// Only [`ConvertError::Ledger`]: service failures end up in the ledger.
    pub async fn convert(&self, staging: &mut StagingBuffer) -> Result<BatchReport, ConvertError> {
        let batch = self.submit(staging);
        Ok(batch.run().await?)
    }
}

pub(crate) struct PendingJob {
    pub(crate) id: JobId,
    pub(crate) request: ConversionRequest,
}

/// Jobs created by one [`Coordinator::submit`] call, not yet sent.
#[must_use = "jobs stay processing until the batch is run"]
pub struct Batch {
    pub(crate) jobs: Vec<PendingJob>,
    pub(crate) service: Arc<dyn ConversionService>,
    pub(crate) ledger: Ledger,
    pub(crate) concurrency: usize,
    pub(crate) progress: Option<ProgressCallback>,
}

impl Batch {
    /// Ids of the batch's jobs, in creation order.
    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Submit every job once and resolve it in the ledger.
    ///
    /// # Errors
    /// The first [`LedgerError`] hit while resolving. It is returned only
    /// after every other job of the batch was resolved.
    pub async fn run(self) -> Result<BatchReport, LedgerError> {
        let job_ids = self.job_ids();
        if job_ids.is_empty() {
            return Ok(BatchReport::default());
        }

        let start = Instant::now();
        let total = job_ids.len();
        let progress = self.progress.clone();
        if let Some(ref cb) = progress {
            cb.on_batch_start(total);
        }

        let resolutions: Vec<Result<JobStatus, LedgerError>> = stream::iter(
            self.jobs.into_iter().map(|job| {
                execute_job(
                    Arc::clone(&self.service),
                    self.ledger.clone(),
                    self.progress.clone(),
                    job,
                )
            }),
        )
        .buffer_unordered(self.concurrency)
        .map(|(_, resolution)| resolution)
        .collect()
        .await;

        let mut report = BatchReport {
            job_ids,
            ..BatchReport::default()
        };
        let mut first_integrity_error = None;
        for resolution in resolutions {
            match resolution {
                Ok(JobStatus::Completed) => report.completed += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    first_integrity_error.get_or_insert(e);
                }
            }
        }

        info!(
            "Batch finished: {}/{} completed, {} failed, {}ms",
            report.completed,
            total,
            report.failed,
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = progress {
            cb.on_batch_complete(total, report.completed);
        }

        match first_integrity_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Summary of one finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Jobs of the batch, in creation order.
    pub job_ids: Vec<JobId>,
    pub completed: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.job_ids.len()
    }

    /// True for a non-empty batch where every job completed.
    pub fn all_succeeded(&self) -> bool {
        !self.job_ids.is_empty() && self.completed == self.job_ids.len()
    }
}

/// One exchange for one job, then its single resolution.
///
/// Never fails on service errors; those become `JobOutcome::Failed`.
pub(crate) async fn execute_job(
    service: Arc<dyn ConversionService>,
    ledger: Ledger,
    progress: Option<ProgressCallback>,
    job: PendingJob,
) -> (JobId, Result<JobStatus, LedgerError>) {
    let PendingJob { id, request } = job;
    let label = request.source_label();

    if let Some(ref cb) = progress {
        cb.on_job_start(id, &label);
    }

    let outcome = match service.convert(&request).await {
        Ok(receipt) => JobOutcome::Completed {
            download_ref: receipt.download_ref,
            output_name: receipt.output_name,
        },
        Err(e) => {
            warn!("Job {} ({}) failed: {}", id, label, e);
            JobOutcome::Failed {
                message: e.job_message(),
            }
        }
    };

    let status = match &outcome {
        JobOutcome::Completed { .. } => JobStatus::Completed,
        JobOutcome::Failed { .. } => JobStatus::Error,
    };

    if let Err(e) = ledger.resolve(id, outcome) {
        error!("Ledger out of sync for job {}: {}", id, e);
        return (id, Err(e));
    }

    if let Some(ref cb) = progress {
        if let Some(job) = ledger.get(id) {
            match status {
                JobStatus::Completed => cb.on_job_complete(
                    id,
                    &label,
                    job.download_ref.as_deref().unwrap_or_default(),
                ),
                _ => cb.on_job_error(
                    id,
                    &label,
                    job.error_message.as_deref().unwrap_or_default(),
                ),
            }
        }
    }

    (id, Ok(status))
}
