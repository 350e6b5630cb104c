//! Streaming batch API: observe jobs as they resolve.
//!
//! [`Batch::run`](crate::coordinator::Batch::run) waits for the whole batch.
//! [`Batch::into_stream`] instead yields one [`JobUpdate`] per job as soon as
//! its exchange finished and the ledger was resolved, so a UI can refresh
//! row by row. Items arrive in completion order; use the ledger for display
//! order.

use crate::coordinator::{execute_job, Batch};
use crate::error::LedgerError;
use crate::ledger::{JobId, JobStatus};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A job that just reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobUpdate {
    pub id: JobId,
    pub status: JobStatus,
}

/// A boxed stream of per-job resolutions.
pub type JobStream = Pin<Box<dyn Stream<Item = Result<JobUpdate, LedgerError>> + Send>>;

impl Batch {
    /// Turn the batch into a stream of resolutions.
    ///
    /// Nothing is sent until the stream is polled. Dropping the stream early
    /// stops further submissions; jobs not yet sent stay `processing`.
    /// `on_batch_complete` is not fired in this mode.
    pub fn into_stream(self) -> JobStream {
        let Batch {
            jobs,
            service,
            ledger,
            concurrency,
            progress,
        } = self;

        if jobs.is_empty() {
            return Box::pin(stream::empty());
        }

        info!("Streaming batch of {} job(s)", jobs.len());
        if let Some(ref cb) = progress {
            cb.on_batch_start(jobs.len());
        }

        let s = stream::iter(jobs.into_iter().map(move |job| {
            execute_job(Arc::clone(&service), ledger.clone(), progress.clone(), job)
        }))
        .buffer_unordered(concurrency)
        .map(|(id, resolution)| resolution.map(|status| JobUpdate { id, status }));

        Box::pin(s)
    }
}
