//! Progress-callback trait for per-job submission events.
//!
//! Inject an [`Arc<dyn SubmissionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the coordinator submits and resolves each job.
//!
//! The ledger is always updated *before* the matching completion or error
//! event fires, so a callback that reads the ledger sees the new state.
//!
//! # Example
//!
//! ```rust
//! use batch_convert::{ConverterConfig, JobId, SubmissionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl SubmissionProgressCallback for CountingCallback {
//!     fn on_job_complete(&self, id: JobId, label: &str, _download_ref: &str) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{id} {label} done ({n} so far)");
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::ledger::JobId;
use std::sync::Arc;

/// Called by the coordinator as a batch moves through its lifecycle.
///
/// All methods default to no-ops. In per-file batches completions arrive in
/// whatever order the service answers, not in submission order.
pub trait SubmissionProgressCallback: Send + Sync {
    /// Called once per batch after its jobs were created in the ledger.
    fn on_batch_start(&self, total_jobs: usize) {
        let _ = total_jobs;
    }

    /// Called just before the job's request is sent.
    ///
    /// `label` is the job's source label.
    fn on_job_start(&self, id: JobId, label: &str) {
        let _ = (id, label);
    }

    fn on_job_complete(&self, id: JobId, label: &str, download_ref: &str) {
        let _ = (id, label, download_ref);
    }

    /// `error` is the message stored on the ledger entry.
    fn on_job_error(&self, id: JobId, label: &str, error: &str) {
        let _ = (id, label, error);
    }

    /// Called once after every job of the batch has resolved.
    fn on_batch_complete(&self, total_jobs: usize, succeeded: usize) {
        let _ = (total_jobs, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SubmissionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn SubmissionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        batch_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl SubmissionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_jobs: usize) {
            self.batch_total.store(total_jobs, Ordering::SeqCst);
        }

        fn on_job_start(&self, _id: JobId, _label: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _id: JobId, _label: &str, _download_ref: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_error(&self, _id: JobId, _label: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_jobs: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_job_start(JobId::from_raw(1), "a.txt");
        cb.on_job_complete(JobId::from_raw(1), "a.txt", "https://x/a.pdf");
        cb.on_job_error(JobId::from_raw(2), "b.png", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);

        tracker.on_job_start(JobId::from_raw(1), "a");
        tracker.on_job_complete(JobId::from_raw(1), "a", "u1");
        tracker.on_job_start(JobId::from_raw(2), "b");
        tracker.on_job_complete(JobId::from_raw(2), "b", "u2");
        tracker.on_job_start(JobId::from_raw(3), "c");
        tracker.on_job_error(JobId::from_raw(3), "c", "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(3, 2);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_job_start(JobId::from_raw(1), "a");
    }
}
