//! Job ledger: the ordered record of every conversion job in a session.
//!
//! The ledger is the single source of truth. Jobs are appended in
//! `processing` state before their network exchange starts and then resolved
//! exactly once to `completed` or `error`. Nothing else ever mutates a job.
//!
//! [`Ledger`] is a cheap-to-clone handle; every clone observes the same jobs.
//! The lock is only held for the duration of a synchronous mutation or
//! snapshot and never across an `.await`.

use crate::error::LedgerError;
use crate::formats::FileKind;
use crate::request::ConversionRequest;
use crate::staging::StagedFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Ledger-unique job identifier, allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submitted, outcome not yet known.
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        })
    }
}

/// One tracked conversion.
///
/// `download_ref` is only set when `status == Completed`, `error_message`
/// only when `status == Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: JobId,
    pub source_label: String,
    /// Kind of the first source file.
    pub source_kind: FileKind,
    pub target_label: String,
    pub size_bytes: u64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How a `processing` job ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed {
        download_ref: String,
        /// Authoritative output name from the service; replaces the default.
        output_name: Option<String>,
    },
    Failed {
        message: String,
    },
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    /// Oldest first; `list()` reverses.
    jobs: Vec<ConversionJob>,
    index: HashMap<JobId, usize>,
}

/// Shared, ordered collection of conversion jobs.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Mutations below have no fallible steps once started, so a
        // poisoned lock still guards consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a new `processing` job for `request` and return its id.
    pub fn create_job(&self, request: &ConversionRequest) -> JobId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = JobId(state.next_id);

        let job = ConversionJob {
            id,
            source_label: request.source_label(),
            source_kind: request
                .sources()
                .first()
                .map_or(FileKind::Other, StagedFile::kind),
            target_label: request.target_label().to_string(),
            size_bytes: request.size_bytes(),
            status: JobStatus::Processing,
            download_ref: None,
            error_message: None,
            created_at: Utc::now(),
        };

        debug!("Created job {}: {} → {}", id, job.source_label, job.target_label);
        let position = state.jobs.len();
        state.jobs.push(job);
        state.index.insert(id, position);
        id
    }

    /// Move job `id` from `processing` to its terminal state.
    ///
    /// # Errors
    /// - [`LedgerError::UnknownJob`] if `id` was never created here
    /// - [`LedgerError::AlreadyResolved`] if the job is already terminal
    ///
    /// On error no job is modified.
    pub fn resolve(&self, id: JobId, outcome: JobOutcome) -> Result<(), LedgerError> {
        let mut state = self.lock();
        let position = *state.index.get(&id).ok_or(LedgerError::UnknownJob(id))?;
        let job = &mut state.jobs[position];

        if job.status.is_terminal() {
            return Err(LedgerError::AlreadyResolved {
                id,
                status: job.status,
            });
        }

        match outcome {
            JobOutcome::Completed {
                download_ref,
                output_name,
            } => {
                job.status = JobStatus::Completed;
                job.download_ref = Some(download_ref);
                if let Some(name) = output_name.filter(|n| !n.trim().is_empty()) {
                    job.target_label = name;
                }
            }
            JobOutcome::Failed { message } => {
                job.status = JobStatus::Error;
                job.error_message = Some(message);
            }
        }

        debug!("Resolved job {} as {}", id, job.status);
        Ok(())
    }

    /// Snapshot of every job, most recent first.
    pub fn list(&self) -> Vec<ConversionJob> {
        self.lock().jobs.iter().rev().cloned().collect()
    }

    pub fn get(&self, id: JobId) -> Option<ConversionJob> {
        let state = self.lock();
        state.index.get(&id).map(|&i| state.jobs[i].clone())
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    pub fn counts(&self) -> LedgerCounts {
        self.lock()
            .jobs
            .iter()
            .fold(LedgerCounts::default(), |mut c, job| {
                match job.status {
                    JobStatus::Processing => c.processing += 1,
                    JobStatus::Completed => c.completed += 1,
                    JobStatus::Error => c.error += 1,
                }
                c
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build_requests, SubmissionPolicy};

    fn requests(names: &[&str], policy: SubmissionPolicy) -> Vec<ConversionRequest> {
        let files: Vec<StagedFile> = names
            .iter()
            .map(|n| StagedFile::new(*n, vec![1u8; 10]).unwrap())
            .collect();
        build_requests(&files, policy, "pdf")
    }

    fn completed(url: &str) -> JobOutcome {
        JobOutcome::Completed {
            download_ref: url.to_string(),
            output_name: None,
        }
    }

    #[test]
    fn new_jobs_are_processing_and_newest_first() {
        let ledger = Ledger::new();
        let reqs = requests(&["a.txt", "b.png", "c.doc"], SubmissionPolicy::PerFile);
        let ids: Vec<JobId> = reqs.iter().map(|r| ledger.create_job(r)).collect();

        let listed = ledger.list();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|j| j.status == JobStatus::Processing));
        assert!(listed.iter().all(|j| j.download_ref.is_none()));
        let listed_ids: Vec<JobId> = listed.iter().map(|j| j.id).collect();
        assert_eq!(listed_ids, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(listed[2].source_label, "a.txt");
        assert_eq!(listed[2].target_label, "a.pdf");
        assert_eq!(listed[2].size_bytes, 10);
    }

    #[test]
    fn source_kind_comes_from_first_file_not_label() {
        let ledger = Ledger::new();
        let merged = requests(&["notes, v2.docx", "scan.png"], SubmissionPolicy::MergeAll);
        let id = ledger.create_job(&merged[0]);

        let job = ledger.get(id).unwrap();
        assert_eq!(job.source_label, "notes, v2.docx, scan.png");
        assert_eq!(job.source_kind, FileKind::Word);
    }

    #[test]
    fn ids_are_unique() {
        let ledger = Ledger::new();
        let reqs = requests(&["a.txt"; 50], SubmissionPolicy::PerFile);
        let mut ids: Vec<JobId> = reqs.iter().map(|r| ledger.create_job(r)).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn resolve_completed_sets_download_and_name() {
        let ledger = Ledger::new();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);

        ledger
            .resolve(
                id,
                JobOutcome::Completed {
                    download_ref: "https://files.example/a.pdf".into(),
                    output_name: Some("a-converted.pdf".into()),
                },
            )
            .unwrap();

        let job = ledger.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.download_ref.as_deref(), Some("https://files.example/a.pdf"));
        assert_eq!(job.target_label, "a-converted.pdf");
        assert!(job.error_message.is_none());
    }

    #[test]
    fn blank_output_name_keeps_default() {
        let ledger = Ledger::new();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);
        ledger
            .resolve(
                id,
                JobOutcome::Completed {
                    download_ref: "u".into(),
                    output_name: Some(" ".into()),
                },
            )
            .unwrap();
        assert_eq!(ledger.get(id).unwrap().target_label, "a.pdf");
    }

    #[test]
    fn resolve_failed_sets_message() {
        let ledger = Ledger::new();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);
        ledger
            .resolve(
                id,
                JobOutcome::Failed {
                    message: "boom".into(),
                },
            )
            .unwrap();

        let job = ledger.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert!(job.download_ref.is_none());
    }

    #[test]
    fn terminal_jobs_cannot_be_resolved_again() {
        let ledger = Ledger::new();
        let reqs = requests(&["a.txt", "b.png"], SubmissionPolicy::PerFile);
        let a = ledger.create_job(&reqs[0]);
        let b = ledger.create_job(&reqs[1]);
        ledger.resolve(a, completed("u1")).unwrap();

        let before = ledger.list();
        let err = ledger
            .resolve(
                a,
                JobOutcome::Failed {
                    message: "late".into(),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyResolved {
                id: a,
                status: JobStatus::Completed
            }
        );
        assert_eq!(ledger.list(), before);
        assert_eq!(ledger.get(b).unwrap().status, JobStatus::Processing);
    }

    #[test]
    fn unknown_job_is_rejected_without_side_effects() {
        let ledger = Ledger::new();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);
        let before = ledger.list();

        let ghost = JobId::from_raw(999);
        assert_eq!(
            ledger.resolve(ghost, completed("u")),
            Err(LedgerError::UnknownJob(ghost))
        );
        assert_eq!(ledger.list(), before);
        assert_eq!(ledger.get(id).unwrap().status, JobStatus::Processing);
    }

    #[test]
    fn list_is_idempotent() {
        let ledger = Ledger::new();
        for r in requests(&["a.txt", "b.png"], SubmissionPolicy::PerFile) {
            ledger.create_job(&r);
        }
        let first = ledger.list();
        for _ in 0..5 {
            assert_eq!(ledger.list(), first);
        }
    }

    #[test]
    fn clones_share_state() {
        let ledger = Ledger::new();
        let observer = ledger.clone();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);
        assert_eq!(observer.len(), 1);
        ledger.resolve(id, completed("u")).unwrap();
        assert_eq!(observer.get(id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn counts_by_status() {
        let ledger = Ledger::new();
        let reqs = requests(&["a", "b", "c"], SubmissionPolicy::PerFile);
        let ids: Vec<_> = reqs.iter().map(|r| ledger.create_job(r)).collect();
        ledger.resolve(ids[0], completed("u")).unwrap();
        ledger
            .resolve(
                ids[1],
                JobOutcome::Failed {
                    message: "x".into(),
                },
            )
            .unwrap();

        assert_eq!(
            ledger.counts(),
            LedgerCounts {
                processing: 1,
                completed: 1,
                error: 1
            }
        );
    }

    #[test]
    fn job_serialises_with_lowercase_status() {
        let ledger = Ledger::new();
        let id = ledger.create_job(&requests(&["a.txt"], SubmissionPolicy::PerFile)[0]);
        let json = serde_json::to_value(ledger.get(id).unwrap()).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["id"], 1);
        assert!(json.get("download_ref").is_none());
    }
}
