//! Error types for the batch-convert library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ConvertError`] (fatal): the caller asked for something that cannot
//!   be done at all (bad configuration, unreadable input file, HTTP client
//!   could not be built). Returned as `Err(ConvertError)` from the public
//!   entry points.
//!
//! * [`LedgerError`] (integrity): the ledger was asked to resolve a job
//!   it does not know, or one that already reached a terminal state. This is
//!   a coordinator/ledger desynchronisation and is surfaced to the caller
//!   rather than swallowed.
//!
//! * [`ServiceError`] (per-job): one exchange with the conversion service
//!   failed. It never escapes the coordinator; it is turned into an `error`
//!   entry in the [`crate::ledger::Ledger`] so the other jobs of the batch
//!   carry on unaffected.

use crate::ledger::{JobId, JobStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Message stored on a failed job when the service gave no reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed";

/// All fatal errors returned by the batch-convert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A staged file must carry a non-empty name.
    #[error("Staged file name must not be empty")]
    EmptyFileName,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Input file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is larger than the caller's limit; it was not read.
    #[error("File '{path}' is {size} bytes, over the {limit}-byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client for the conversion service could not be created.
    #[error("Failed to initialise HTTP client: {0}")]
    HttpClient(String),

    // ── Integrity errors ──────────────────────────────────────────────────
    /// The ledger rejected a resolution.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Ledger integrity failures.
///
/// Returned by [`crate::ledger::Ledger::resolve`]; the ledger is left
/// untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No job with this id was ever created in the ledger.
    #[error("Job {0} is not known to the ledger")]
    UnknownJob(JobId),

    /// The job already left `processing`; terminal states are final.
    #[error("Job {id} is already {status} and cannot be resolved again")]
    AlreadyResolved { id: JobId, status: JobStatus },
}

/// A non-fatal error for a single exchange with the conversion service.
///
/// Converted into a failed job by the coordinator via [`ServiceError::job_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ServiceError {
    /// The request never produced an HTTP response (DNS, refused, reset…).
    #[error("Could not reach the conversion service: {detail}")]
    Transport { detail: String },

    /// The exchange exceeded the configured request timeout.
    #[error("Conversion request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service answered and reported a failure.
    ///
    /// `message` is the service's own reason when it supplied one.
    #[error("Conversion service rejected the request (HTTP {status}): {}", message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The service reported success but the body was unusable.
    #[error("Conversion service returned an unusable response: {detail}")]
    Malformed { detail: String },
}

impl ServiceError {
    /// The message recorded on the failed ledger entry.
    ///
    /// A reason supplied by the service is passed through verbatim; every
    /// other failure collapses to the generic message plus its cause.
    pub fn job_message(&self) -> String {
        match self {
            ServiceError::Rejected {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            ServiceError::Rejected { status, .. } => {
                format!("{GENERIC_FAILURE_MESSAGE} (HTTP {status})")
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_with_reason_is_verbatim() {
        let e = ServiceError::Rejected {
            status: 422,
            message: Some("Unsupported source format".into()),
        };
        assert_eq!(e.job_message(), "Unsupported source format");
        assert!(e.to_string().contains("422"));
    }

    #[test]
    fn rejected_without_reason_falls_back() {
        let e = ServiceError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(e.job_message(), "Conversion failed (HTTP 500)");
    }

    #[test]
    fn blank_reason_counts_as_missing() {
        let e = ServiceError::Rejected {
            status: 400,
            message: Some("   ".into()),
        };
        assert_eq!(e.job_message(), "Conversion failed (HTTP 400)");
    }

    #[test]
    fn transport_message_is_non_empty() {
        let e = ServiceError::Transport {
            detail: "connection refused".into(),
        };
        let msg = e.job_message();
        assert!(msg.contains("connection refused"), "got: {msg}");
    }

    #[test]
    fn ledger_error_display() {
        let e = LedgerError::AlreadyResolved {
            id: JobId::from_raw(7),
            status: JobStatus::Completed,
        };
        let msg = e.to_string();
        assert!(msg.contains("#7"), "got: {msg}");
        assert!(msg.contains("completed"), "got: {msg}");
    }

    #[test]
    fn ledger_error_wraps_into_convert_error() {
        let e: ConvertError = LedgerError::UnknownJob(JobId::from_raw(3)).into();
        assert!(e.to_string().contains("#3"));
    }
}
