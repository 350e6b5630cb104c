//! Conversion request builder: turn staged files into service submissions.
//!
//! Pure and deterministic. The same files, policy and target format always
//! produce the same requests in the same order.

use crate::staging::StagedFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stem of the output name a merged request defaults to.
pub const MERGED_OUTPUT_STEM: &str = "merged";

/// Whether staged files become one job each or a single merged job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionPolicy {
    /// One request (and one job) per staged file. (default)
    #[default]
    PerFile,
    /// Exactly one request bundling every staged file.
    MergeAll,
}

impl fmt::Display for SubmissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionPolicy::PerFile => f.write_str("per-file"),
            SubmissionPolicy::MergeAll => f.write_str("merge-all"),
        }
    }
}

impl FromStr for SubmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-file" | "perfile" | "each" => Ok(SubmissionPolicy::PerFile),
            "merge-all" | "mergeall" | "merge" => Ok(SubmissionPolicy::MergeAll),
            other => Err(format!(
                "unknown submission policy '{other}' (expected per-file or merge-all)"
            )),
        }
    }
}

/// One submission to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    sources: Vec<StagedFile>,
    target_format: String,
    merge: bool,
    target_label: String,
}

impl ConversionRequest {
    pub fn sources(&self) -> &[StagedFile] {
        &self.sources
    }

    pub fn target_format(&self) -> &str {
        &self.target_format
    }

    pub fn merge(&self) -> bool {
        self.merge
    }

    /// Client-side default for the output file name.
    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Source names joined with `", "`.
    pub fn source_label(&self) -> String {
        self.sources
            .iter()
            .map(StagedFile::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn size_bytes(&self) -> u64 {
        self.sources.iter().map(StagedFile::size_bytes).sum()
    }
}

/// Build the requests for `files` under `policy`.
///
/// An empty slice yields no requests; callers treat that as a no-op.
pub fn build_requests(
    files: &[StagedFile],
    policy: SubmissionPolicy,
    target_format: &str,
) -> Vec<ConversionRequest> {
    if files.is_empty() {
        return Vec::new();
    }

    match policy {
        SubmissionPolicy::PerFile => files
            .iter()
            .map(|file| ConversionRequest {
                sources: vec![file.clone()],
                target_format: target_format.to_string(),
                merge: false,
                target_label: default_target_label(file.name(), target_format),
            })
            .collect(),
        SubmissionPolicy::MergeAll => vec![ConversionRequest {
            sources: files.to_vec(),
            target_format: target_format.to_string(),
            merge: true,
            target_label: merged_target_label(target_format),
        }],
    }
}

/// `<basename>.<format>`, where the basename is the text before the first `.`.
///
/// Names starting with a dot (`.env`) keep their whole name as the basename.
pub fn default_target_label(name: &str, target_format: &str) -> String {
    let stem = match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{stem}.{target_format}")
}

pub fn merged_target_label(target_format: &str) -> String {
    format!("{MERGED_OUTPUT_STEM}.{target_format}")
}
