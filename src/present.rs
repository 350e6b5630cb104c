//! Read-only projection of the ledger for display.
//!
//! Nothing here mutates the ledger. A download action is only offered for
//! completed jobs that carry a `download_ref`; error messages are shown
//! verbatim.

use crate::ledger::{ConversionJob, JobId, JobStatus};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusIcon {
    Spinner,
    Success,
    Failure,
}

impl StatusIcon {
    pub fn for_status(status: JobStatus) -> Self {
        match status {
            JobStatus::Processing => StatusIcon::Spinner,
            JobStatus::Completed => StatusIcon::Success,
            JobStatus::Error => StatusIcon::Failure,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            StatusIcon::Spinner => "⏳",
            StatusIcon::Success => "✅",
            StatusIcon::Failure => "❌",
        }
    }
}

/// Display row for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: JobId,
    /// Icon for the first source file's kind.
    pub kind_icon: &'static str,
    /// `source → target`
    pub title: String,
    /// Human size and local creation time.
    pub detail: String,
    pub status: StatusIcon,
    pub download: Option<String>,
    pub error: Option<String>,
}

pub fn view(job: &ConversionJob) -> JobView {
    let download = match job.status {
        JobStatus::Completed => job.download_ref.clone(),
        _ => None,
    };
    let error = match job.status {
        JobStatus::Error => job.error_message.clone(),
        _ => None,
    };

    JobView {
        id: job.id,
        kind_icon: job.source_kind.icon(),
        title: format!("{} → {}", job.source_label, job.target_label),
        detail: format!(
            "{} • {}",
            format_file_size(job.size_bytes),
            job.created_at
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
        ),
        status: StatusIcon::for_status(job.status),
        download,
        error,
    }
}

/// Plain-text listing of `jobs` in the order given.
pub fn render_jobs(jobs: &[ConversionJob]) -> String {
    let mut out = String::new();
    for job in jobs {
        let v = view(job);
        let _ = writeln!(out, "{} {} {}", v.status.symbol(), v.kind_icon, v.title);
        let _ = writeln!(out, "     {}", v.detail);
        if let Some(url) = &v.download {
            let _ = writeln!(out, "     ↓ {url}");
        }
        if let Some(err) = &v.error {
            let _ = writeln!(out, "     ! {err}");
        }
    }
    out
}

/// `0 B`, else base-1024 with up to two decimals (`1536` → `1.5 KB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FileKind;
    use chrono::Utc;

    fn job(status: JobStatus) -> ConversionJob {
        ConversionJob {
            id: JobId::from_raw(1),
            source_label: "a.txt, b.png".into(),
            source_kind: FileKind::Text,
            target_label: "merged.pdf".into(),
            size_bytes: 2048,
            status,
            download_ref: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn completed_job_offers_download() {
        let mut j = job(JobStatus::Completed);
        j.download_ref = Some("https://files.example/merged.pdf".into());
        let v = view(&j);
        assert_eq!(v.status, StatusIcon::Success);
        assert_eq!(v.download.as_deref(), Some("https://files.example/merged.pdf"));
        assert_eq!(v.title, "a.txt, b.png → merged.pdf");
        assert_eq!(v.kind_icon, "📋");
        assert!(v.detail.starts_with("2 KB • "));
    }

    #[test]
    fn icon_uses_recorded_kind() {
        let mut j = job(JobStatus::Processing);
        j.source_label = "scan, page 1.png, notes.txt".into();
        j.source_kind = FileKind::Image;
        assert_eq!(view(&j).kind_icon, FileKind::Image.icon());
    }

    #[test]
    fn no_download_without_ref() {
        let v = view(&job(JobStatus::Completed));
        assert_eq!(v.download, None);
        assert_eq!(view(&job(JobStatus::Processing)).download, None);
    }

    #[test]
    fn error_is_verbatim() {
        let mut j = job(JobStatus::Error);
        j.error_message = Some("Konvertatsiya qilishda xatolik yuz berdi".into());
        let v = view(&j);
        assert_eq!(v.status, StatusIcon::Failure);
        assert_eq!(
            v.error.as_deref(),
            Some("Konvertatsiya qilishda xatolik yuz berdi")
        );
        assert!(render_jobs(&[j]).contains("! Konvertatsiya qilishda xatolik yuz berdi"));
    }

    #[test]
    fn render_lists_every_job() {
        let mut done = job(JobStatus::Completed);
        done.download_ref = Some("https://x/y.pdf".into());
        let pending = job(JobStatus::Processing);
        let text = render_jobs(&[done, pending]);
        assert!(text.contains("✅"));
        assert!(text.contains("⏳"));
        assert!(text.contains("↓ https://x/y.pdf"));
    }
}
