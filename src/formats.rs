//! Supported-format catalogue and file-kind classification.
//!
//! The catalogue is informational: the conversion service is the authority
//! on what it can actually produce. It drives the CLI's `--formats` listing
//! and the picker-style acceptance check.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extensions a file picker accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "txt", "rtf", "odt", "jpg", "jpeg", "png", "webp", "bmp", "xlsx", "xls",
    "pptx", "ppt",
];

/// Source format → target formats it can be converted to.
pub static SUPPORTED_FORMATS: Lazy<BTreeMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: BTreeMap<&'static str, &'static [&'static str]> = BTreeMap::new();
        m.insert("pdf", &["docx", "doc", "txt", "rtf", "odt"]);
        m.insert("docx", &["pdf", "txt", "rtf", "odt"]);
        m.insert("png", &["jpg", "jpeg", "webp", "bmp"]);
        m.insert("jpg", &["png", "webp", "bmp"]);
        m.insert("webp", &["jpg", "jpeg", "png", "bmp"]);
        m
    });

/// Targets for a source extension (case-insensitive, `jpeg` treated as `jpg`).
pub fn targets_for(source_ext: &str) -> Option<&'static [&'static str]> {
    let ext = source_ext.trim_start_matches('.').to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    SUPPORTED_FORMATS.get(ext.as_str()).copied()
}

/// Whether a picker would accept this file name.
pub fn is_accepted(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Coarse file category, used for icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Word,
    Text,
    Image,
    Spreadsheet,
    Presentation,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("docx" | "doc") => FileKind::Word,
            Some("txt") => FileKind::Text,
            Some("jpg" | "jpeg" | "png" | "webp" | "bmp") => FileKind::Image,
            Some("xlsx" | "xls") => FileKind::Spreadsheet,
            Some("pptx" | "ppt") => FileKind::Presentation,
            _ => FileKind::Other,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            FileKind::Pdf => "📄",
            FileKind::Word => "📝",
            FileKind::Text => "📋",
            FileKind::Image => "🖼️",
            FileKind::Spreadsheet => "📊",
            FileKind::Presentation => "📈",
            FileKind::Other => "📁",
        }
    }
}
