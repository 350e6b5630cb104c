//! File staging buffer: the files a user picked but has not submitted yet.
//!
//! The buffer is a plain ordered list. It never deduplicates and never
//! enforces a size or count limit; [`StagingBuffer::oversized`] only reports
//! which entries exceed a caller-chosen limit so the caller can decide.

use crate::error::ConvertError;
use crate::formats::FileKind;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// One user-selected file: an opaque payload plus its display name.
///
/// The payload is reference-counted, so cloning a `StagedFile` (e.g. into a
/// [`crate::request::ConversionRequest`]) never copies the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    name: String,
    payload: Bytes,
}

impl StagedFile {
    /// Create a staged file from a name and its contents.
    ///
    /// # Errors
    /// [`ConvertError::EmptyFileName`] when `name` is empty or whitespace.
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Result<Self, ConvertError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConvertError::EmptyFileName);
        }
        Ok(Self {
            name,
            payload: payload.into(),
        })
    }

    /// Read a file from disk, naming it after the final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = file_name(path)?;
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| io_error(path, e))?;

        debug!("Read {} ({} bytes)", path.display(), payload.len());
        Self::new(name, payload)
    }

    /// Like [`from_path`](Self::from_path), but checks the size on disk first
    /// and never reads a file larger than `limit_bytes`.
    ///
    /// # Errors
    /// [`ConvertError::FileTooLarge`] when the file exceeds `limit_bytes`.
    pub async fn from_path_within(
        path: impl AsRef<Path>,
        limit_bytes: u64,
    ) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?
            .len();
        if size > limit_bytes {
            return Err(ConvertError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: limit_bytes,
            });
        }
        Self::from_path(path).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Lower-cased text after the last `.`, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }
}

impl fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

fn file_name(path: &Path) -> Result<String, ConvertError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(ConvertError::EmptyFileName)
}

fn io_error(path: &Path, e: std::io::Error) -> ConvertError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ConvertError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ConvertError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Ordered list of files waiting for submission.
#[derive(Debug, Clone, Default)]
pub struct StagingBuffer {
    files: Vec<StagedFile>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files to the end of the buffer, duplicates included.
    pub fn add(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        self.files.extend(files);
    }

    pub fn push(&mut self, file: StagedFile) {
        self.files.push(file);
    }

    /// Remove the entry at `index`. Out-of-range indices are a no-op.
    pub fn remove(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Take every staged file, leaving the buffer empty.
    ///
    /// This is the atomic "clear on submission" step used by the coordinator.
    pub fn drain(&mut self) -> Vec<StagedFile> {
        std::mem::take(&mut self.files)
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(StagedFile::size_bytes).sum()
    }

    /// Indices of entries strictly larger than `limit_bytes`.
    pub fn oversized(&self, limit_bytes: u64) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.size_bytes() > limit_bytes)
            .map(|(i, _)| i)
            .collect()
    }
}
