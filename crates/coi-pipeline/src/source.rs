//! Local filesystem document source

use coi_domain::traits::{DocumentSource, Transient};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Largest file read by default (bytes)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Errors that can occur while fetching a document
#[derive(Error, Debug)]
pub enum SourceError {
    /// The file does not exist
    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exceeds the size limit
    #[error("Document {} is {size} bytes, limit is {limit}", .path.display())]
    TooLarge {
        /// File path
        path: PathBuf,
        /// File size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// The file is not UTF-8 text
    #[error("Document {} is not valid UTF-8 text", .0.display())]
    NotText(PathBuf),

    /// The file holds no text
    #[error("Document {} is empty", .0.display())]
    Empty(PathBuf),

    /// Reading the file failed
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        match self {
            SourceError::Io { source, .. } => !matches!(
                source.kind(),
                ErrorKind::PermissionDenied | ErrorKind::InvalidInput | ErrorKind::Unsupported
            ),
            _ => false,
        }
    }
}

/// Reads OCR'd certificate text from files
///
/// Relative sources resolve against the root directory when one is set.
///
/// # Examples
///
/// ```
/// use coi_pipeline::FileSource;
/// use coi_domain::traits::DocumentSource;
///
/// let dir = std::env::temp_dir();
/// std::fs::write(dir.join("coi-doc-example.txt"), "CERTIFICATE OF LIABILITY INSURANCE").unwrap();
///
/// let source = FileSource::new().with_root(&dir);
/// let text = source.fetch("coi-doc-example.txt").unwrap();
/// assert!(text.starts_with("CERTIFICATE"));
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    root: Option<PathBuf>,
    max_bytes: u64,
}

impl Default for FileSource {
    fn default() -> Self {
        Self {
            root: None,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl FileSource {
    /// Source resolving paths against the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative sources against `root`
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Refuse files larger than `max_bytes`
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Path a source string resolves to
    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    type Error = SourceError;

    fn fetch(&self, source: &str) -> Result<String, Self::Error> {
        let path = self.resolve(source);
        let io_error = |source: std::io::Error| {
            if source.kind() == ErrorKind::NotFound {
                SourceError::NotFound(path.clone())
            } else {
                SourceError::Io {
                    path: path.clone(),
                    source,
                }
            }
        };

        let size = fs::metadata(&path).map_err(io_error)?.len();
        if size > self.max_bytes {
            return Err(SourceError::TooLarge {
                path: path.clone(),
                size,
                limit: self.max_bytes,
            });
        }

        let bytes = fs::read(&path).map_err(io_error)?;
        let text = String::from_utf8(bytes).map_err(|_| SourceError::NotText(path.clone()))?;
        if text.trim().is_empty() {
            return Err(SourceError::Empty(path));
        }

        debug!("Read {} bytes from {}", text.len(), path.display());
        Ok(text)
    }
}
