//! Error types for logscout.
//!
//! A run distinguishes failures that abort everything from failures that only
//! remove one archive or one log file from the searchable set:
//!
//! ```rust,ignore
//! match logscout::search(&config, &mut sink) {
//!     Ok(summary) => // report written,
//!     Err(SearchError::InvalidInput(path)) => // nothing to search,
//!     Err(e) => // output directory or configuration problem
//! }
//! ```
//!
//! `Extraction`, `UnsafeArchivePath` and `FileRead` never escape the pipeline;
//! they are turned into progress events at the archive or file that caused
//! them.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while unpacking, classifying or searching
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{0} is not a valid tar file or directory")]
    InvalidInput(PathBuf),
    #[error("Failed to extract {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },
    #[error("Archive member {member} in {archive} escapes the destination directory")]
    UnsafeArchivePath { archive: PathBuf, member: PathBuf },
    #[error("Error reading file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn invalid_input(path: impl Into<PathBuf>) -> Self {
        Self::InvalidInput(path.into())
    }

    pub fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unsafe_archive_path(archive: impl Into<PathBuf>, member: impl Into<PathBuf>) -> Self {
        Self::UnsafeArchivePath {
            archive: archive.into(),
            member: member.into(),
        }
    }

    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: unify_path(&path.into()),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Extraction { .. } | Self::UnsafeArchivePath { .. } | Self::FileRead { .. }
        )
    }
}

impl From<::config::ConfigError> for SearchError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
