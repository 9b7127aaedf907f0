//! File classification by name.
//!
//! Every file under the extraction root lands in exactly one bucket:
//!
//! | name                       | kind          | compression |
//! |----------------------------|---------------|-------------|
//! | `*.tar.gz`                 | not a log     |             |
//! | `*.gz`                     | `Gzip`        | `Gzip`      |
//! | `*.log.gz_<N>` (anywhere)  | `RotatedGzip` | `Gzip`      |
//! | `*.log`                    | `Plain`       | `None`      |
//! | `*.log_<N>`                | `Rotated`     | `None`      |
//! | anything else              | not a log     |             |
//!
//! Rows are evaluated top to bottom. A nested `.tar.gz` belongs to the
//! unpacker, and the compressed rules win over the plain ones, so a name such
//! as `app.log.gz_3.log_1` is read through the gzip decoder.
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const NESTED_ARCHIVE_SUFFIX: &str = ".tar.gz";

static ROTATED_GZIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.log\.gz_[0-9]+").unwrap());
static ROTATED_PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.log_[0-9]+$").unwrap());

/// How a log file's bytes are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
}

/// The naming scheme a log file was recognised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// `app.log`
    Plain,
    /// `app.log_3`
    Rotated,
    /// `app.gz`, `app.log.gz`
    Gzip,
    /// `app.log.gz_3`
    RotatedGzip,
}

impl LogKind {
    pub fn compression(self) -> Compression {
        match self {
            LogKind::Plain | LogKind::Rotated => Compression::None,
            LogKind::Gzip | LogKind::RotatedGzip => Compression::Gzip,
        }
    }
}

/// Log files found under a directory, split by compression, each in walk order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLogs {
    pub uncompressed: Vec<PathBuf>,
    pub compressed: Vec<PathBuf>,
}

impl ClassifiedLogs {
    pub fn total(&self) -> usize {
        self.uncompressed.len() + self.compressed.len()
    }

    /// Uncompressed logs first, then compressed ones
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, Compression)> {
        self.uncompressed
            .iter()
            .map(|p| (p, Compression::None))
            .chain(self.compressed.iter().map(|p| (p, Compression::Gzip)))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether a name should be read through the gzip decoder
pub fn is_compressed_name(name: &str) -> bool {
    name.ends_with(".gz") || ROTATED_GZIP.is_match(name)
}

/// Whether a file should be read through the gzip decoder
pub fn is_compressed(path: &Path) -> bool {
    is_compressed_name(&file_name(path))
}

/// Whether a file is a second-level archive for the unpacker
pub fn is_nested_archive(path: &Path) -> bool {
    file_name(path).ends_with(NESTED_ARCHIVE_SUFFIX)
}

/// Classifies a bare file name, `None` for anything that is not a log
pub fn classify_name(name: &str) -> Option<LogKind> {
    if name.ends_with(NESTED_ARCHIVE_SUFFIX) {
        return None;
    }

    if is_compressed_name(name) {
        return Some(if name.ends_with(".gz") {
            LogKind::Gzip
        } else {
            LogKind::RotatedGzip
        });
    }

    if name.ends_with(".log") {
        Some(LogKind::Plain)
    } else if ROTATED_PLAIN.is_match(name) {
        Some(LogKind::Rotated)
    } else {
        None
    }
}

pub fn classify_path(path: &Path) -> Option<LogKind> {
    classify_name(&file_name(path))
}

/// Every regular file under `root`, depth first, sorted by name at each level
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut walker = WalkBuilder::new(root);
    walker
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    walker
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Walks `root` and splits the log files it contains by compression
pub fn classify_logs(root: &Path) -> ClassifiedLogs {
    let mut logs = ClassifiedLogs::default();

    for path in walk_files(root) {
        match classify_path(&path).map(LogKind::compression) {
            Some(Compression::None) => logs.uncompressed.push(path),
            Some(Compression::Gzip) => logs.compressed.push(path),
            None => debug!("Ignoring {}", path.display()),
        }
    }

    debug!(
        "Classified {} uncompressed and {} compressed logs under {}",
        logs.uncompressed.len(),
        logs.compressed.len(),
        root.display()
    );
    logs
}
