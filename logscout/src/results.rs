//! Result types produced by a search run.
//!
//! A [`SearchOutput`] owns every [`FileResult`] with at least one match, in
//! the order files were searched, along with the counters the report needs.
//! Files without matches only move the counters.
use std::path::PathBuf;

use crate::classify::Compression;

/// A single matching line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// 1-based line number
    pub line_number: usize,
    /// The line with surrounding whitespace trimmed
    pub line_content: String,
    /// The first pattern of the pattern set found on this line
    pub pattern: String,
}

/// All matches found in a single log file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Path of the file relative to the extraction root
    pub relative_path: PathBuf,
    /// Absolute path of the file inside the working tree
    pub source_path: PathBuf,
    pub compression: Compression,
    pub matches: Vec<MatchRecord>,
}

impl FileResult {
    pub fn is_compressed(&self) -> bool {
        self.compression == Compression::Gzip
    }
}

/// The complete search results of one run
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    /// Results for files with matches, in search order
    pub file_results: Vec<FileResult>,
    /// Total number of matches found
    pub total_matches: usize,
    /// Uncompressed log files searched
    pub uncompressed_searched: usize,
    /// Compressed log files searched
    pub compressed_searched: usize,
    /// Total number of files with matches
    pub files_with_matches: usize,
}

impl SearchOutput {
    /// Creates a new empty search result
    pub fn new() -> Self {
        Default::default()
    }

    /// Total number of files searched
    pub fn files_searched(&self) -> usize {
        self.uncompressed_searched + self.compressed_searched
    }

    /// Counts a searched file and keeps it if anything matched
    pub fn add_file_result(&mut self, file_result: FileResult) {
        match file_result.compression {
            Compression::None => self.uncompressed_searched += 1,
            Compression::Gzip => self.compressed_searched += 1,
        }
        if !file_result.matches.is_empty() {
            self.total_matches += file_result.matches.len();
            self.files_with_matches += 1;
            self.file_results.push(file_result);
        }
    }

    pub fn summary(&self, output_dir: PathBuf) -> RunSummary {
        RunSummary {
            files_searched: self.files_searched(),
            files_with_matches: self.files_with_matches,
            total_matches: self.total_matches,
            output_dir,
        }
    }
}

/// Headline numbers of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub files_searched: usize,
    pub files_with_matches: usize,
    pub total_matches: usize,
    pub output_dir: PathBuf,
}

impl RunSummary {
    pub fn extracted_logs_dir(&self) -> PathBuf {
        self.output_dir.join(crate::report::EXTRACTED_LOGS_DIR)
    }
}
