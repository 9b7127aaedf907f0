use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::matcher::{PatternMatcher, PatternSet};
use super::processor::FileProcessor;
use crate::archive::{find_nested_archives, is_top_level_archive, unpack, unpack_staged};
use crate::classify::{classify_logs, ClassifiedLogs, Compression};
use crate::config::ScanConfig;
use crate::errors::{SearchError, SearchResult};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::report::{copy_matches, prepare_output_dir, write_report, ReportHeader};
use crate::results::{FileResult, RunSummary, SearchOutput};

const UNPACK_DIR: &str = "unpacked";
const EXTRACTION_DIR: &str = "extracted_content";

/// The patterns a run searches for
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub patterns: PatternSet,
    /// Whether `patterns` came from timestamp expansion
    pub expanded: bool,
}

impl SearchPlan {
    /// Builds the pattern set for `term`, falling back to a literal search
    /// when timestamp mode is on but `term` is not shaped like a timestamp.
    pub fn for_term(term: &str, timestamp_mode: bool, sink: &mut dyn ProgressSink) -> Self {
        if !timestamp_mode {
            return Self {
                patterns: PatternSet::literal(term),
                expanded: false,
            };
        }

        match PatternSet::timestamp(term) {
            Some(patterns) => {
                info!("Expanded timestamp into {} patterns", patterns.len());
                sink.emit(ProgressEvent::TimestampPatterns(patterns.patterns().to_vec()));
                Self {
                    patterns,
                    expanded: true,
                }
            }
            None => {
                warn!("'{}' is not a recognised timestamp, searching literally", term);
                sink.emit(ProgressEvent::FormatNotRecognized(term.to_string()));
                Self {
                    patterns: PatternSet::literal(term),
                    expanded: false,
                }
            }
        }
    }

    fn header<'a>(&'a self, term: &'a str) -> ReportHeader<'a> {
        ReportHeader {
            term,
            expanded: self.expanded.then_some(&self.patterns),
        }
    }
}

/// Transient directories of one run, removed when dropped
struct WorkingTree {
    dir: TempDir,
}

impl WorkingTree {
    fn new(parent: Option<&Path>) -> SearchResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("logscout-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!("Working directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn unpack_root(&self) -> PathBuf {
        self.path().join(UNPACK_DIR)
    }

    fn extraction_root(&self) -> PathBuf {
        self.path().join(EXTRACTION_DIR)
    }

    fn close(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove working directory {}: {}", path.display(), e);
        }
    }
}

/// Resolves the input into the directory nested archives are looked for in
fn resolve_unpack_root(
    input: &Path,
    tree: &WorkingTree,
    sink: &mut dyn ProgressSink,
) -> SearchResult<PathBuf> {
    if is_top_level_archive(input) {
        info!("Extracting main tar file: {}", input.display());
        sink.emit(ProgressEvent::ExtractingTopLevel(input.to_path_buf()));
        let root = tree.unpack_root();
        return match unpack(input, &root) {
            Ok(_) => Ok(root),
            Err(e) => {
                warn!("Top-level archive could not be unpacked: {}", e);
                Err(SearchError::invalid_input(input))
            }
        };
    }

    if input.is_dir() {
        return Ok(input.to_path_buf());
    }

    Err(SearchError::invalid_input(input))
}

/// Unpacks every `.tar.gz` under `unpack_root` into `extraction_root`.
///
/// A failing archive is reported and skipped. Returns how many succeeded.
pub fn extract_nested_archives(
    unpack_root: &Path,
    extraction_root: &Path,
    scratch: &Path,
    sink: &mut dyn ProgressSink,
) -> SearchResult<usize> {
    let archives = find_nested_archives(unpack_root);
    info!("Found {} .tar.gz files", archives.len());
    sink.emit(ProgressEvent::NestedArchivesFound(archives.len()));

    fs::create_dir_all(extraction_root)?;

    let mut extracted = 0;
    for archive in &archives {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sink.emit(ProgressEvent::ExtractingNested(name));

        match unpack_staged(archive, extraction_root, scratch) {
            Ok(entries) => {
                debug!("Extracted {} entries from {}", entries, archive.display());
                extracted += 1;
            }
            Err(e) if !e.is_fatal() => {
                warn!("Error extracting {}: {}", archive.display(), e);
                sink.emit(ProgressEvent::ExtractionFailed {
                    path: archive.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(extracted)
}

/// Searches every classified log under `root`, uncompressed files first.
///
/// Unreadable files are reported, counted as searched and contribute nothing.
pub fn search_logs(
    logs: &ClassifiedLogs,
    root: &Path,
    patterns: &PatternSet,
    sink: &mut dyn ProgressSink,
) -> SearchOutput {
    let processor = FileProcessor::new(PatternMatcher::new(patterns.clone()));
    let mut output = SearchOutput::new();

    for (path, compression) in logs.iter() {
        let file_result = match processor.process_file(path, root) {
            Ok(file_result) => file_result,
            Err(e) => {
                warn!("{}", e);
                sink.emit(ProgressEvent::FileReadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                FileResult {
                    relative_path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
                    source_path: path.clone(),
                    compression,
                    matches: Vec::new(),
                }
            }
        };

        if !file_result.matches.is_empty() {
            debug!(
                "Found {} matches in {}",
                file_result.matches.len(),
                file_result.relative_path.display()
            );
            sink.emit(ProgressEvent::FileMatched {
                path: file_result.relative_path.clone(),
                matches: file_result.matches.len(),
                compressed: file_result.compression == Compression::Gzip,
            });
        }
        output.add_file_result(file_result);
    }
    output
}

/// Runs a complete scan: unpack, classify, search, copy matches and write
/// `result.txt`.
///
/// Only an unusable input, a bad configuration or a failure to write the
/// output directory ends the run early. The working directory is removed on
/// every exit path.
pub fn search(config: &ScanConfig, sink: &mut dyn ProgressSink) -> SearchResult<RunSummary> {
    config.validate()?;
    info!(
        "Starting scan of {} for '{}'",
        config.input_path.display(),
        config.search_term
    );

    let extracted_logs = prepare_output_dir(&config.output_dir)?;
    let tree = WorkingTree::new(config.scratch_dir.as_deref())?;

    let unpack_root = resolve_unpack_root(&config.input_path, &tree, sink)?;
    let extraction_root = tree.extraction_root();
    extract_nested_archives(&unpack_root, &extraction_root, tree.path(), sink)?;

    let logs = classify_logs(&extraction_root);
    info!(
        "Found {} uncompressed and {} compressed log files",
        logs.uncompressed.len(),
        logs.compressed.len()
    );
    sink.emit(ProgressEvent::LogsClassified {
        uncompressed: logs.uncompressed.len(),
        compressed: logs.compressed.len(),
    });

    let plan = SearchPlan::for_term(&config.search_term, config.timestamp_mode, sink);
    sink.emit(ProgressEvent::SearchStarted(config.search_term.clone()));
    let output = search_logs(&logs, &extraction_root, &plan.patterns, sink);

    if !output.file_results.is_empty() {
        sink.emit(ProgressEvent::CopyingMatches(output.file_results.len()));
        copy_matches(&output, &extracted_logs)?;
    }
    write_report(
        &config.output_dir,
        &plan.header(&config.search_term),
        &output,
    )?;
    tree.close();

    let summary = output.summary(config.output_dir.clone());
    info!(
        "Scan complete. Found {} matches in {} files",
        summary.total_matches, summary.files_with_matches
    );
    sink.emit(ProgressEvent::Finished(summary.clone()));
    Ok(summary)
}
