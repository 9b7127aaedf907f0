use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

use super::matcher::{PatternMatcher, PatternSet};
use crate::classify::{is_compressed, Compression};
use crate::errors::{SearchError, SearchResult};
use crate::results::{FileResult, MatchRecord};

const BUFFER_CAPACITY: usize = 65536;

/// Scans log files line by line for a pattern set
#[derive(Debug, Clone)]
pub struct FileProcessor {
    matcher: PatternMatcher,
}

impl FileProcessor {
    pub fn new(matcher: PatternMatcher) -> Self {
        Self { matcher }
    }

    /// Searches one file, going through gzip when [`is_compressed`] says so.
    ///
    /// Any failure discards the matches collected so far; the caller decides
    /// whether that is fatal.
    pub fn search_file(&self, path: &Path) -> SearchResult<Vec<MatchRecord>> {
        trace!("Processing file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::file_read(path, e))?;
        if is_compressed(path) {
            let reader = BufReader::with_capacity(BUFFER_CAPACITY, MultiGzDecoder::new(file));
            self.search_reader(reader, path)
        } else {
            let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
            self.search_reader(reader, path)
        }
    }

    /// Searches any line-oriented reader; `path` only labels errors and logs
    pub fn search_reader<R: BufRead>(
        &self,
        mut reader: R,
        path: &Path,
    ) -> SearchResult<Vec<MatchRecord>> {
        let mut matches = Vec::new();
        let mut buf = Vec::with_capacity(256);
        let mut line_number = 0;
        let mut replaced = false;

        loop {
            buf.clear();
            let more = read_line(&mut reader, &mut buf)
                .map_err(|e| SearchError::file_read(path, e))?;
            if !more {
                break;
            }
            line_number += 1;

            let line = String::from_utf8_lossy(&buf);
            if let Cow::Owned(_) = line {
                replaced = true;
            }

            if let Some(pattern) = self.matcher.first_match(&line) {
                matches.push(MatchRecord {
                    line_number,
                    line_content: line.trim().to_string(),
                    pattern: pattern.to_string(),
                });
            }
        }

        if replaced {
            debug!("Invalid UTF-8 replaced in file: {}", path.display());
        }
        trace!(
            "{} lines, {} matches in {}",
            line_number,
            matches.len(),
            path.display()
        );
        Ok(matches)
    }

    /// Searches `path` and labels the outcome with its location relative to `root`
    pub fn process_file(&self, path: &Path, root: &Path) -> SearchResult<FileResult> {
        let compression = if is_compressed(path) {
            Compression::Gzip
        } else {
            Compression::None
        };
        let matches = self.search_file(path)?;
        Ok(FileResult {
            relative_path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            source_path: path.to_path_buf(),
            compression,
            matches,
        })
    }
}

/// Reads one line into `buf` without its terminator.
///
/// `\n`, `\r` and `\r\n` all end a line. Returns `false` at end of input.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    let mut read_any = false;
    loop {
        let (terminator, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(read_any);
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    buf.extend_from_slice(&available[..i]);
                    (Some(available[i]), i + 1)
                }
                None => {
                    buf.extend_from_slice(available);
                    (None, available.len())
                }
            }
        };
        reader.consume(used);
        read_any = true;

        match terminator {
            Some(b'\r') => {
                if reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(true);
            }
            Some(_) => return Ok(true),
            None => {}
        }
    }
}

/// Searches one file for `patterns`, first pattern per line wins
pub fn search_file(path: &Path, patterns: &PatternSet) -> SearchResult<Vec<MatchRecord>> {
    FileProcessor::new(PatternMatcher::new(patterns.clone())).search_file(path)
}
