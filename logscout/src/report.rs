//! Output directory handling and the `result.txt` report.
//!
//! ```text
//! <output_dir>/
//!   extracted_logs/<relative paths of matching files>
//!   result.txt
//! ```
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::SearchResult;
use crate::results::{FileResult, SearchOutput};
use crate::search::matcher::PatternSet;

pub const EXTRACTED_LOGS_DIR: &str = "extracted_logs";
pub const RESULT_FILE: &str = "result.txt";

const RULE_WIDTH: usize = 50;
const SUBRULE_WIDTH: usize = 30;

/// What was searched for, as echoed at the top of the report
#[derive(Debug, Clone, Copy)]
pub struct ReportHeader<'a> {
    pub term: &'a str,
    /// The expanded spellings, present only when timestamp expansion happened
    pub expanded: Option<&'a PatternSet>,
}

/// Replaces `output_dir` with an empty one holding `extracted_logs/`
pub fn prepare_output_dir(output_dir: &Path) -> SearchResult<PathBuf> {
    if output_dir.exists() {
        debug!("Removing existing output directory {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }
    let extracted = output_dir.join(EXTRACTED_LOGS_DIR);
    fs::create_dir_all(&extracted)?;
    Ok(extracted)
}

/// Copies every file with matches below `dest`, keeping its relative path
pub fn copy_matches(output: &SearchOutput, dest: &Path) -> SearchResult<usize> {
    let mut copied = 0;
    for file_result in &output.file_results {
        let target = dest.join(&file_result.relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&file_result.source_path, &target)?;
        debug!(
            "Copied {} to {}",
            file_result.source_path.display(),
            target.display()
        );
        copied += 1;
    }
    Ok(copied)
}

fn compression_label(file_result: &FileResult) -> &'static str {
    if file_result.is_compressed() {
        "compressed"
    } else {
        "uncompressed"
    }
}

/// Renders the report into any writer
pub fn render_report<W: Write>(
    w: &mut W,
    header: &ReportHeader<'_>,
    output: &SearchOutput,
) -> io::Result<()> {
    writeln!(w, "Search Results for: '{}'", header.term)?;
    if let Some(patterns) = header.expanded {
        writeln!(w, "Timestamp format search enabled")?;
        writeln!(w, "Search patterns used:")?;
        for pattern in patterns.patterns() {
            writeln!(w, "  - {}", pattern)?;
        }
    }
    writeln!(w, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(w)?;

    writeln!(w, "Total files searched: {}", output.files_searched())?;
    writeln!(w, "  - Uncompressed: {}", output.uncompressed_searched)?;
    writeln!(w, "  - Compressed: {}", output.compressed_searched)?;
    writeln!(w, "Files with matches: {}", output.files_with_matches)?;
    writeln!(w, "Total matches found: {}", output.total_matches)?;
    writeln!(w)?;

    if output.file_results.is_empty() {
        writeln!(w, "No matches found.")?;
        return Ok(());
    }

    writeln!(w, "Detailed Results:")?;
    writeln!(w, "{}", "-".repeat(SUBRULE_WIDTH))?;
    writeln!(w)?;

    for file_result in &output.file_results {
        writeln!(
            w,
            "File: {} ({})",
            file_result.relative_path.display(),
            compression_label(file_result)
        )?;
        writeln!(w, "Matches: {}", file_result.matches.len())?;
        writeln!(w, "Lines:")?;
        for m in &file_result.matches {
            if header.expanded.is_some() {
                writeln!(
                    w,
                    "  Line {} [matched: {}]: {}",
                    m.line_number, m.pattern, m.line_content
                )?;
            } else {
                writeln!(w, "  Line {}: {}", m.line_number, m.line_content)?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn report_to_string(header: &ReportHeader<'_>, output: &SearchOutput) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = render_report(&mut buf, header, output);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Writes `result.txt` into `output_dir` and returns its path
pub fn write_report(
    output_dir: &Path,
    header: &ReportHeader<'_>,
    output: &SearchOutput,
) -> SearchResult<PathBuf> {
    let path = output_dir.join(RESULT_FILE);
    let mut w = BufWriter::new(File::create(&path)?);
    render_report(&mut w, header, output)?;
    w.flush()?;
    Ok(path)
}
