use clap::Parser;
use colored::Colorize;
use logscout::{search, ProgressEvent, ProgressSink, ScanConfig, SearchError};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Search for strings in log files within nested tar archives",
    long_about = None
)]
struct Cli {
    /// Path to a tar file or a directory
    input_path: PathBuf,

    /// String to search for
    search_string: String,

    /// Output directory name
    #[arg(short = 'o', long = "output", default_value = "search_results")]
    output: PathBuf,

    /// Expand a YYYY-MM-DD-HH.mm.ss.ffffff timestamp into common formats (also -tf)
    #[arg(short = 't', long = "timestamp-format")]
    timestamp_format: bool,

    /// Configuration file with defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_scan_config(self) -> ScanConfig {
        let mut config = ScanConfig::new(self.input_path, self.search_string)
            .with_output_dir(self.output)
            .with_timestamp_mode(self.timestamp_format);
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config
    }
}

/// `-tf` is a two-letter short flag that clap cannot declare.
/// Arguments after `--` are positional and left alone.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut positional_only = false;
    args.into_iter()
        .map(|arg| {
            if positional_only {
                return arg;
            }
            if arg == "--" {
                positional_only = true;
                arg
            } else if arg == "-tf" {
                OsString::from("--timestamp-format")
            } else {
                arg
            }
        })
        .collect()
}

/// Prints progress events to stdout
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::ExtractingTopLevel(path) => {
                println!("Extracting main tar file: {}", path.display());
            }
            ProgressEvent::NestedArchivesFound(count) => {
                println!("Searching for .tar.gz files...");
                println!("Found {} .tar.gz files", count);
            }
            ProgressEvent::ExtractingNested(name) => {
                println!("Extracting: {}", name);
            }
            ProgressEvent::ExtractionFailed { path, reason } => {
                println!(
                    "{}",
                    format!("Error extracting {}: {}", path.display(), reason).red()
                );
            }
            ProgressEvent::LogsClassified {
                uncompressed,
                compressed,
            } => {
                println!("Found {} uncompressed log files", uncompressed);
                println!("Found {} compressed log files", compressed);
                println!("Total log files: {}", uncompressed + compressed);
            }
            ProgressEvent::TimestampPatterns(patterns) => {
                println!("Timestamp format detected. Searching for patterns:");
                for pattern in patterns {
                    println!("  - {}", pattern.cyan());
                }
            }
            ProgressEvent::FormatNotRecognized(term) => {
                println!(
                    "{}",
                    format!(
                        "Warning: '{}' does not match the timestamp format \
                         YYYY-MM-DD-HH.mm.ss.ffffff, searching for it literally",
                        term
                    )
                    .yellow()
                );
            }
            ProgressEvent::SearchStarted(term) => {
                println!("Searching for '{}' in log files...", term);
            }
            ProgressEvent::FileMatched {
                path,
                matches,
                compressed,
            } => {
                let kind = if compressed { "compressed" } else { "uncompressed" };
                println!(
                    "Found {} matches in {} ({})",
                    matches.to_string().green(),
                    path.display().to_string().blue(),
                    kind
                );
            }
            ProgressEvent::FileReadFailed { path, reason } => {
                println!(
                    "{}",
                    format!("Error reading file {}: {}", path.display(), reason).red()
                );
            }
            ProgressEvent::CopyingMatches(count) => {
                println!("Copying {} files with matches...", count);
            }
            ProgressEvent::Finished(summary) => {
                println!("\nSearch completed!");
                println!("Results saved to: {}/", summary.output_dir.display());
                println!(
                    "Summary: {} matches found in {} files",
                    summary.total_matches, summary.files_with_matches
                );
                if summary.files_with_matches > 0 {
                    println!(
                        "Extracted log files with matches saved to: {}/",
                        summary.extracted_logs_dir().display()
                    );
                }
            }
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let config_path = cli.config.clone();
    let from_cli = cli.into_scan_config();

    let config = ScanConfig::load_from(config_path.as_deref())?.merge_with_cli(from_cli);
    init_tracing(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    search(&config, &mut ConsoleSink)?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
