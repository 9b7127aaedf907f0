use config::{Config as ConfigBuilder, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Configuration for one scan.
///
/// # Configuration Locations
///
/// Defaults can be kept in YAML files, loaded in order of precedence:
/// 1. Custom config file specified via `--config`
/// 2. Local `.logscout.yaml` in the current directory
/// 3. Global `$CONFIG_DIR/logscout/config.yaml`
///
/// ```yaml
/// # Where result.txt and extracted_logs/ are written
/// output_dir: "search_results"
///
/// # Expand timestamp-shaped search terms
/// timestamp_mode: false
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
///
/// # Parent of the temporary working directory (system temp dir if unset)
/// scratch_dir: "/var/tmp"
/// ```
///
/// The input path and search term normally come from the command line;
/// command-line values take precedence over file values (see
/// [`ScanConfig::merge_with_cli`]).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// A top-level tar archive or a directory holding archives and logs
    pub input_path: PathBuf,

    /// Literal text to look for, or a timestamp when `timestamp_mode` is set
    pub search_term: String,

    /// Destination directory; replaced wholesale on every run
    pub output_dir: PathBuf,

    /// Expand `YYYY-MM-DD-HH.mm.ss.f` terms into equivalent spellings
    pub timestamp_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Where the working directory is created; the system temp dir when `None`
    pub scratch_dir: Option<PathBuf>,
}

const LOCAL_CONFIG: &str = ".logscout.yaml";

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("search_results")
}

pub fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            search_term: String::new(),
            output_dir: default_output_dir(),
            timestamp_mode: false,
            log_level: default_log_level(),
            scratch_dir: None,
        }
    }
}

impl ScanConfig {
    pub fn new(input_path: impl Into<PathBuf>, search_term: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            search_term: search_term.into(),
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_timestamp_mode(mut self, enabled: bool) -> Self {
        self.timestamp_mode = enabled;
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(scratch_dir.into());
        self
    }

    /// Loads configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("logscout/config.yaml")),
            Some(PathBuf::from(LOCAL_CONFIG)),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: ScanConfig) -> Self {
        if !cli_config.input_path.as_os_str().is_empty() {
            self.input_path = cli_config.input_path;
        }
        if !cli_config.search_term.is_empty() {
            self.search_term = cli_config.search_term;
        }
        if cli_config.output_dir != default_output_dir() {
            self.output_dir = cli_config.output_dir;
        }
        if cli_config.timestamp_mode {
            self.timestamp_mode = true;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        if cli_config.scratch_dir.is_some() {
            self.scratch_dir = cli_config.scratch_dir;
        }
        self
    }

    /// Checks the fields a run cannot do without
    pub fn validate(&self) -> SearchResult<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(SearchError::config_error("No input path given"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(SearchError::config_error("Output directory must not be empty"));
        }
        Ok(())
    }
}
