//! The search pipeline.
//!
//! A run flows through these stages in a single thread:
//!
//! 1. The input is resolved: a top-level archive is unpacked into a working
//!    directory, a directory is used as-is.
//! 2. Every `.tar.gz` beneath it is unpacked into one shared extraction root
//!    (see [`crate::archive`]). Failing archives are skipped.
//! 3. The extraction root is classified into uncompressed and compressed logs
//!    (see [`crate::classify`]).
//! 4. Each log is scanned line by line; the first pattern of the
//!    [`PatternSet`] found on a line is recorded for it.
//! 5. Files with matches are copied to `extracted_logs/` and `result.txt` is
//!    written (see [`crate::report`]).
//!
//! Progress is reported through a [`crate::progress::ProgressSink`] and
//! nothing in here prints:
//!
//! ```rust,ignore
//! let config = ScanConfig::new("bundle.tar", "ERROR");
//! let summary = logscout::search(&config, &mut NullSink)?;
//! println!("{} matches", summary.total_matches);
//! ```
pub mod engine;
pub mod matcher;
pub mod processor;

pub use engine::{search, SearchPlan};
pub use matcher::{PatternMatcher, PatternSet};
pub use processor::{search_file, FileProcessor};
