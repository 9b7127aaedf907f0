pub mod archive;
pub mod classify;
pub mod config;
pub mod errors;
pub mod progress;
pub mod report;
pub mod results;
pub mod search;
pub mod timestamp;

pub use config::ScanConfig;
pub use errors::{SearchError, SearchResult};
pub use progress::{CollectingSink, NullSink, ProgressEvent, ProgressSink};
pub use results::{FileResult, MatchRecord, RunSummary, SearchOutput};
pub use search::{search, PatternSet};
