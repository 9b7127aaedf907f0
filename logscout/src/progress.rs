use std::path::PathBuf;

use crate::results::RunSummary;

/// A user-facing step of a run.
///
/// The pipeline never prints; it hands these to a [`ProgressSink`] and lets
/// the caller decide how they are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ExtractingTopLevel(PathBuf),
    NestedArchivesFound(usize),
    ExtractingNested(String),
    ExtractionFailed {
        path: PathBuf,
        reason: String,
    },
    LogsClassified {
        uncompressed: usize,
        compressed: usize,
    },
    SearchStarted(String),
    TimestampPatterns(Vec<String>),
    /// Timestamp mode was requested but the term does not have the expected shape
    FormatNotRecognized(String),
    FileMatched {
        path: PathBuf,
        matches: usize,
        compressed: bool,
    },
    FileReadFailed {
        path: PathBuf,
        reason: String,
    },
    CopyingMatches(usize),
    Finished(RunSummary),
}

/// Receives progress events in the order they happen.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: ProgressEvent) {}
}

/// Keeps every event, mostly useful in tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub events: Vec<ProgressEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events matching the predicate
    pub fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn emit(&mut self, event: ProgressEvent) {
        (**self).emit(event);
    }
}
