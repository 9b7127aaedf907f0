use crate::errors::{SearchError, SearchResult};
use crate::timestamp;

/// An ordered, duplicate-free, non-empty list of literal patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<String>,
}

impl PatternSet {
    /// Builds a set from patterns in priority order, dropping later duplicates
    pub fn new<I, S>(patterns: I) -> SearchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            if !unique.contains(&pattern) {
                unique.push(pattern);
            }
        }

        if unique.is_empty() {
            return Err(SearchError::config_error("No search patterns provided"));
        }
        Ok(Self { patterns: unique })
    }

    /// A set holding just `term`
    pub fn literal(term: impl Into<String>) -> Self {
        Self {
            patterns: vec![term.into()],
        }
    }

    /// The expanded timestamp spellings of `term`, if it is shaped like one
    pub fn timestamp(term: &str) -> Option<Self> {
        timestamp::expand(term).map(|patterns| Self { patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Finds the first pattern of a [`PatternSet`] contained in a line
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    set: PatternSet,
}

impl PatternMatcher {
    pub fn new(set: PatternSet) -> Self {
        Self { set }
    }

    /// The earliest-listed pattern occurring anywhere in `line`
    pub fn first_match<'a>(&'a self, line: &str) -> Option<&'a str> {
        self.set
            .patterns
            .iter()
            .find(|pattern| line.contains(pattern.as_str()))
            .map(String::as_str)
    }
}
