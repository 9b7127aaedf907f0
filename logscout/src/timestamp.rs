//! Timestamp pattern expansion.
//!
//! Log producers rarely agree on how to print a moment in time. A term shaped
//! like `2025-07-14-08.25.22.214000` is expanded into the spellings commonly
//! found in logs so one search finds all of them:
//!
//! ```text
//! 2025-07-14-08.25.22.214000
//! 2025-07-14T08:25:22
//! 2025-07-14 08.25.22
//! 2025-07-14 08:25:22
//! 20250714082522
//! 07/14/2025 08:25:22
//! ```
use once_cell::sync::Lazy;
use regex::Regex;

static TIMESTAMP_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})-([0-9]{2})\.([0-9]{2})\.([0-9]{2})\.[0-9]+$")
        .unwrap()
});

/// Whether `s` is exactly `YYYY-MM-DD-HH.mm.ss.<fraction>`
pub fn is_timestamp_format(s: &str) -> bool {
    TIMESTAMP_SHAPE.is_match(s)
}

/// Expands a timestamp term into its equivalent spellings, original first.
///
/// Returns `None` when `s` is not shaped like a timestamp.
pub fn expand(s: &str) -> Option<Vec<String>> {
    let caps = TIMESTAMP_SHAPE.captures(s)?;
    let (year, month, day) = (&caps[1], &caps[2], &caps[3]);
    let (hour, minute, second) = (&caps[4], &caps[5], &caps[6]);

    let candidates = [
        s.to_string(),
        format!("{year}-{month}-{day}T{hour}:{minute}:{second}"),
        format!("{year}-{month}-{day} {hour}.{minute}.{second}"),
        format!("{year}-{month}-{day} {hour}:{minute}:{second}"),
        format!("{year}{month}{day}{hour}{minute}{second}"),
        format!("{month}/{day}/{year} {hour}:{minute}:{second}"),
    ];

    let mut patterns: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !patterns.contains(&candidate) {
            patterns.push(candidate);
        }
    }
    Some(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timestamp_format() {
        assert!(is_timestamp_format("2025-07-14-08.25.22.214000"));
        assert!(is_timestamp_format("2025-07-14-08.25.22.5"));

        assert!(!is_timestamp_format("2025-07-14 08:25:22"));
        assert!(!is_timestamp_format("2025-07-14-08.25.22"));
        assert!(!is_timestamp_format("2025-07-14-08.25.22."));
        assert!(!is_timestamp_format("25-07-14-08.25.22.1"));
        assert!(!is_timestamp_format(" 2025-07-14-08.25.22.1"));
        assert!(!is_timestamp_format("2025-07-14-08.25.22.1 "));
        assert!(!is_timestamp_format("2025-7-14-08.25.22.1"));
        assert!(!is_timestamp_format("ERROR"));
    }

    #[test]
    fn test_expand_order() {
        let patterns = expand("2025-07-14-08.25.22.214000").unwrap();
        assert_eq!(
            patterns,
            vec![
                "2025-07-14-08.25.22.214000",
                "2025-07-14T08:25:22",
                "2025-07-14 08.25.22",
                "2025-07-14 08:25:22",
                "20250714082522",
                "07/14/2025 08:25:22",
            ]
        );
    }

    #[test]
    fn test_expand_has_no_duplicates() {
        let patterns = expand("1999-12-31-23.59.59.0").unwrap();
        let mut deduped = patterns.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), patterns.len());
        assert_eq!(patterns[0], "1999-12-31-23.59.59.0");
    }

    #[test]
    fn test_expand_rejects_other_shapes() {
        assert!(expand("2025-07-14 08:25:22").is_none());
        assert!(expand("").is_none());
    }
}
