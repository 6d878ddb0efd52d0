//! Error pattern catalog used for classification and analytics.
//!
//! Patterns never influence which strategy runs; they only count
//! occurrences and contribute suggestions to the handling result.

use crate::core::{PipelineError, Severity};
use crate::utils::{now_utc, Timestamp};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A known failure signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// Pattern id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Regular expression matched against `"{code} {message}"`.
    pub pattern: String,
    /// Free-form category.
    pub category: String,
    /// Typical severity.
    pub severity: Severity,
    /// Remediation hint.
    pub suggestion: String,
    /// Number of matching errors seen.
    #[serde(default)]
    pub occurrences: u64,
    /// When a matching error was last seen.
    #[serde(default)]
    pub last_seen: Option<Timestamp>,
}

impl ErrorPattern {
    /// Creates a pattern with zero occurrences.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pattern: pattern.into(),
            category: category.into(),
            severity,
            suggestion: suggestion.into(),
            occurrences: 0,
            last_seen: None,
        }
    }
}

/// Ordered set of compiled patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    entries: Vec<(ErrorPattern, Regex)>,
}

impl PatternCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in patterns.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for pattern in default_patterns() {
            // Built-in expressions are known to compile.
            let _ = catalog.add(pattern);
        }
        catalog
    }

    /// Adds or replaces a pattern by id.
    ///
    /// # Errors
    ///
    /// Fails if the expression does not compile.
    pub fn add(&mut self, pattern: ErrorPattern) -> Result<(), regex::Error> {
        let regex = Regex::new(&pattern.pattern)?;
        self.entries.retain(|(p, _)| p.id != pattern.id);
        self.entries.push((pattern, regex));
        Ok(())
    }

    /// Records `error` against every matching pattern and returns copies of
    /// the matches.
    pub fn classify(&mut self, error: &PipelineError) -> Vec<ErrorPattern> {
        let haystack = format!("{} {}", error.code, error.message);
        let now = now_utc();
        self.entries
            .iter_mut()
            .filter(|(_, re)| re.is_match(&haystack))
            .map(|(pattern, _)| {
                pattern.occurrences += 1;
                pattern.last_seen = Some(now);
                pattern.clone()
            })
            .collect()
    }

    /// Copies of every pattern.
    #[must_use]
    pub fn patterns(&self) -> Vec<ErrorPattern> {
        self.entries.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_patterns() -> Vec<ErrorPattern> {
    vec![
        ErrorPattern::new(
            "network_timeout",
            "Network timeout",
            r"(?i)(timeout|timed out|etimedout|network)",
            "network",
            Severity::Medium,
            "Check network connectivity or raise the request timeout",
        ),
        ErrorPattern::new(
            "memory_exhausted",
            "Memory exhausted",
            r"(?i)(out of memory|\boom\b|memory|allocation failed)",
            "resource",
            Severity::High,
            "Reduce batch size or free memory before retrying",
        ),
        ErrorPattern::new(
            "file_corruption",
            "File corruption",
            r"(?i)(corrupt|checksum|invalid header|malformed)",
            "data",
            Severity::High,
            "Re-fetch or regenerate the input file",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let catalog = PatternCatalog::with_defaults();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_classify_counts_occurrences() {
        let mut catalog = PatternCatalog::with_defaults();
        let error = PipelineError::new("fetch", "NETWORK_ERROR", "request timed out");
        let matched = catalog.classify(&error);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "network_timeout");

        catalog.classify(&error);
        let network = catalog
            .patterns()
            .into_iter()
            .find(|p| p.id == "network_timeout")
            .unwrap();
        assert_eq!(network.occurrences, 2);
        assert!(network.last_seen.is_some());
    }

    #[test]
    fn test_classify_matches_message() {
        let mut catalog = PatternCatalog::with_defaults();
        let error = PipelineError::new("parse", "PARSE_ERROR", "Checksum mismatch in page 3");
        let ids: Vec<_> = catalog.classify(&error).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["file_corruption"]);
    }

    #[test]
    fn test_add_replaces_and_rejects_bad_regex() {
        let mut catalog = PatternCatalog::with_defaults();
        let replacement = ErrorPattern::new("file_corruption", "Corrupt", "CORRUPT", "data", Severity::Low, "x");
        catalog.add(replacement).unwrap();
        assert_eq!(catalog.len(), 3);

        let bad = ErrorPattern::new("bad", "Bad", "([", "data", Severity::Low, "x");
        assert!(catalog.add(bad).is_err());
        assert_eq!(catalog.len(), 3);
    }
}
