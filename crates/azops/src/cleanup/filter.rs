//! Resource group name filtering.

use glob::{MatchOptions, Pattern};

use crate::errors::ConfigError;

/// Azure resource group names are case-insensitive.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A set of name globs; a name is selected when any glob matches.
#[derive(Debug, Clone)]
pub struct NameFilter {
    patterns: Vec<Pattern>,
}

impl NameFilter {
    /// Compile the given glob patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref().trim();
                Pattern::new(p).map_err(|e| {
                    ConfigError::invalid(format!("invalid name pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Whether no pattern is configured (nothing can match).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `name` matches at least one pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        let filter = NameFilter::new(["*-test-*", "tmp-??"]).unwrap();
        assert!(filter.matches("proj-test-01"));
        assert!(filter.matches("tmp-ab"));
        assert!(!filter.matches("tmp-abc"));
        assert!(!filter.matches("prod-core"));
    }

    #[test]
    fn test_case_insensitive() {
        let filter = NameFilter::new(["Proj-*"]).unwrap();
        assert!(filter.matches("PROJ-TEST-01"));
        assert!(filter.matches("proj-test-01"));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = NameFilter::new(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert!(!filter.matches("anything"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = NameFilter::new(["[unclosed"]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }
}
