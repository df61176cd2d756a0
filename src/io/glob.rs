//! Glob expansion for source discovery.
//!
//! Local sources expand through the `glob` crate directly. Object stores cannot be
//! walked, so [`literal_prefix`] finds the listing prefix and [`matches`] filters
//! the listed keys.

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use std::path::PathBuf;

/// Regular files matching `pattern`, sorted.
///
/// Directories are left out. No match is an empty vector, not an error.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched path cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = glob(pattern)
        .with_context(|| format!("bad glob {pattern:?}"))?
        .filter(|entry| entry.as_ref().map_or(true, |p| p.is_file()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("expand {pattern:?}"))?;
    files.sort();
    Ok(files)
}

/// The part of `pattern` before its first wildcard (`*`, `?` or `[`).
#[must_use]
pub fn literal_prefix(pattern: &str) -> &str {
    pattern
        .find(['*', '?', '['])
        .map_or(pattern, |i| &pattern[..i])
}

/// Whether `candidate` matches the glob `pattern`.
///
/// # Errors
///
/// Returns an error if the pattern is invalid.
pub fn matches(pattern: &str, candidate: &str) -> Result<bool> {
    Ok(Pattern::new(pattern)
        .with_context(|| format!("bad glob {pattern:?}"))?
        .matches(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_stops_at_first_wildcard() {
        assert_eq!(literal_prefix("logs/2019-02-07-00*"), "logs/2019-02-07-00");
        assert_eq!(literal_prefix("a/b?c"), "a/b");
        assert_eq!(literal_prefix("plain"), "plain");
    }

    #[test]
    fn matches_keys() {
        assert!(matches("logs/2019-02-07-00*", "logs/2019-02-07-00-10-11-AAAA").unwrap());
        assert!(!matches("logs/2019-02-07-00*", "logs/2019-02-07-01-10-11-AAAA").unwrap());
        assert!(matches("[", "x").is_err());
    }
}
