//! Paths opted out of instrumentation

use std::collections::HashSet;

/// Set of request paths that every interceptor skips.
///
/// Paths are lower-cased when the set is built, but [`ExcludedPaths::is_excluded`]
/// compares the query path as given. A request to `/Health` therefore only
/// matches if the caller lower-cases it first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedPaths {
    paths: HashSet<String>,
}

impl ExcludedPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|path| path.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// An empty set; nothing is excluded.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        !self.paths.is_empty() && self.paths.contains(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_and_included_paths() {
        let exclusions = ExcludedPaths::new(["/test/1", "/test/3", "/test/5"]);

        for path in ["/test/1", "/test/3", "/test/5"] {
            assert!(exclusions.is_excluded(path), "{path} should be excluded");
        }
        for path in ["/test/2", "/test/4", "/test/6"] {
            assert!(!exclusions.is_excluded(path), "{path} should not be excluded");
        }
    }

    #[test]
    fn test_paths_collapse_after_lowercasing() {
        let exclusions = ExcludedPaths::new(["/test", "/TEST", "/test1"]);

        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.contains("/test"));
        assert!(exclusions.contains("/test1"));
    }

    #[test]
    fn test_query_path_is_compared_verbatim() {
        let exclusions = ExcludedPaths::new(["/Health"]);

        assert!(exclusions.is_excluded("/health"));
        assert!(!exclusions.is_excluded("/Health"));
        assert!(!exclusions.is_excluded("/HEALTH"));
    }

    #[test]
    fn test_empty_set_excludes_nothing() {
        let exclusions = ExcludedPaths::none();
        assert!(exclusions.is_empty());
        assert!(!exclusions.is_excluded("/"));
        assert!(!exclusions.is_excluded(""));
    }
}
