//! Metric name normalization

use regex::Regex;
use std::sync::OnceLock;

struct NamingPatterns {
    whitespace: Regex,
    separator: Regex,
}

static PATTERNS: OnceLock<NamingPatterns> = OnceLock::new();

fn patterns() -> &'static NamingPatterns {
    PATTERNS.get_or_init(|| NamingPatterns {
        whitespace: Regex::new(r"\s+").unwrap(),
        separator: Regex::new(r"[ ./:_-]").unwrap(),
    })
}

/// Convert a display name into a metric-safe identifier.
///
/// Whitespace runs collapse to a single `_`, every remaining separator
/// (` ./:_-`) becomes `_`, and the result is lower-cased.
pub fn normalize(name: &str) -> String {
    let patterns = patterns();
    let collapsed = patterns.whitespace.replace_all(name, "_");
    patterns
        .separator
        .replace_all(&collapsed.to_lowercase(), "_")
        .into_owned()
}
