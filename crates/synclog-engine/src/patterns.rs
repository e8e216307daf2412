//! Message templates the mining process writes, and the captures read from them.
//!
//! A template that does not match is an ordinary outcome, not an error: every
//! parser here returns `Option` or a zero default.

use std::sync::LazyLock;

use regex::Regex;

static SOURCE_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The browser is the last parenthesised group; the label is everything before it.
    Regex::new(r"Mining source: (.+) \(([^()]+)\)").expect("valid source anchor regex")
});

static URL_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Reading content from: (\S+)").expect("valid url anchor regex")
});

static URL_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found (\d+) URLs").expect("valid url count regex"));

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)%\)").expect("valid percent regex"));

static PERCENT_REASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)%\): (.+)").expect("valid percent reason regex"));

/// Token a source-finished message must contain.
pub const SOURCE_FINISHED_TOKEN: &str = "Found";
/// Token a signal outcome message must contain.
pub const SIGNAL_TOKEN: &str = "Found signal";
/// Token a skipped outcome message must contain.
pub const SKIPPED_TOKEN: &str = "Irrelevant content";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAnchor<'a> {
    pub label: &'a str,
    pub browser: &'a str,
}

/// Parses `Mining source: <label> (<browser>)`.
#[must_use]
pub fn parse_source_anchor(message: &str) -> Option<SourceAnchor<'_>> {
    let caps = SOURCE_ANCHOR_RE.captures(message)?;
    let label = caps.get(1)?.as_str().trim();
    let browser = caps.get(2)?.as_str().trim();
    if label.is_empty() {
        return None;
    }
    Some(SourceAnchor { label, browser })
}

/// Parses `Reading content from: <url>`.
#[must_use]
pub fn parse_url_anchor(message: &str) -> Option<&str> {
    URL_ANCHOR_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Reads `N` from `Found N URLs`, or 0.
#[must_use]
pub fn parse_url_count(message: &str) -> u64 {
    URL_COUNT_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Reads `N` from `(N%)`, or 0.
#[must_use]
pub fn parse_percent(message: &str) -> u32 {
    PERCENT_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Reads `(N%): reason`. Both are absent unless the whole template matches.
#[must_use]
pub fn parse_percent_reason(message: &str) -> Option<(u32, &str)> {
    let caps = PERCENT_REASON_RE.captures(message)?;
    let score = caps.get(1)?.as_str().parse::<u32>().unwrap_or(0);
    let reason = caps.get(2)?.as_str().trim();
    Some((score, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_anchor_captures_label_and_browser() {
        let anchor = parse_source_anchor("Mining source: NewsSite (chrome)").expect("anchor");
        assert_eq!(anchor.label, "NewsSite");
        assert_eq!(anchor.browser, "chrome");
    }

    #[test]
    fn source_anchor_label_may_contain_parentheses() {
        let anchor =
            parse_source_anchor("Mining source: Hacker News (Top) (firefox)").expect("anchor");
        assert_eq!(anchor.label, "Hacker News (Top)");
        assert_eq!(anchor.browser, "firefox");
    }

    #[test]
    fn source_anchor_rejects_other_mining_messages() {
        assert!(parse_source_anchor("Mining: Found 3 URLs (NewsSite)").is_none());
        assert!(parse_source_anchor("Mining source: NewsSite").is_none());
    }

    #[test]
    fn url_anchor_stops_at_whitespace() {
        assert_eq!(
            parse_url_anchor("Reading content from: https://a.example/x?y=1 (attempt 2)"),
            Some("https://a.example/x?y=1")
        );
        assert_eq!(parse_url_anchor("Reading content"), None);
    }

    #[test]
    fn url_count_reads_digits() {
        assert_eq!(parse_url_count("Found 17 URLs"), 17);
        assert_eq!(parse_url_count("Mining: Found 3 URLs (NewsSite)"), 3);
    }

    #[test]
    fn url_count_defaults_to_zero() {
        assert_eq!(parse_url_count("Found many URLs"), 0);
        assert_eq!(parse_url_count(""), 0);
    }

    #[test]
    fn percent_reads_score() {
        assert_eq!(parse_percent("Found signal (92%)"), 92);
        assert_eq!(parse_percent("Found signal"), 0);
        assert_eq!(parse_percent("Found signal (99999999999%)"), 0);
    }

    #[test]
    fn percent_reason_requires_full_template() {
        assert_eq!(
            parse_percent_reason("Irrelevant content (12%): off topic"),
            Some((12, "off topic"))
        );
        assert_eq!(parse_percent_reason("Irrelevant content (12%)"), None);
    }
}
