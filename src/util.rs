//! Utility module for common functionality
//!
//! Shared helpers used across the SDK.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

/// Truncate a string to a maximum length, adding ellipsis if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s[..max_len].to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Bearer [A-Za-z0-9\-_\.]+", "Bearer [REDACTED]"),
        (r"token[=:]\s*[A-Za-z0-9\-_\.]+", "token=[REDACTED]"),
        (r"password[=:]\s*[^\s&]+", "password=[REDACTED]"),
    ]
    .iter()
    .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, *r)))
    .collect()
});

/// Sanitize a string for logging (redact credentials and tokens)
pub fn sanitize_for_logging(s: &str) -> String {
    let mut result = s.to_string();
    for (re, replacement) in SENSITIVE_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Generate a short correlation id for log lines
pub fn correlation_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Make a string safe for use as an HTTP header value.
///
/// Header values must be visible ASCII; anything else is replaced with `_`.
pub fn header_safe(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse a duration from a string (e.g., "500ms", "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if s.ends_with("ms") {
        s[..s.len() - 2].parse::<u64>().ok().map(Duration::from_millis)
    } else if s.ends_with('s') {
        s[..s.len() - 1].parse::<u64>().ok().map(Duration::from_secs)
    } else if s.ends_with('m') {
        s[..s.len() - 1]
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else if s.ends_with('h') {
        s[..s.len() - 1]
            .parse::<u64>()
            .ok()
            .map(|h| Duration::from_secs(h * 3600))
    } else {
        // Bare numbers are seconds
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
    }

    #[test]
    fn test_sanitize_for_logging() {
        let input = "Authorization: Bearer abc123.xyz";
        let output = sanitize_for_logging(input);
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("abc123"));
    }

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("get:/courses?page=2"), "get:/courses?page=2");
        assert_eq!(header_safe("café\n"), "caf__");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("60"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn test_correlation_id_is_short() {
        let id = correlation_id();
        assert_eq!(id.len(), 8);
    }
}
