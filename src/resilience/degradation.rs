//! Per-resource degradation tracking
//!
//! Counts consecutive failures per logical resource type. Once the configured
//! threshold is reached the resource is reported as degraded, which callers
//! use to prefer fallback data over the primary API. There is no time-based
//! decay: only an explicit success resets a counter.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, warn};

/// Path segments that never identify a resource on their own
const GENERIC_SEGMENTS: [&str; 5] = ["api", "auth", "login", "health", "logout"];

/// Derive the logical resource key for a URL or path.
///
/// Strips an `/api` or `/fallback` prefix, then takes the first remaining
/// non-generic segment; falls back to the final segment when every segment
/// is generic, and to `None` only for an empty URL.
pub fn resource_key(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    // Accept both absolute URLs and bare paths
    let path = if url.contains("://") {
        match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        }
    } else {
        url.to_string()
    };

    let path = path.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let remaining: &[&str] = match segments.first() {
        Some(&"api") | Some(&"fallback") => &segments[1..],
        _ => &segments[..],
    };

    if let Some(seg) = remaining
        .iter()
        .find(|s| !GENERIC_SEGMENTS.contains(&s.to_lowercase().as_str()))
    {
        return Some(seg.to_string());
    }

    segments.last().map(|s| s.to_string())
}

/// Tracks consecutive failures per logical resource type
pub struct DegradationTracker {
    counts: Mutex<HashMap<String, u32>>,
    threshold: u32,
}

impl DegradationTracker {
    /// Create a tracker with the given degradation threshold
    pub fn new(threshold: u32) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            threshold,
        }
    }

    /// Record a retryable failure for a resource and return the new count.
    ///
    /// Logs a warning the moment the threshold is crossed.
    pub fn record_failure(&self, key: &str) -> u32 {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;

        if *count == self.threshold {
            warn!(
                "resource '{}' reached {} consecutive failures, treating as degraded",
                key, count
            );
        }

        *count
    }

    /// Record a success, resetting the counter for the resource.
    ///
    /// Idempotent: resetting an absent or already-zero counter is a no-op.
    pub fn record_success(&self, key: &str) {
        let mut counts = self.counts.lock().unwrap();
        if let Some(count) = counts.get_mut(key) {
            if *count > 0 {
                debug!("resource '{}' recovered after {} failures", key, count);
                *count = 0;
            }
        }
    }

    /// Current consecutive-failure count for a resource
    pub fn count(&self, key: &str) -> u32 {
        self.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Whether a resource has reached the degradation threshold
    pub fn is_degraded(&self, key: &str) -> bool {
        self.count(key) >= self.threshold
    }

    /// Configured threshold
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Clear all counters. Test isolation only.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self) {
        self.counts.lock().unwrap().clear();
    }
}
