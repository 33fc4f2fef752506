//! Core request model for the data access SDK
//!
//! This module provides the fundamental types the rest of the SDK is built
//! around:
//!
//! - `HttpMethod`: the verbs the dispatcher understands
//! - `RequestDescriptor`: a serializable description of an outbound request
//! - the deterministic request fingerprint used for dedup and caching
//! - `DataOrigin`/`Dispatched`: which tier a result came from

pub mod builder;
pub use builder::DispatcherBuilder;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// HTTP verbs supported by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Lowercase name, as used in mock dataset paths
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }

    /// Whether this verb has side effects on the backend.
    ///
    /// Mutating requests are never deduplicated or silently superseded.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }

    /// Convert to the reqwest method type
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A description of an outbound request.
///
/// Two descriptors are equivalent iff their fingerprints match. Query
/// parameters live in a `BTreeMap` so serialization order is stable and the
/// fingerprint is deterministic.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    /// Path relative to the configured API base, starting with `/`
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Extra headers for this request; not part of the fingerprint
    pub headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given method and path
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    /// Create a GET descriptor
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a POST descriptor with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut d = Self::new(HttpMethod::Post, path);
        d.body = Some(body);
        d
    }

    /// Create a PUT descriptor with a JSON body
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        let mut d = Self::new(HttpMethod::Put, path);
        d.body = Some(body);
        d
    }

    /// Create a DELETE descriptor
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Create a PATCH descriptor with a JSON body
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        let mut d = Self::new(HttpMethod::Patch, path);
        d.body = Some(body);
        d
    }

    /// Add a query parameter (builder style)
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header (builder style)
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Deterministic fingerprint of method + path + query + body.
    ///
    /// Used as the dedup key, the cache key and the `X-Request-ID` value.
    /// Headers are deliberately excluded: two requests differing only in
    /// headers address the same resource.
    pub fn fingerprint(&self) -> String {
        let mut fp = String::with_capacity(64);
        fp.push_str(self.method.as_str());
        fp.push(':');
        fp.push_str(&self.path);
        if !self.query.is_empty() {
            fp.push('?');
            let mut first = true;
            for (k, v) in &self.query {
                if !first {
                    fp.push('&');
                }
                fp.push_str(k);
                fp.push('=');
                fp.push_str(v);
                first = false;
            }
        }
        if let Some(ref body) = self.body {
            fp.push(':');
            // serde_json maps are sorted by key, so this is stable
            fp.push_str(&body.to_string());
        }
        fp
    }
}

/// Which tier ultimately produced a dispatch result.
///
/// Lets the caller show an "offline/sample data" notice without inspecting
/// the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// The live backend answered
    Live,
    /// Served from the in-memory cache
    Cache,
    /// Served by the secondary fallback HTTP service
    FallbackService,
    /// Served from a bundled mock dataset
    Mock,
    /// Synthesized default, nothing else was available
    Synthesized,
}

impl DataOrigin {
    /// True for anything other than a live backend response
    pub fn is_fallback(&self) -> bool {
        !matches!(self, DataOrigin::Live)
    }
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Live => write!(f, "live"),
            DataOrigin::Cache => write!(f, "cache"),
            DataOrigin::FallbackService => write!(f, "fallback-service"),
            DataOrigin::Mock => write!(f, "mock"),
            DataOrigin::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// A dispatch result: the payload plus where it came from
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub value: Value,
    pub origin: DataOrigin,
}

impl Dispatched {
    pub fn live(value: Value) -> Self {
        Self {
            value,
            origin: DataOrigin::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = RequestDescriptor::get("/courses")
            .with_query("page", "2")
            .with_query("size", "20");
        let b = RequestDescriptor::get("/courses")
            .with_query("size", "20")
            .with_query("page", "2");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_method_path_body() {
        let get = RequestDescriptor::get("/courses");
        let delete = RequestDescriptor::delete("/courses");
        assert_ne!(get.fingerprint(), delete.fingerprint());

        let a = RequestDescriptor::post("/grades", json!({"score": 90}));
        let b = RequestDescriptor::post("/grades", json!({"score": 91}));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_headers_do_not_affect_fingerprint() {
        let a = RequestDescriptor::get("/courses");
        let b = RequestDescriptor::get("/courses").with_header("X-Trace", "abc");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_mutating_classification() {
        assert!(!HttpMethod::Get.is_mutating());
        assert!(HttpMethod::Post.is_mutating());
        assert!(HttpMethod::Put.is_mutating());
        assert!(HttpMethod::Delete.is_mutating());
        assert!(HttpMethod::Patch.is_mutating());
    }
}
