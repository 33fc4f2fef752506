//! Bundled mock dataset resolution
//!
//! Mock datasets are an opaque keyed collection of JSON documents addressed
//! by `{root}/{resource_type}/{method}.json`. The layout root is chosen once
//! at startup through configuration; per request the only ordering is the
//! semantic one: the method-specific document first, then the generic `get`
//! document.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::core::HttpMethod;

/// Source of raw mock documents, keyed by relative path
#[async_trait]
pub trait MockDataSource: Send + Sync {
    /// Load the raw text of a document, or `None` if it does not exist
    async fn load(&self, path: &str) -> Option<String>;
}

/// Mock source reading documents from a directory tree
pub struct DirMockSource {
    root: PathBuf,
}

impl DirMockSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MockDataSource for DirMockSource {
    async fn load(&self, path: &str) -> Option<String> {
        tokio::fs::read_to_string(self.root.join(path)).await.ok()
    }
}

/// Mock source over an in-memory document map (bundled datasets, tests)
#[derive(Default)]
pub struct StaticMockSource {
    entries: HashMap<String, String>,
}

impl StaticMockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under a path (builder style)
    pub fn with(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.entries.insert(path.into(), body.into());
        self
    }
}

#[async_trait]
impl MockDataSource for StaticMockSource {
    async fn load(&self, path: &str) -> Option<String> {
        self.entries.get(path).cloned()
    }
}

/// Resolves `{resource_type, method}` to the first mock document that loads
/// and parses
pub struct MockResolver {
    root: String,
    source: Arc<dyn MockDataSource>,
}

impl MockResolver {
    pub fn new(root: impl Into<String>, source: Arc<dyn MockDataSource>) -> Self {
        Self {
            root: root.into(),
            source,
        }
    }

    /// Ordered candidate paths for a resource type and method
    pub fn candidates(&self, resource_type: &str, method: HttpMethod) -> Vec<String> {
        let prefix = if self.root.is_empty() {
            String::new()
        } else {
            format!("{}/", self.root.trim_end_matches('/'))
        };

        let mut out = vec![format!(
            "{}{}/{}.json",
            prefix,
            resource_type,
            method.as_str()
        )];
        if method != HttpMethod::Get {
            out.push(format!("{}{}/get.json", prefix, resource_type));
        }
        out
    }

    /// Try each candidate in order, returning the first that loads and
    /// parses as JSON. Every attempt and its outcome is logged. A document
    /// that fails to parse is treated as absent and resolution continues.
    pub async fn resolve(&self, resource_type: &str, method: HttpMethod) -> Option<Value> {
        for candidate in self.candidates(resource_type, method) {
            match self.source.load(&candidate).await {
                None => debug!("mock candidate '{}': absent", candidate),
                Some(raw) => match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        debug!("mock candidate '{}': loaded", candidate);
                        return Some(value);
                    }
                    Err(e) => {
                        warn!("mock candidate '{}': unparseable, skipping: {}", candidate, e);
                    }
                },
            }
        }

        debug!(
            "no mock candidate available for '{}' ({})",
            resource_type, method
        );
        None
    }
}
