//! # Data Access SDK
//!
//! The resilient data access layer for the Meridian LMS admin console.
//!
//! This crate turns an unreliable, possibly-absent backend into a
//! predictable data source:
//!
//! - Deduplication of concurrent identical GET requests (last-writer-wins)
//! - Retry with exponential backoff for transient failures
//! - A multi-tier fallback chain: live API, in-memory cache, secondary
//!   fallback service, bundled mock datasets, synthesized defaults
//! - Per-resource degradation tracking
//! - Exactly-once initialization of shared startup work
//!
//! ## Architecture
//!
//! [`RequestDispatcher`] is the façade callers use; [`DispatcherBuilder`]
//! is the composition root that wires it to the shared services
//! ([`ResourceRegistry`], [`DegradationTracker`], [`SessionStore`]). All
//! services are plain values shared via `Arc`; there are no process-wide
//! globals.

// Core request model and builder
pub mod core;
pub use self::core::{DataOrigin, DispatcherBuilder, Dispatched, HttpMethod, RequestDescriptor};

// Error handling
pub mod error;
pub use error::{DataError, Result};

// Configuration
pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, DataAccessConfig, FallbackTiers};

// Resilience primitives
pub mod resilience;
pub use resilience::{resource_key, DegradationTracker, RetryPolicy};

// Dispatch pipeline
pub mod dispatch;
pub use dispatch::{RequestDeduplicator, RequestDispatcher};

// Fallback resolution
pub mod fallback;
pub use fallback::{DirMockSource, FallbackResolver, MockDataSource, StaticMockSource};

// Shared registries
pub mod registry;
pub use registry::{InitializationGuard, ResourceRegistry};

// Persisted session state
pub mod session;
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionStore, SessionTokens};

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;

/// Create a new dispatcher builder
pub fn builder() -> DispatcherBuilder {
    DispatcherBuilder::new()
}
