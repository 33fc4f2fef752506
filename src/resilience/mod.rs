//! Resilience primitives for the dispatch pipeline
//!
//! - Retry policy with exponential backoff and jitter
//! - Per-resource degradation tracking

mod degradation;
mod retry;

pub use degradation::{resource_key, DegradationTracker};
pub use retry::RetryPolicy;
