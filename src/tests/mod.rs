//! Tests for the data access SDK
//!
//! Pure-logic tests live next to their modules; everything here exercises
//! components against each other and against a mock HTTP server.

mod fallback_tests;
mod session_tests;

use std::time::Duration;

use crate::config::{DataAccessConfig, FallbackTiers};
use crate::resilience::RetryPolicy;

/// A retry policy with delays short enough for tests
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        ..RetryPolicy::default()
    }
}

/// A config pointed at a mock server with every fallback tier disabled,
/// so dispatch behavior can be observed in isolation
pub fn bare_config(api_base: &str) -> DataAccessConfig {
    DataAccessConfig {
        api_base: api_base.to_string(),
        fallback_base: format!("{}/fallback", api_base),
        timeout: Duration::from_secs(5),
        retry: fast_retry(2),
        tiers: FallbackTiers {
            cache: false,
            fallback_service: false,
            mock: false,
            synthesize: false,
        },
        ..DataAccessConfig::default()
    }
}
