//! Configuration management for the data access SDK
//!
//! Provides configuration loading with environment variable support and the
//! validated [`DataAccessConfig`] consumed by the dispatcher. Layout
//! decisions that the resolver chain depends on (fallback base path, mock
//! root, tier toggles) are made here, once, at startup.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::error::{DataError, Result};
use crate::resilience::RetryPolicy;
use crate::util::parse_duration;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.parse::<i64>().map_err(|e| {
            DataError::configuration(format!("invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(DataError::configuration(format!(
                "invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a duration configuration value (e.g. "500ms", "10s")
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value).ok_or_else(|| {
            DataError::configuration(format!("invalid duration for key {}: {}", key, value))
        })
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get a duration configuration value with a default
    fn get_duration_or(&self, key: &str, default: Duration) -> Duration {
        self.get_duration(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                DataError::configuration(format!("environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => DataError::configuration(format!(
                "environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| DataError::configuration(format!("configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the chain
    pub fn add_provider(&mut self, provider: Arc<dyn ConfigProvider>) {
        self.providers.push(provider);
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        for provider in &self.providers {
            if let Ok(value) = provider.get_string(key) {
                return Ok(value);
            }
        }

        Err(DataError::configuration(format!(
            "configuration key not found in any provider: {}",
            key
        )))
    }
}

/// Global default configuration provider
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("MERIDIAN")));

/// Per-tier enable flags for the fallback resolution chain.
///
/// A disabled tier is skipped without being attempted.
#[derive(Debug, Clone)]
pub struct FallbackTiers {
    /// Tier 2: in-memory cache lookup
    pub cache: bool,
    /// Tier 3: secondary fallback HTTP service
    pub fallback_service: bool,
    /// Tier 4: bundled mock datasets
    pub mock: bool,
    /// Tier 5: synthesized defaults
    pub synthesize: bool,
}

impl Default for FallbackTiers {
    fn default() -> Self {
        Self {
            cache: true,
            fallback_service: true,
            mock: true,
            synthesize: true,
        }
    }
}

/// Configuration for the data access layer
#[derive(Debug, Clone)]
pub struct DataAccessConfig {
    /// Base URL of the primary API
    pub api_base: String,

    /// Base URL of the secondary fallback service
    pub fallback_base: String,

    /// Per-request transport timeout
    pub timeout: Duration,

    /// TTL for opportunistically cached responses
    pub cache_ttl: Duration,

    /// Consecutive failures before a resource is considered degraded
    pub degradation_threshold: u32,

    /// Namespace prefix for persisted session keys
    pub storage_prefix: String,

    /// Root under which mock datasets are addressed
    pub mock_root: String,

    /// Path prefixes that never receive an Authorization header
    pub public_paths: Vec<String>,

    /// Fallback tier toggles
    pub tiers: FallbackTiers,

    /// Retry behavior for transient failures
    pub retry: RetryPolicy,
}

impl Default for DataAccessConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".to_string(),
            fallback_base: "http://localhost:8080/fallback".to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            degradation_threshold: 3,
            storage_prefix: "meridian.".to_string(),
            mock_root: "mock".to_string(),
            public_paths: default_public_paths(),
            tiers: FallbackTiers::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// The fixed set of pre-login path prefixes
fn default_public_paths() -> Vec<String> {
    [
        "/auth/login",
        "/auth/register",
        "/auth/password-reset",
        "/public/health",
        "/public/version",
        "/public/config",
        "/public/notifications",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl DataAccessConfig {
    /// Load configuration from a config provider, falling back to defaults
    /// for unset keys
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_base: provider.get_string_or("api_base", &defaults.api_base),
            fallback_base: provider.get_string_or("fallback_base", &defaults.fallback_base),
            timeout: provider.get_duration_or("timeout", defaults.timeout),
            cache_ttl: provider.get_duration_or("cache_ttl", defaults.cache_ttl),
            degradation_threshold: provider
                .get_int_or("degradation_threshold", defaults.degradation_threshold as i64)
                as u32,
            storage_prefix: provider.get_string_or("storage_prefix", &defaults.storage_prefix),
            mock_root: provider.get_string_or("mock_root", &defaults.mock_root),
            public_paths: defaults.public_paths,
            tiers: FallbackTiers {
                cache: provider.get_bool_or("tier_cache", true),
                fallback_service: provider.get_bool_or("tier_fallback_service", true),
                mock: provider.get_bool_or("tier_mock", true),
                synthesize: provider.get_bool_or("tier_synthesize", true),
            },
            retry: RetryPolicy {
                max_retries: provider.get_int_or("max_retries", 3) as u32,
                base_delay: provider
                    .get_duration_or("retry_base_delay", Duration::from_millis(300)),
                ..RetryPolicy::default()
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() {
            return Err(DataError::configuration("API base URL is required"));
        }

        if self.tiers.fallback_service && self.fallback_base.is_empty() {
            return Err(DataError::configuration(
                "fallback base URL is required when the fallback service tier is enabled",
            ));
        }

        if self.degradation_threshold == 0 {
            return Err(DataError::configuration(
                "degradation threshold must be at least 1",
            ));
        }

        Ok(())
    }

    /// Whether a request path is on the public allow-list
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
    }
}
