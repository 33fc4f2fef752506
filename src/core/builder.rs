//! Dispatcher builder
//!
//! The composition root for the data access layer. The process-wide
//! services (registry, degradation tracker, session storage) are
//! constructed here and shared explicitly; pass your own `Arc`s to share
//! them with other parts of the application.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigProvider, DataAccessConfig};
use crate::dispatch::{build_http_client, RequestDeduplicator, RequestDispatcher, SessionExpiredHook};
use crate::error::Result;
use crate::fallback::{FallbackResolver, MockDataSource, MockResolver, StaticMockSource};
use crate::registry::ResourceRegistry;
use crate::resilience::{DegradationTracker, RetryPolicy};
use crate::session::{KeyValueStore, MemoryStore, SessionStore};

/// Builder for [`RequestDispatcher`]
#[derive(Default)]
pub struct DispatcherBuilder {
    config: Option<DataAccessConfig>,
    registry: Option<Arc<ResourceRegistry>>,
    degradation: Option<Arc<DegradationTracker>>,
    storage: Option<Arc<dyn KeyValueStore>>,
    mock_source: Option<Arc<dyn MockDataSource>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl DispatcherBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a complete configuration
    pub fn config(mut self, config: DataAccessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from a provider (environment, memory, composite)
    pub fn config_from_provider<P: ConfigProvider + ?Sized>(
        mut self,
        provider: &P,
    ) -> Result<Self> {
        self.config = Some(DataAccessConfig::from_provider(provider)?);
        Ok(self)
    }

    /// Load configuration from the `MERIDIAN_*` environment variables
    pub fn config_from_env(self) -> Result<Self> {
        self.config_from_provider(&**crate::config::DEFAULT_PROVIDER)
    }

    fn config_mut(&mut self) -> &mut DataAccessConfig {
        self.config.get_or_insert_with(DataAccessConfig::default)
    }

    /// Set the primary API base URL
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config_mut().api_base = url.into();
        self
    }

    /// Set the fallback service base URL
    pub fn fallback_base(mut self, url: impl Into<String>) -> Self {
        self.config_mut().fallback_base = url.into();
        self
    }

    /// Set the per-request transport timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_mut().timeout = timeout;
        self
    }

    /// Configure retry behavior
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config_mut().retry = policy;
        self
    }

    /// Share an existing resource registry
    pub fn registry(mut self, registry: Arc<ResourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing degradation tracker
    pub fn degradation(mut self, tracker: Arc<DegradationTracker>) -> Self {
        self.degradation = Some(tracker);
        self
    }

    /// Use a specific key/value store for session state
    pub fn storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(store);
        self
    }

    /// Use a specific mock dataset source
    pub fn mock_source(mut self, source: Arc<dyn MockDataSource>) -> Self {
        self.mock_source = Some(source);
        self
    }

    /// Invoke a callback after a 401 has invalidated the session
    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Result<RequestDispatcher> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let config = Arc::new(config);

        let http = build_http_client(config.timeout)?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ResourceRegistry::new(config.cache_ttl)));
        let degradation = self
            .degradation
            .unwrap_or_else(|| Arc::new(DegradationTracker::new(config.degradation_threshold)));

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let session = Arc::new(SessionStore::new(storage, config.storage_prefix.clone()));

        let mock_source = self
            .mock_source
            .unwrap_or_else(|| Arc::new(StaticMockSource::new()) as Arc<dyn MockDataSource>);
        let mock = MockResolver::new(config.mock_root.clone(), mock_source);

        let fallback = FallbackResolver::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            mock,
            http.clone(),
        );

        Ok(RequestDispatcher {
            config,
            http,
            dedup: RequestDeduplicator::new(),
            degradation,
            registry,
            fallback,
            session,
            on_session_expired: self.on_session_expired,
        })
    }
}
