//! Request dispatcher
//!
//! The façade callers use. A dispatch attaches tracing and auth headers,
//! deduplicates concurrent GETs, issues the transport call, retries
//! transient failures per the retry policy, keeps the degradation counters
//! current, and hands exhausted failures to the fallback resolver.

pub mod dedup;
pub use dedup::RequestDeduplicator;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::DataAccessConfig;
use crate::core::{Dispatched, HttpMethod, RequestDescriptor};
use crate::error::{mapping, DataError, Result};
use crate::fallback::FallbackResolver;
use crate::registry::ResourceRegistry;
use crate::resilience::{resource_key, DegradationTracker};
use crate::session::SessionStore;
use crate::util;

/// Default user agent string
const DEFAULT_USER_AGENT: &str =
    concat!("Meridian-Admin/", env!("CARGO_PKG_VERSION"), " (data-access-sdk)");

/// Build the shared HTTP client with default settings
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(|e| DataError::configuration(format!("failed to build HTTP client: {}", e)))
}

/// Callback invoked after a 401 has invalidated the session
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// The data access façade
pub struct RequestDispatcher {
    pub(crate) config: Arc<DataAccessConfig>,
    pub(crate) http: reqwest::Client,
    pub(crate) dedup: RequestDeduplicator,
    pub(crate) degradation: Arc<DegradationTracker>,
    pub(crate) registry: Arc<ResourceRegistry>,
    pub(crate) fallback: FallbackResolver,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) on_session_expired: Option<SessionExpiredHook>,
}

impl RequestDispatcher {
    /// Dispatch a request with no external cancellation
    pub async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<Dispatched> {
        self.dispatch_with_token(descriptor, None).await
    }

    /// Dispatch a request the caller can cancel through an explicit token.
    ///
    /// A cancelled request consumes no retry budget, never reaches the
    /// fallback resolver and surfaces as `DataError::Cancelled`.
    pub async fn dispatch_with_token(
        &self,
        descriptor: RequestDescriptor,
        caller: Option<&CancellationToken>,
    ) -> Result<Dispatched> {
        let fingerprint = descriptor.fingerprint();
        let cid = util::correlation_id();

        // Only GETs are deduplicated; superseding a mutation would lose a
        // side effect.
        let dedup_entry = if descriptor.method == HttpMethod::Get {
            Some(self.dedup.register(&fingerprint))
        } else {
            None
        };
        let token = dedup_entry
            .as_ref()
            .map(|(_, t)| t.clone())
            .unwrap_or_default();

        debug!(
            "[{}] dispatching {} {}",
            cid,
            descriptor.method,
            util::sanitize_for_logging(&fingerprint)
        );

        let result = self
            .run(&descriptor, &fingerprint, &cid, &token, caller)
            .await;

        if let Some((id, _)) = dedup_entry {
            self.dedup.settle(&fingerprint, id);
        }

        result
    }

    /// Dispatch and deserialize the payload at the boundary
    pub async fn fetch<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        let dispatched = self.dispatch(descriptor).await?;
        if dispatched.origin.is_fallback() {
            info!("serving data from {} source", dispatched.origin);
        }
        serde_json::from_value(dispatched.value).map_err(DataError::from)
    }

    /// GET a path
    pub async fn get_json(&self, path: &str) -> Result<Dispatched> {
        self.dispatch(RequestDescriptor::get(path)).await
    }

    /// POST a JSON body to a path
    pub async fn post_json(&self, path: &str, body: Value) -> Result<Dispatched> {
        self.dispatch(RequestDescriptor::post(path, body)).await
    }

    /// PUT a JSON body to a path
    pub async fn put_json(&self, path: &str, body: Value) -> Result<Dispatched> {
        self.dispatch(RequestDescriptor::put(path, body)).await
    }

    /// PATCH a JSON body at a path
    pub async fn patch_json(&self, path: &str, body: Value) -> Result<Dispatched> {
        self.dispatch(RequestDescriptor::patch(path, body)).await
    }

    /// DELETE a path
    pub async fn delete_json(&self, path: &str) -> Result<Dispatched> {
        self.dispatch(RequestDescriptor::delete(path)).await
    }

    /// Shared resource registry
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Degradation tracker
    pub fn degradation(&self) -> &Arc<DegradationTracker> {
        &self.degradation
    }

    /// Session store
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Active configuration
    pub fn config(&self) -> &DataAccessConfig {
        &self.config
    }

    /// Retry loop around the transport call
    async fn run(
        &self,
        descriptor: &RequestDescriptor,
        fingerprint: &str,
        cid: &str,
        token: &CancellationToken,
        caller: Option<&CancellationToken>,
    ) -> Result<Dispatched> {
        let resource = resource_key(&descriptor.path);

        if let Some(ref key) = resource {
            if self.degradation.is_degraded(key) {
                warn!(
                    "[{}] resource '{}' is degraded ({} consecutive failures)",
                    cid,
                    key,
                    self.degradation.count(key)
                );
            }
        }

        let mut attempt: u32 = 0;
        let error = loop {
            let outcome = tokio::select! {
                _ = cancelled_any(token, caller) => return Err(DataError::Cancelled),
                res = self.send_once(descriptor, fingerprint) => res,
            };

            match outcome {
                Ok(value) => {
                    // Reset applies synchronously on the success path so
                    // later callers see a clean counter
                    if let Some(ref key) = resource {
                        self.degradation.record_success(key);
                    }
                    if descriptor.method == HttpMethod::Get {
                        self.registry.set_cached(fingerprint, value.clone());
                    }
                    return Ok(Dispatched::live(value));
                }
                Err(e) if e.is_cancelled() => return Err(DataError::Cancelled),
                Err(e) => {
                    if self.config.retry.should_retry(&e, attempt) {
                        if let Some(ref key) = resource {
                            self.degradation.record_failure(key);
                        }
                        let delay = self.config.retry.delay_for(attempt);
                        warn!(
                            "[{}] attempt {}/{} failed ({}), retrying in {:?}",
                            cid,
                            attempt + 1,
                            self.config.retry.max_attempts(),
                            e,
                            delay
                        );
                        // A cancellation during the wait must not fire the
                        // retried call
                        tokio::select! {
                            _ = cancelled_any(token, caller) => return Err(DataError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        attempt += 1;
                    } else {
                        break e;
                    }
                }
            }
        };

        self.handle_failure(descriptor, fingerprint, cid, resource, error)
            .await
    }

    /// Terminal-failure policy: session invalidation, propagation or
    /// fallback resolution
    async fn handle_failure(
        &self,
        descriptor: &RequestDescriptor,
        fingerprint: &str,
        cid: &str,
        resource: Option<String>,
        error: DataError,
    ) -> Result<Dispatched> {
        match &error {
            DataError::Client { status: 401, .. } => {
                warn!("[{}] session rejected (401), clearing persisted auth state", cid);
                if let Err(e) = self.session.clear_session() {
                    warn!("[{}] failed to clear session: {}", cid, e);
                }
                if let Some(ref hook) = self.on_session_expired {
                    hook();
                }
                Err(error)
            }
            // Client errors and malformed live responses never reach the
            // mock tiers
            DataError::Client { .. }
            | DataError::Malformed(_)
            | DataError::Configuration(_)
            | DataError::Storage(_)
            | DataError::Cancelled => Err(error),
            DataError::Timeout(_) | DataError::Network(_) | DataError::Server { .. } => {
                match resource {
                    Some(key) => {
                        warn!(
                            "[{}] retries exhausted for '{}', entering fallback resolution",
                            cid, key
                        );
                        self.fallback
                            .resolve(&key, descriptor.method, fingerprint, error)
                            .await
                    }
                    None => Err(error),
                }
            }
        }
    }

    /// One transport attempt
    async fn send_once(&self, descriptor: &RequestDescriptor, fingerprint: &str) -> Result<Value> {
        let url = format!(
            "{}{}",
            self.config.api_base.trim_end_matches('/'),
            descriptor.path
        );

        let mut request = self.http.request(descriptor.method.to_reqwest(), &url);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(ref body) = descriptor.body {
            request = request.json(body);
        }

        request = request.header("X-Request-ID", util::header_safe(fingerprint));
        for (key, value) in &descriptor.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        // Public paths are reachable pre-login and never carry credentials
        if !self.config.is_public_path(&descriptor.path) {
            if let Some(token) = self.session.token() {
                request = request.header(
                    reqwest::header::AUTHORIZATION,
                    format!("Bearer {}", token),
                );
            }
        }

        let response = request.send().await.map_err(DataError::from)?;
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            response.json::<Value>().await.map_err(DataError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(mapping::map_http_error(status, &body))
        }
    }
}

/// Resolve as soon as either token is cancelled
async fn cancelled_any(token: &CancellationToken, caller: Option<&CancellationToken>) {
    match caller {
        Some(c) => tokio::select! {
            _ = token.cancelled() => {}
            _ = c.cancelled() => {}
        },
        None => token.cancelled().await,
    }
}
