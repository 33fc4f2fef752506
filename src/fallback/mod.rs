//! Multi-tier fallback resolution
//!
//! When the live API has failed permanently, the resolver walks a strict
//! tier order and returns the first tier that produces data:
//!
//! 1. in-memory cache (exact fingerprint match)
//! 2. secondary fallback HTTP service
//! 3. bundled mock datasets
//! 4. synthesized default
//!
//! Disabled tiers are skipped without being attempted. Only the synthesized
//! default is guaranteed to produce something; when it too is disabled the
//! original transport error is handed back to the caller.

pub mod mock;
pub use mock::{DirMockSource, MockDataSource, MockResolver, StaticMockSource};

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{json, Value};

use crate::config::DataAccessConfig;
use crate::core::{DataOrigin, Dispatched, HttpMethod};
use crate::error::{DataError, Result};
use crate::registry::ResourceRegistry;

/// Resolves data for a resource once the live API is out of the picture
pub struct FallbackResolver {
    config: Arc<DataAccessConfig>,
    registry: Arc<ResourceRegistry>,
    mock: MockResolver,
    http: reqwest::Client,
}

impl FallbackResolver {
    pub fn new(
        config: Arc<DataAccessConfig>,
        registry: Arc<ResourceRegistry>,
        mock: MockResolver,
        http: reqwest::Client,
    ) -> Self {
        Self {
            config,
            registry,
            mock,
            http,
        }
    }

    /// Walk the tier chain for a resource.
    ///
    /// `original` is the error the live call failed with; it is returned
    /// unchanged if every tier comes up empty.
    pub async fn resolve(
        &self,
        resource_type: &str,
        method: HttpMethod,
        fingerprint: &str,
        original: DataError,
    ) -> Result<Dispatched> {
        // Tier: in-memory cache
        if self.config.tiers.cache {
            if let Some(value) = self.registry.cached(fingerprint) {
                debug!("fallback for '{}': served from cache", resource_type);
                return Ok(Dispatched {
                    value,
                    origin: DataOrigin::Cache,
                });
            }
        }

        // Tier: secondary fallback service
        if self.config.tiers.fallback_service {
            match self.try_fallback_service(resource_type, method).await {
                Ok(value) => {
                    info!("fallback for '{}': served by fallback service", resource_type);
                    self.registry.set_cached(fingerprint, value.clone());
                    return Ok(Dispatched {
                        value,
                        origin: DataOrigin::FallbackService,
                    });
                }
                Err(e) => {
                    debug!("fallback service unavailable for '{}': {}", resource_type, e);
                }
            }
        }

        // Tier: bundled mock datasets
        if self.config.tiers.mock {
            if let Some(value) = self.mock.resolve(resource_type, method).await {
                info!("fallback for '{}': served from mock dataset", resource_type);
                self.registry.set_cached(fingerprint, value.clone());
                return Ok(Dispatched {
                    value,
                    origin: DataOrigin::Mock,
                });
            }
        }

        // Tier: synthesized default
        if self.config.tiers.synthesize {
            warn!(
                "all fallback tiers empty for '{}', synthesizing {} default",
                resource_type, method
            );
            return Ok(Dispatched {
                value: synthesized_default(method),
                origin: DataOrigin::Synthesized,
            });
        }

        Err(original)
    }

    /// Query the fallback service. If the shared transport fails, the same
    /// logical request is retried once over a freshly built client before
    /// this tier gives up.
    async fn try_fallback_service(
        &self,
        resource_type: &str,
        method: HttpMethod,
    ) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.config.fallback_base.trim_end_matches('/'),
            resource_type
        );

        match self.request_json(&self.http, &url, method).await {
            Ok(value) => Ok(value),
            Err(first) => {
                debug!(
                    "fallback service attempt over shared transport failed ({}), retrying over a fresh client",
                    first
                );
                let fresh = reqwest::Client::builder()
                    .timeout(self.config.timeout)
                    .build()
                    .map_err(|e| {
                        DataError::configuration(format!("failed to build HTTP client: {}", e))
                    })?;
                self.request_json(&fresh, &url, method).await
            }
        }
    }

    async fn request_json(
        &self,
        client: &reqwest::Client,
        url: &str,
        method: HttpMethod,
    ) -> Result<Value> {
        let response = client
            .request(method.to_reqwest(), url)
            // Cache-busting: the fallback service may sit behind aggressive
            // intermediaries
            .query(&[("_ts", Utc::now().timestamp_millis().to_string())])
            .send()
            .await
            .map_err(DataError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::mapping::map_http_error(status, &body));
        }

        response.json::<Value>().await.map_err(DataError::from)
    }
}

/// The never-failing last tier: an empty collection for reads, a synthetic
/// acknowledgement for mutations.
pub fn synthesized_default(method: HttpMethod) -> Value {
    if method.is_mutating() {
        json!({
            "success": true,
            "message": "Request accepted; the change will be applied when the service is reachable.",
            "timestamp": Utc::now().to_rfc3339(),
        })
    } else {
        json!([])
    }
}
