//! Fallback chain tests
//!
//! Verify the strict tier ordering (cache before fallback service before
//! mock before synthesized default), that disabled tiers are skipped
//! without being attempted, and that fallback results are cached.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{DataAccessConfig, FallbackTiers};
use crate::core::{DataOrigin, DispatcherBuilder, RequestDescriptor};
use crate::fallback::StaticMockSource;
use crate::tests::fast_retry;

fn failing_api_config(api_base: &str, fallback_base: &str, tiers: FallbackTiers) -> DataAccessConfig {
    DataAccessConfig {
        api_base: api_base.to_string(),
        fallback_base: fallback_base.to_string(),
        timeout: Duration::from_secs(5),
        retry: fast_retry(1),
        tiers,
        ..DataAccessConfig::default()
    }
}

/// Mount an always-500 primary API
async fn failing_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_cache_tier_precedes_service_and_mock() {
    let api = failing_api().await;
    let fallback_service = MockServer::start().await;

    // Reachable fallback service and a valid mock document both exist, but
    // neither may be touched when the cache has the entry
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"from": "service"}])))
        .expect(0)
        .mount(&fallback_service)
        .await;

    let mock_source =
        StaticMockSource::new().with("mock/courses/get.json", r#"[{"from": "mock"}]"#);

    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            &fallback_service.uri(),
            FallbackTiers::default(),
        ))
        .mock_source(Arc::new(mock_source))
        .build()
        .unwrap();

    let fingerprint = RequestDescriptor::get("/courses").fingerprint();
    dispatcher
        .registry()
        .set_cached(&fingerprint, json!([{"from": "cache"}]));

    let result = dispatcher.get_json("/courses").await.unwrap();
    assert_eq!(result.origin, DataOrigin::Cache);
    assert_eq!(result.value, json!([{"from": "cache"}]));
}

#[tokio::test]
async fn test_fallback_service_tier_serves_and_caches() {
    let api = failing_api().await;
    let fallback_service = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"from": "service"}])))
        .mount(&fallback_service)
        .await;

    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            &fallback_service.uri(),
            FallbackTiers::default(),
        ))
        .build()
        .unwrap();

    let result = dispatcher.get_json("/courses").await.unwrap();
    assert_eq!(result.origin, DataOrigin::FallbackService);
    assert_eq!(result.value, json!([{"from": "service"}]));

    // The tier result is cached under the request fingerprint
    let fingerprint = RequestDescriptor::get("/courses").fingerprint();
    assert_eq!(
        dispatcher.registry().cached(&fingerprint),
        Some(json!([{"from": "service"}]))
    );
}

#[tokio::test]
async fn test_unreachable_service_falls_through_to_mock() {
    let api = failing_api().await;

    let mock_source =
        StaticMockSource::new().with("mock/courses/get.json", r#"[{"from": "mock"}]"#);

    // Discard port: connection refused for both transport attempts
    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            "http://127.0.0.1:9",
            FallbackTiers::default(),
        ))
        .mock_source(Arc::new(mock_source))
        .build()
        .unwrap();

    let result = dispatcher.get_json("/courses").await.unwrap();
    assert_eq!(result.origin, DataOrigin::Mock);
    assert_eq!(result.value, json!([{"from": "mock"}]));
}

#[tokio::test]
async fn test_disabled_tiers_are_skipped_without_attempt() {
    let api = failing_api().await;
    let fallback_service = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"from": "service"}])))
        .expect(0)
        .mount(&fallback_service)
        .await;

    // Cache holds data, mock holds data: every tier but synthesis disabled
    let mock_source =
        StaticMockSource::new().with("mock/courses/get.json", r#"[{"from": "mock"}]"#);

    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            &fallback_service.uri(),
            FallbackTiers {
                cache: false,
                fallback_service: false,
                mock: false,
                synthesize: true,
            },
        ))
        .mock_source(Arc::new(mock_source))
        .build()
        .unwrap();

    let fingerprint = RequestDescriptor::get("/courses").fingerprint();
    dispatcher
        .registry()
        .set_cached(&fingerprint, json!([{"from": "cache"}]));

    let result = dispatcher.get_json("/courses").await.unwrap();
    assert_eq!(result.origin, DataOrigin::Synthesized);
    assert_eq!(result.value, json!([]));
}

#[tokio::test]
async fn test_all_tiers_disabled_returns_original_error() {
    let api = failing_api().await;

    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            "http://127.0.0.1:9",
            FallbackTiers {
                cache: false,
                fallback_service: false,
                mock: false,
                synthesize: false,
            },
        ))
        .build()
        .unwrap();

    let error = dispatcher.get_json("/courses").await.unwrap_err();
    assert_eq!(error.status_code(), Some(500));
}

#[tokio::test]
async fn test_malformed_mock_candidate_does_not_abort_resolution() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&api)
        .await;

    // The method-specific document is corrupt; the generic one is used
    let mock_source = StaticMockSource::new()
        .with("mock/enrollments/post.json", "{ not json")
        .with("mock/enrollments/get.json", r#"{"enrolled": []}"#);

    let dispatcher = DispatcherBuilder::new()
        .config(failing_api_config(
            &api.uri(),
            "http://127.0.0.1:9",
            FallbackTiers {
                cache: true,
                fallback_service: false,
                mock: true,
                synthesize: true,
            },
        ))
        .mock_source(Arc::new(mock_source))
        .build()
        .unwrap();

    let result = dispatcher
        .post_json("/enrollments", json!({"course": 1}))
        .await
        .unwrap();
    assert_eq!(result.origin, DataOrigin::Mock);
    assert_eq!(result.value, json!({"enrolled": []}));
}
