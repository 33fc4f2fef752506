//! Session store tests

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

use crate::session::{FileStore, KeyValueStore, MemoryStore, SessionStore, SessionTokens};

fn memory_session(prefix: &str) -> SessionStore {
    SessionStore::new(Arc::new(MemoryStore::new()), prefix)
}

#[test]
fn test_token_round_trip() {
    let session = memory_session("meridian.");
    assert_eq!(session.token(), None);

    session.set_token("abc123").unwrap();
    assert_eq!(session.token().as_deref(), Some("abc123"));
}

#[test]
fn test_prefix_namespacing() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let a = SessionStore::new(Arc::clone(&store), "a.");
    let b = SessionStore::new(Arc::clone(&store), "b.");

    a.set_token("token-a").unwrap();
    assert_eq!(b.token(), None);

    // Raw keys carry the prefix
    assert_eq!(store.get("a.token").unwrap().as_deref(), Some("token-a"));
}

#[test]
fn test_clear_session_keeps_last_username() {
    let session = memory_session("meridian.");
    session.set_token("tok").unwrap();
    session.set_refresh_token("refresh").unwrap();
    session.set_token_expiry(Utc::now()).unwrap();
    session.set_current_user(&json!({"username": "admin"})).unwrap();
    session.set_last_username("admin").unwrap();

    session.clear_session().unwrap();

    assert_eq!(session.token(), None);
    assert_eq!(session.refresh_token(), None);
    assert!(session.token_expiry().is_none());
    assert!(session.current_user().is_none());
    assert_eq!(session.last_username().as_deref(), Some("admin"));
}

#[test]
fn test_token_expiry() {
    let session = memory_session("meridian.");

    // No recorded expiry: treated as valid
    assert!(!session.is_token_expired());

    session
        .set_token_expiry(Utc::now() + ChronoDuration::hours(1))
        .unwrap();
    assert!(!session.is_token_expired());

    session
        .set_token_expiry(Utc::now() - ChronoDuration::minutes(1))
        .unwrap();
    assert!(session.is_token_expired());
}

#[test]
fn test_store_tokens_normalizes_in_one_step() {
    let session = memory_session("meridian.");

    let tokens = SessionTokens {
        token: "jwt".to_string(),
        refresh_token: Some("refresh-jwt".to_string()),
        expires_at: Some(Utc::now() + ChronoDuration::hours(8)),
        user: Some(json!({"username": "teacher@example.edu", "role": "admin"})),
    };
    session.store_tokens(&tokens).unwrap();

    assert_eq!(session.token().as_deref(), Some("jwt"));
    assert_eq!(session.refresh_token().as_deref(), Some("refresh-jwt"));
    assert!(!session.is_token_expired());
    assert_eq!(
        session.current_user().unwrap()["role"],
        json!("admin")
    );
    assert_eq!(
        session.last_username().as_deref(),
        Some("teacher@example.edu")
    );
}

#[test]
fn test_session_tokens_deserializes_sparse_response() {
    // Optional fields may be absent in the wire shape
    let tokens: SessionTokens = serde_json::from_value(json!({"token": "jwt"})).unwrap();
    assert_eq!(tokens.token, "jwt");
    assert!(tokens.refresh_token.is_none());
    assert!(tokens.expires_at.is_none());
    assert!(tokens.user.is_none());
}

#[test]
fn test_file_store_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!(
        "data-access-sdk-session-{}.json",
        uuid::Uuid::new_v4()
    ));

    {
        let store = FileStore::open(&path).unwrap();
        store.set("meridian.token", "persisted").unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(
        store.get("meridian.token").unwrap().as_deref(),
        Some("persisted")
    );

    store.remove("meridian.token").unwrap();
    assert_eq!(store.get("meridian.token").unwrap(), None);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_file_store_discards_corrupt_file() {
    let path = std::env::temp_dir().join(format!(
        "data-access-sdk-corrupt-{}.json",
        uuid::Uuid::new_v4()
    ));
    std::fs::write(&path, "definitely { not json").unwrap();

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get("meridian.token").unwrap(), None);

    let _ = std::fs::remove_file(&path);
}
