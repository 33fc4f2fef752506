//! Persisted session state
//!
//! A small key/value store abstraction with in-memory and JSON-file backends,
//! and the typed [`SessionStore`] over it holding the auth token, refresh
//! token, token expiry, serialized current user and the last-username
//! convenience value. All keys are namespaced under a configurable prefix.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;

use crate::error::{DataError, Result};

/// Key/value persistence boundary
pub trait KeyValueStore: Send + Sync {
    /// Get a stored value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }
}

/// JSON-file backed store, loaded on open and rewritten on every mutation
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open a file store, reading existing contents if present.
    ///
    /// A missing file is an empty store; a corrupt file is discarded with a
    /// warning rather than failing the session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("discarding corrupt session file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(DataError::storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(values)
            .map_err(|e| DataError::storage(format!("failed to serialize session: {}", e)))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            DataError::storage(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap();
        values.remove(key);
        self.persist(&values)
    }
}

const KEY_TOKEN: &str = "token";
const KEY_REFRESH_TOKEN: &str = "refresh_token";
const KEY_TOKEN_EXPIRY: &str = "token_expiry";
const KEY_CURRENT_USER: &str = "current_user";
const KEY_LAST_USERNAME: &str = "last_username";

/// Typed session state over a key/value store
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Current auth token, if any
    pub fn token(&self) -> Option<String> {
        self.store.get(&self.key(KEY_TOKEN)).ok().flatten()
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(&self.key(KEY_TOKEN), token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(&self.key(KEY_REFRESH_TOKEN)).ok().flatten()
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.store.set(&self.key(KEY_REFRESH_TOKEN), token)
    }

    /// Recorded token expiry instant
    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.store
            .get(&self.key(KEY_TOKEN_EXPIRY))
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok())
    }

    pub fn set_token_expiry(&self, at: DateTime<Utc>) -> Result<()> {
        self.store.set(&self.key(KEY_TOKEN_EXPIRY), &at.to_rfc3339())
    }

    /// Whether the stored token is past its expiry. A token without a
    /// recorded expiry is treated as still valid.
    pub fn is_token_expired(&self) -> bool {
        match self.token_expiry() {
            Some(expiry) => Utc::now() > expiry,
            None => false,
        }
    }

    /// Serialized current user
    pub fn current_user(&self) -> Option<Value> {
        self.store
            .get(&self.key(KEY_CURRENT_USER))
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn set_current_user(&self, user: &Value) -> Result<()> {
        self.store
            .set(&self.key(KEY_CURRENT_USER), &user.to_string())
    }

    /// Last username used to sign in
    pub fn last_username(&self) -> Option<String> {
        self.store.get(&self.key(KEY_LAST_USERNAME)).ok().flatten()
    }

    pub fn set_last_username(&self, username: &str) -> Result<()> {
        self.store.set(&self.key(KEY_LAST_USERNAME), username)
    }

    /// Invalidate the session: tokens, expiry and current user are removed.
    /// The last username survives as a sign-in convenience.
    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(&self.key(KEY_TOKEN))?;
        self.store.remove(&self.key(KEY_REFRESH_TOKEN))?;
        self.store.remove(&self.key(KEY_TOKEN_EXPIRY))?;
        self.store.remove(&self.key(KEY_CURRENT_USER))?;
        Ok(())
    }
}

/// Normalized authentication response contract.
///
/// One fixed shape, produced at the boundary; backend shape tolerance does
/// not belong in production code.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionTokens {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl SessionStore {
    /// Persist a normalized authentication response in one step
    pub fn store_tokens(&self, tokens: &SessionTokens) -> Result<()> {
        self.set_token(&tokens.token)?;
        if let Some(ref refresh) = tokens.refresh_token {
            self.set_refresh_token(refresh)?;
        }
        if let Some(expires_at) = tokens.expires_at {
            self.set_token_expiry(expires_at)?;
        }
        if let Some(ref user) = tokens.user {
            self.set_current_user(user)?;
            if let Some(username) = user.get("username").and_then(|u| u.as_str()) {
                self.set_last_username(username)?;
            }
        }
        Ok(())
    }
}
