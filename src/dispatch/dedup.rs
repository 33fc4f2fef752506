//! In-flight GET deduplication
//!
//! Keeps one cancellation token per request fingerprint. Registering a
//! fingerprint that is already in flight cancels the older request first
//! (last-writer-wins), then records the new one. Mutating requests never
//! pass through here: a side-effecting call must not be silently superseded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;
use tokio_util::sync::CancellationToken;

struct InFlightEntry {
    id: u64,
    token: CancellationToken,
}

/// Registry of in-flight GET requests keyed by fingerprint
#[derive(Default)]
pub struct RequestDeduplicator {
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<String, InFlightEntry>>,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight request for a fingerprint.
    ///
    /// Any older entry with the same fingerprint is cancelled before the
    /// new one is recorded. Returns the entry id (for `settle`) and the
    /// fresh cancellation token bound to the transport call.
    pub fn register(&self, fingerprint: &str) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let mut map = self.in_flight.lock().unwrap();
        if let Some(prev) = map.remove(fingerprint) {
            debug!("superseding in-flight request '{}'", fingerprint);
            prev.token.cancel();
        }
        map.insert(
            fingerprint.to_string(),
            InFlightEntry {
                id,
                token: token.clone(),
            },
        );

        (id, token)
    }

    /// Remove an entry on settlement (success, error or cancellation).
    ///
    /// The id check keeps a settling superseded request from evicting the
    /// entry of the newer request that replaced it.
    pub fn settle(&self, fingerprint: &str, id: u64) {
        let mut map = self.in_flight.lock().unwrap();
        if map.get(fingerprint).map(|e| e.id) == Some(id) {
            map.remove(fingerprint);
        }
    }

    /// Whether a request with this fingerprint is currently in flight
    pub fn is_in_flight(&self, fingerprint: &str) -> bool {
        self.in_flight.lock().unwrap().contains_key(fingerprint)
    }

    /// Number of requests currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}
