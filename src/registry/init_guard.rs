//! Exactly-once asynchronous initialization
//!
//! Ensures a named initialization routine runs at most once per process,
//! no matter how many call sites invoke it or how they interleave. This is
//! the single mechanism preventing duplicate startup work (font loading,
//! resource preloading, mock environment setup).
//!
//! Per operation id the state machine is `NotStarted -> Pending -> Done`.
//! A falsy or failed initialization clears back to `NotStarted` so a later
//! call may retry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, warn};

use crate::error::Result;

enum InitState {
    Pending(Shared<BoxFuture<'static, bool>>),
    Done { result: bool, at: DateTime<Utc> },
}

struct GuardInner {
    records: Mutex<HashMap<String, InitState>>,
}

/// Guard for exactly-once named initialization routines
pub struct InitializationGuard {
    inner: Arc<GuardInner>,
}

impl InitializationGuard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GuardInner {
                records: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Run `init_fn` for `operation_id` at most once.
    ///
    /// Done: returns the cached result without re-invoking. Pending: awaits
    /// the execution already in progress; `init_fn` is not invoked. Not
    /// started: runs `init_fn`; a truthy result records completion with a
    /// timestamp, a falsy result or an error clears the record so a future
    /// call may retry. Concurrent callers all resolve to the same result.
    pub async fn ensure_initialized<F, Fut>(&self, operation_id: &str, init_fn: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let fut = {
            let mut records = self.inner.records.lock().unwrap();
            match records.get(operation_id) {
                Some(InitState::Done { result, .. }) => return *result,
                Some(InitState::Pending(fut)) => fut.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let id_owned = operation_id.to_string();
                    let init = init_fn();
                    let fut = async move {
                        let outcome = init.await;
                        let mut records = inner.records.lock().unwrap();
                        match outcome {
                            Ok(true) => {
                                debug!("initialization '{}' completed", id_owned);
                                records.insert(
                                    id_owned,
                                    InitState::Done {
                                        result: true,
                                        at: Utc::now(),
                                    },
                                );
                                true
                            }
                            Ok(false) => {
                                debug!("initialization '{}' declined, will retry on next call", id_owned);
                                records.remove(&id_owned);
                                false
                            }
                            Err(e) => {
                                warn!("initialization '{}' failed: {}", id_owned, e);
                                records.remove(&id_owned);
                                false
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    records.insert(operation_id.to_string(), InitState::Pending(fut.clone()));
                    fut
                }
            }
        };

        fut.await
    }

    /// When the operation completed, if it has
    pub fn completed_at(&self, operation_id: &str) -> Option<DateTime<Utc>> {
        match self.inner.records.lock().unwrap().get(operation_id) {
            Some(InitState::Done { at, .. }) => Some(*at),
            _ => None,
        }
    }

    /// Whether an initialization is currently in flight
    pub fn is_pending(&self, operation_id: &str) -> bool {
        matches!(
            self.inner.records.lock().unwrap().get(operation_id),
            Some(InitState::Pending(_))
        )
    }

    /// Whether an initialization has completed successfully
    pub fn is_done(&self, operation_id: &str) -> bool {
        matches!(
            self.inner.records.lock().unwrap().get(operation_id),
            Some(InitState::Done { .. })
        )
    }

    /// Forget a single operation. Test isolation only.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self, operation_id: &str) {
        self.inner.records.lock().unwrap().remove(operation_id);
    }

    /// Forget everything. Test isolation only.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset_all(&self) {
        self.inner.records.lock().unwrap().clear();
    }
}

impl Default for InitializationGuard {
    fn default() -> Self {
        Self::new()
    }
}
