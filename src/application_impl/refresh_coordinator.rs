use crate::domain_model::RefreshToken;
use crate::domain_port::{RefreshExchange, RefreshFailure, RefreshOutcome};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct PendingRefresh {
    generation: u64,
    refresh_token: RefreshToken,
    future: SharedRefresh,
}

type Slot = Arc<Mutex<Option<PendingRefresh>>>;

fn lock(slot: &Mutex<Option<PendingRefresh>>) -> MutexGuard<'_, Option<PendingRefresh>> {
    // The slot only ever holds a cloneable handle, a poisoned lock is still usable.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Empties the slot once its refresh settles, including on panic.
struct ClearOnSettle {
    slot: Slot,
    generation: u64,
}

impl Drop for ClearOnSettle {
    fn drop(&mut self) {
        let taken = {
            let mut guard = lock(&self.slot);
            match guard.as_ref() {
                Some(pending) if pending.generation == self.generation => guard.take(),
                _ => None,
            }
        };
        // Dropped outside the lock.
        drop(taken);
    }
}

/// Coalesces concurrent refresh attempts into one exchange.
///
/// Holds a single pending-refresh slot. The first caller that needs a refresh
/// spawns the exchange and parks a shared handle in the slot; every caller
/// with the same refresh token arriving before it settles awaits that same
/// handle. The exchange runs on its own task, so it settles and empties the
/// slot even when every caller has gone away. A later 401 starts a new
/// exchange.
///
/// Must be used from within a tokio runtime.
///
/// Share one coordinator (behind `Arc`) between every fetcher that must not
/// race on the same refresh token.
pub struct RefreshCoordinator {
    exchange: Arc<dyn RefreshExchange>,
    slot: Slot,
    next_generation: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(exchange: Arc<dyn RefreshExchange>) -> Self {
        Self {
            exchange,
            slot: Arc::new(Mutex::new(None)),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub async fn refresh(&self, refresh_token: &RefreshToken) -> RefreshOutcome {
        let future = {
            let mut guard = lock(&self.slot);
            match guard.as_ref() {
                Some(pending) if pending.refresh_token == *refresh_token => {
                    debug!(generation = pending.generation, "joining in-flight refresh");
                    pending.future.clone()
                }
                stale => {
                    if let Some(pending) = stale {
                        debug!(
                            generation = pending.generation,
                            "in-flight refresh uses another refresh token, starting a new one"
                        );
                    }
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let future = self.start(generation, refresh_token.clone());
                    *guard = Some(PendingRefresh {
                        generation,
                        refresh_token: refresh_token.clone(),
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        future.await
    }

    fn start(&self, generation: u64, refresh_token: RefreshToken) -> SharedRefresh {
        let exchange = self.exchange.clone();
        let clear = ClearOnSettle {
            slot: self.slot.clone(),
            generation,
        };

        info!(generation, "starting token refresh");
        let task = tokio::spawn(async move {
            let _clear = clear;
            let outcome = AssertUnwindSafe(exchange.exchange(&refresh_token))
                .catch_unwind()
                .await
                .unwrap_or(RefreshOutcome::RefreshFailed(RefreshFailure::Panicked));
            match &outcome {
                RefreshOutcome::Refreshed(_) => info!(generation, "token refresh succeeded"),
                RefreshOutcome::RefreshFailed(reason) => {
                    warn!(generation, %reason, "token refresh failed")
                }
            }
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                warn!(generation, error = %e, "token refresh task did not complete");
                RefreshOutcome::RefreshFailed(RefreshFailure::Cancelled)
            })
        }
        .boxed()
        .shared()
    }
}
