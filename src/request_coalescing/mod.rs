// Request Coalescing Module
//
// Collapses lookups into as few upstream calls as possible:
// - Cache hit: answered immediately, nothing is queued
// - Key already pending: the caller attaches to the in-flight result
// - Otherwise the key joins the current batch window; the first key of a
//   window spawns the task that later drains the queue into the batch fetcher
//
// A window is dispatched when its timer elapses, when the queue reaches
// `max_queue`, or on shutdown. Callers wait on a watch channel, so dropping a
// caller never cancels the fetch; the result still lands in the cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::availability::{LookupKey, LookupResult, Provenance};
use crate::cache::TtlCache;
use crate::config::CoalescingConfig;
use crate::error::FetchError;
use crate::fetcher::BatchFetcher;
use crate::metrics::Metrics;

/// Final state of one pending key, shared by every waiter
pub type Settlement = Result<(LookupResult, Provenance), FetchError>;

type Slot = watch::Sender<Option<Settlement>>;

/// Batch-window coalescer in front of the batch fetcher
#[derive(Clone)]
pub struct RequestCoalescer {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<TtlCache>,
    fetcher: Arc<BatchFetcher>,
    metrics: Arc<Metrics>,
    window: Duration,
    max_queue: usize,
    state: Mutex<State>,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct State {
    /// Keys with an outstanding fetch: key -> result channel
    pending: HashMap<LookupKey, Slot>,
    /// Keys waiting for the current window to close
    queue: Vec<LookupKey>,
    /// Wakes the open window early; `None` when no window is open
    window: Option<Arc<Notify>>,
    /// Window tasks that may still be running
    tasks: Vec<JoinHandle<()>>,
}

impl RequestCoalescer {
    pub fn new(
        cache: Arc<TtlCache>,
        fetcher: Arc<BatchFetcher>,
        metrics: Arc<Metrics>,
        config: &CoalescingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                metrics,
                window: config.window(),
                max_queue: config.max_queue.max(1),
                state: Mutex::new(State::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Resolve `key` from the cache or through the next batch window
    pub async fn request(&self, key: LookupKey) -> Settlement {
        if self.inner.shutdown.is_cancelled() {
            return Err(FetchError::ShuttingDown);
        }

        if let Some(result) = self.inner.cache.get(&key).await {
            tracing::debug!(state = "settled", key = %key, provenance = "cache", "Cache hit");
            return Ok((result, Provenance::Cache));
        }

        let mut rx = match self.subscribe(key.clone()) {
            Some(rx) => rx,
            None => return Err(FetchError::ShuttingDown),
        };

        let settled = match rx.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone(),
            // Slot dropped without a value: the window task went away
            Err(_) => None,
        };
        settled.unwrap_or(Err(FetchError::ShuttingDown))
    }

    /// Attach to the pending slot for `key`, creating and enqueueing it if
    /// needed. `None` once shutdown has started.
    fn subscribe(&self, key: LookupKey) -> Option<watch::Receiver<Option<Settlement>>> {
        let mut state = self.inner.state.lock();

        if self.inner.shutdown.is_cancelled() {
            return None;
        }

        if let Some(slot) = state.pending.get(&key) {
            self.inner.metrics.record_coalesced();
            tracing::debug!(state = "coalescing", key = %key, "Attached to pending lookup");
            return Some(slot.subscribe());
        }

        let (slot, rx) = watch::channel(None);
        tracing::debug!(state = "coalescing", key = %key, "Queued for next batch window");
        state.pending.insert(key.clone(), slot);
        state.queue.push(key);
        self.inner.metrics.set_pending(state.pending.len());

        let notify = match &state.window {
            Some(notify) => notify.clone(),
            None => {
                let notify = Arc::new(Notify::new());
                state.window = Some(notify.clone());
                state.tasks.retain(|task| !task.is_finished());
                let inner = self.inner.clone();
                let window_notify = notify.clone();
                state
                    .tasks
                    .push(tokio::spawn(run_window(inner, window_notify)));
                notify
            }
        };

        if state.queue.len() >= self.inner.max_queue {
            notify.notify_one();
        }

        Some(rx)
    }

    /// Keys with an outstanding fetch
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Stop accepting requests, flush the open window and wait for every
    /// in-flight batch to settle
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let tasks = std::mem::take(&mut self.inner.state.lock().tasks);
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Batch window task failed");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

/// Settles the keys a window still owns when its task ends early
///
/// A panicking provider or an aborted task would otherwise leave their
/// slots in `pending`, and every waiter on those keys would hang.
struct SettleOnDrop {
    inner: Arc<Inner>,
    keys: Vec<LookupKey>,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        let mut abandoned = 0;
        for key in &self.keys {
            if let Some(slot) = state.pending.remove(key) {
                slot.send_replace(Some(Err(FetchError::Missing)));
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::error!(keys = abandoned, "Batch window ended without settling its keys");
            self.inner.metrics.set_pending(state.pending.len());
        }
    }
}

/// Wait for the window to close, then fetch and settle its keys
async fn run_window(inner: Arc<Inner>, notify: Arc<Notify>) {
    tokio::select! {
        _ = tokio::time::sleep(inner.window) => {}
        _ = notify.notified() => {
            tracing::debug!("Batch window full, dispatching early");
        }
        _ = inner.shutdown.cancelled() => {
            tracing::debug!("Shutting down, flushing batch window");
        }
    }

    let keys = {
        let mut state = inner.state.lock();
        state.window = None;
        std::mem::take(&mut state.queue)
    };
    if keys.is_empty() {
        return;
    }
    let guard = SettleOnDrop {
        inner: inner.clone(),
        keys: keys.clone(),
    };

    inner.metrics.record_batch(keys.len());
    tracing::debug!(keys = keys.len(), "Batch window closed");

    let mut outcome = inner.fetcher.fetch_batch(keys.clone()).await;

    {
        let mut state = inner.state.lock();
        for key in keys {
            let settlement = match outcome.remove(&key) {
                Some(Ok(result)) => Ok((result, Provenance::Api)),
                Some(Err(err)) => Err(err),
                // fetch_batch settles every key it is given
                None => Err(FetchError::Missing),
            };
            if let Some(slot) = state.pending.remove(&key) {
                tracing::debug!(
                    state = "settled",
                    key = %key,
                    ok = settlement.is_ok(),
                    "Pending lookup settled"
                );
                slot.send_replace(Some(settlement));
            }
        }
        inner.metrics.set_pending(state.pending.len());
    }
    drop(guard);
}
