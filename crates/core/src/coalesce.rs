//! Key-scoped execution deduplication ("singleflight").
//!
//! For any key, at most one producer runs at a time. Callers that arrive
//! while a flight is in progress suspend on a watch channel and receive
//! the leader's exact outcome, flagged as shared. The registry entry is
//! removed *before* the outcome is published, so a caller that arrives
//! after completion always starts a fresh flight; nothing stale is ever
//! handed out across windows. Deregistration is owned by a drop guard on
//! the leader path: a leader cancelled mid-flight clears its key the
//! moment its future unwinds, waiters or not.
//!
//! A coalescer is an ordinary value: construct one per consumer, inject
//! it, drop it. There is no process-wide registry.

use crate::Error;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::watch;

type Outcome<T> = Result<T, Error>;
type Registry<T> = Mutex<HashMap<String, watch::Receiver<Option<Outcome<T>>>>>;

/// In-flight registry: one watch channel per active key.
///
/// Waiters hold a receiver; the leader publishes the outcome exactly once
/// and every receiver wakes without polling. The registry mutex is only
/// ever held for map operations, never across an await.
pub struct Coalescer<T> {
    inflight: Registry<T>,
}

/// Removes the leader's registry entry when the flight ends, completed or
/// cancelled. Only the entry this flight registered is removed; a
/// successor flight's entry under the same key is left alone.
struct FlightGuard<'a, T> {
    inflight: &'a Registry<T>,
    key: String,
    rx: watch::Receiver<Option<Outcome<T>>>,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        let mut registry = lock(self.inflight);
        if let Some(stored) = registry.get(&self.key)
            && stored.same_channel(&self.rx)
        {
            registry.remove(&self.key);
        }
    }
}

fn lock<T>(registry: &Registry<T>) -> std::sync::MutexGuard<'_, HashMap<String, watch::Receiver<Option<Outcome<T>>>>> {
    // A poisoned map is still structurally sound; keep going.
    registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<T> Default for Coalescer<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coalescer<T>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }

    /// Run `producer` for `key`, or join the flight already running for it.
    ///
    /// Returns the outcome plus `true` when it was shared from another
    /// caller's execution rather than produced here. If a leader is
    /// cancelled before publishing, its waiters observe the closed channel
    /// and get [`Error::Unavailable`]; the guard has already freed the
    /// key, so the next caller leads a fresh flight.
    pub async fn run<F, Fut>(&self, key: &str, producer: F) -> (Outcome<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        enum Role<T> {
            Waiter(watch::Receiver<Option<Outcome<T>>>),
            Leader(watch::Sender<Option<Outcome<T>>>),
        }

        // Registry lock lives in this block only, never across an await.
        let role = {
            let mut registry = lock(&self.inflight);
            match registry.get(key) {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, _rx) = watch::channel(None);
                    registry.insert(key.to_string(), tx.subscribe());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return (outcome, true);
                }
                if rx.changed().await.is_err() {
                    // The leader was dropped without publishing; its
                    // guard already cleared the key.
                    return (
                        Err(Error::Unavailable(format!("coalesced flight for {key:?} aborted before completing"))),
                        true,
                    );
                }
            },
            Role::Leader(tx) => {
                let guard = FlightGuard { inflight: &self.inflight, key: key.to_string(), rx: tx.subscribe() };
                let outcome = producer().await;

                // Deregister before publishing: from this instant new
                // callers start a fresh flight while existing waiters
                // still get the value.
                drop(guard);
                tx.send_replace(Some(outcome.clone()));
                (outcome, false)
            }
        }
    }

    /// Number of keys currently in flight. Test and metrics hook.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }
}
