//! Single-flight sharing of identical in-flight reads.
//!
//! A call is identified by its key (see [`dedup_key`]). The first caller for
//! a key leads: its future is spawned onto the runtime and registered. Any
//! caller arriving with the same key while that task is running joins it and
//! receives a clone of the same settled result, success or error. The task
//! deregisters itself as it settles, before any waiter is woken, so a call
//! made after settlement always starts fresh.
//!
//! The spawned task runs to completion even if every waiter goes away; there
//! is no cancellation and no timeout at this layer.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ClientError;
use crate::request::Params;

/// Future handed to every caller of one in-flight key.
pub type SharedCall<T> = Shared<BoxFuture<'static, Result<T, ClientError>>>;

/// Derive the registry key for a read: target plus canonical parameters.
///
/// Absent parameters serialize as `{}`, the same as an empty set.
#[must_use]
pub fn dedup_key(path: &str, params: Option<&Params>) -> String {
    let params = params.map_or_else(|| "{}".to_owned(), Params::canonical);
    format!("{path}?{params}")
}

struct Entry<T> {
    id: u64,
    call: SharedCall<T>,
}

type Entries<T> = Arc<Mutex<HashMap<String, Entry<T>>>>;

/// Registry of in-flight calls, at most one per key.
pub struct InFlight<T> {
    entries: Entries<T>,
    next_id: AtomicU64,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> std::fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight call for `key`, or start one with `make`.
    ///
    /// `make` is only invoked when this caller leads. Must be called from
    /// within a Tokio runtime.
    pub fn run<F, Fut>(&self, key: String, make: F) -> SharedCall<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            tracing::debug!(key = %key, "joining in-flight request");
            return entry.call.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = Deregister {
            entries: Arc::clone(&self.entries),
            key: key.clone(),
            id,
        };
        let fut = make();
        // The guard lives inside the task, so the entry goes away when the
        // call settles (or panics), before the join handle resolves.
        let task = tokio::spawn(async move {
            let _guard = guard;
            fut.await
        });

        let call = async move {
            task.await
                .unwrap_or_else(|e| Err(ClientError::Internal(format!("request task failed: {e}"))))
        }
        .boxed()
        .shared();

        tracing::debug!(key = %key, "registered in-flight request");
        entries.insert(
            key,
            Entry {
                id,
                call: call.clone(),
            },
        );
        call
    }

    /// Number of keys currently in flight
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

/// Removes one registration when dropped, if it is still the one it created.
struct Deregister<T> {
    entries: Entries<T>,
    key: String,
    id: u64,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        let mut entries = self.entries.lock();
        if entries.get(&self.key).is_some_and(|e| e.id == self.id) {
            entries.remove(&self.key);
            tracing::debug!(key = %self.key, "in-flight request settled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Counts executions and holds each one until a permit is released.
    #[derive(Clone)]
    struct Probe {
        calls: Arc<AtomicUsize>,
        gate: Arc<Semaphore>,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                gate: Arc::new(Semaphore::new(0)),
            }
        }

        fn call(
            &self,
            result: Result<u32, ClientError>,
        ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, ClientError>> {
            let calls = Arc::clone(&self.calls);
            let gate = Arc::clone(&self.gate);
            move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let _permit = gate.acquire().await.unwrap();
                    result
                }
                .boxed()
            }
        }

        fn open(&self, n: usize) {
            self.gate.add_permits(n);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_key_without_params() {
        assert_eq!(dedup_key("/api/status", None), "/api/status?{}");
        assert_eq!(
            dedup_key("/api/status", Some(&Params::new())),
            dedup_key("/api/status", None)
        );
    }

    #[test]
    fn test_key_includes_params() {
        let one = Params::new().with("x", 1);
        let two = Params::new().with("x", 2);
        assert_eq!(dedup_key("/resource", Some(&one)), r#"/resource?{"x":"1"}"#);
        assert_ne!(
            dedup_key("/resource", Some(&one)),
            dedup_key("/resource", Some(&two))
        );
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_execution() {
        let registry = InFlight::<u32>::new();
        let probe = Probe::new();

        let a = registry.run("k".into(), probe.call(Ok(7)));
        let b = registry.run("k".into(), probe.call(Ok(99)));
        assert_eq!(registry.len(), 1);

        probe.open(1);
        let (ra, rb) = tokio::join!(a, b);

        assert_eq!(ra, Ok(7));
        assert_eq!(rb, Ok(7));
        assert_eq!(probe.calls(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_run_independently() {
        let registry = InFlight::<u32>::new();
        let probe = Probe::new();

        let a = registry.run("/resource?{\"x\":\"1\"}".into(), probe.call(Ok(1)));
        let b = registry.run("/resource?{\"x\":\"2\"}".into(), probe.call(Ok(2)));
        assert_eq!(registry.len(), 2);

        probe.open(2);
        let (ra, rb) = tokio::join!(a, b);

        assert_eq!(ra, Ok(1));
        assert_eq!(rb, Ok(2));
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_settle() {
        let registry = InFlight::<u32>::new();
        let probe = Probe::new();
        probe.open(2);

        assert_eq!(registry.run("k".into(), probe.call(Ok(1))).await, Ok(1));
        assert!(!registry.contains("k"));

        assert_eq!(registry.run("k".into(), probe.call(Ok(2))).await, Ok(2));
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_error_shared_and_entry_removed() {
        let registry = InFlight::<u32>::new();
        let probe = Probe::new();
        let timeout = ClientError::Timeout("upstream slow".into());

        let a = registry.run("k".into(), probe.call(Err(timeout.clone())));
        let b = registry.run("k".into(), probe.call(Ok(5)));
        probe.open(1);
        let (ra, rb) = tokio::join!(a, b);

        assert_eq!(ra, Err(timeout.clone()));
        assert_eq!(rb, Err(timeout));
        assert!(registry.is_empty());

        probe.open(1);
        assert_eq!(registry.run("k".into(), probe.call(Ok(5))).await, Ok(5));
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_call_completes_when_waiters_dropped() {
        let registry = InFlight::<u32>::new();
        let probe = Probe::new();

        drop(registry.run("k".into(), probe.call(Ok(3))));
        assert!(registry.contains("k"));

        probe.open(1);
        for _ in 0..100 {
            if registry.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(registry.is_empty());
        assert_eq!(probe.calls(), 1);
    }

    async fn explode() -> Result<u32, ClientError> {
        panic!("transport exploded")
    }

    async fn one() -> Result<u32, ClientError> {
        Ok(1)
    }

    #[tokio::test]
    async fn test_panicking_call_reports_internal_error() {
        let registry = InFlight::<u32>::new();

        let a = registry.run("k".into(), explode);
        let b = registry.run("k".into(), one);
        let (ra, rb) = tokio::join!(a, b);

        assert!(matches!(ra, Err(ClientError::Internal(_))));
        assert_eq!(ra, rb);
        assert!(registry.is_empty());
    }
}
