use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt as _,
};

type SharedFuture<T> = Shared<BoxFuture<'static, T>>;

struct Entry<T> {
    id: u64,
    future: SharedFuture<T>,
}

type Registry<T> = Arc<Mutex<HashMap<String, Entry<T>>>>;

/// Coalesces concurrent requests with the same key into one underlying
/// future. Every caller gets a clone of the same output; the entry is removed
/// as soon as that output is produced, so a later call (including one after
/// a failure) starts a fresh request. A completing request only removes its
/// own entry, never one registered under the same key after a `clear`.
pub(crate) struct InFlightRequests<T: Clone + Send + Sync + 'static> {
    pending: Registry<T>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> InFlightRequests<T> {
    pub(crate) fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Joins the request registered under `key`, or registers `make()` under
    /// it. Lookup and registration happen under one lock, so N callers
    /// arriving together produce exactly one `make()` call.
    pub(crate) async fn run<F, Fut>(&self, key: String, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            match pending.get(&key) {
                Some(existing) => {
                    tracing::debug!(key = %key, "joining in-flight request");
                    existing.future.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let registry = Arc::clone(&self.pending);
                    let entry_key = key.clone();
                    let request = make();
                    let shared = async move {
                        let output = request.await;
                        let mut pending = registry.lock().unwrap_or_else(|e| e.into_inner());
                        if pending.get(&entry_key).is_some_and(|entry| entry.id == id) {
                            pending.remove(&entry_key);
                        }
                        output
                    }
                    .boxed()
                    .shared();
                    pending.insert(
                        key,
                        Entry {
                            id,
                            future: shared.clone(),
                        },
                    );
                    shared
                }
            }
        };
        shared.await
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forgets every pending entry. Callers already awaiting keep their
    /// futures; new callers start fresh requests.
    pub(crate) fn clear(&self) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
