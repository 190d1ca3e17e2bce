//! Observer registries
//!
//! A registry holds any number of callbacks for one notification kind.
//! Registering returns an [`ObserverHandle`] that removes exactly that
//! callback. Notification iterates a snapshot taken under the lock, so an
//! observer may register or remove observers (itself included) while being
//! notified.
//!
//! Observers run on whichever task raises the notification. A panicking
//! observer is logged and skipped; it never takes the notifier down.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Removal token for one registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

impl ObserverHandle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Append/remove set of callbacks receiving `T`
pub struct ObserverRegistry<T> {
    name: &'static str,
    observers: Mutex<Vec<(ObserverHandle, Observer<T>)>>,
}

impl<T: Clone> ObserverRegistry<T> {
    /// Create an empty registry; `name` labels panic logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            observers: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverHandle, Observer<T>)>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register<F>(&self, observer: F) -> ObserverHandle
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handle = ObserverHandle::next();
        self.lock().push((handle, Arc::new(observer)));
        handle
    }

    /// Remove one observer; returns false if the handle was unknown
    pub fn remove(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        observers.len() != before
    }

    /// Remove `previous` (if any) and register `observer` in one step
    pub fn replace<F>(&self, previous: Option<ObserverHandle>, observer: F) -> ObserverHandle
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handle = ObserverHandle::next();
        let mut observers = self.lock();
        if let Some(previous) = previous {
            observers.retain(|(h, _)| *h != previous);
        }
        observers.push((handle, Arc::new(observer)));
        handle
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invoke every observer registered at the time of the call
    pub fn notify(&self, value: T) {
        let snapshot: Vec<(ObserverHandle, Observer<T>)> = self.lock().clone();

        for (handle, observer) in snapshot {
            let value = value.clone();
            if catch_unwind(AssertUnwindSafe(|| observer(value))).is_err() {
                error!(registry = self.name, handle = handle.0, "Observer panicked during notification");
            }
        }
    }
}

/// Run a one-shot callback, logging a panic instead of propagating it
pub(crate) fn call_guarded(label: &'static str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        error!(callback = label, "Callback panicked");
    }
}

impl<T> std::fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .observers
            .lock()
            .map(|o| o.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len());
        f.debug_struct("ObserverRegistry")
            .field("name", &self.name)
            .field("observers", &count)
            .finish()
    }
}
