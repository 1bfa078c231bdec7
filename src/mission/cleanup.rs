//! Teardown callbacks run when a mission ends.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// A teardown action holding only the state it needs.
pub trait CleanupCallback: Send + Sync {
    fn name(&self) -> &str {
        "anonymous"
    }

    fn run(&self) -> anyhow::Result<()>;
}

/// Named closure callback.
pub struct FnCleanup<F> {
    name: String,
    f: F,
}

impl<F> FnCleanup<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> CleanupCallback for FnCleanup<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> anyhow::Result<()> {
        (self.f)()
    }
}

/// Ordered list of cleanup callbacks.
///
/// [`run_all`](Self::run_all) drains the list, so a registered callback runs
/// at most once even when several exit paths trigger cleanup.
#[derive(Default)]
pub struct CleanupRegistry {
    callbacks: Mutex<Vec<Arc<dyn CleanupCallback>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback. The same callback may be registered more than once.
    pub fn register(&self, callback: Arc<dyn CleanupCallback>) {
        tracing::debug!(callback = callback.name(), "registered cleanup callback");
        self.lock().push(callback);
    }

    /// Register a closure, returning the handle needed to remove it again.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> Arc<dyn CleanupCallback>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: Arc<dyn CleanupCallback> = Arc::new(FnCleanup::new(name, f));
        self.register(callback.clone());
        callback
    }

    /// Remove the first registration of `callback` (pointer identity).
    pub fn remove(&self, callback: &Arc<dyn CleanupCallback>) -> bool {
        let mut callbacks = self.lock();
        match callbacks.iter().position(|c| Arc::ptr_eq(c, callback)) {
            Some(idx) => {
                callbacks.remove(idx);
                tracing::debug!(callback = callback.name(), "removed cleanup callback");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every callback in registration order and empty the registry.
    ///
    /// Errors and panics are logged and do not stop the remaining callbacks.
    /// Returns the number of callbacks that failed.
    pub fn run_all(&self) -> usize {
        // Taken out first so callbacks may touch the registry themselves.
        let callbacks = std::mem::take(&mut *self.lock());
        if callbacks.is_empty() {
            return 0;
        }

        tracing::info!(count = callbacks.len(), "running cleanup callbacks");
        let mut failures = 0;
        for callback in &callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback.run())) {
                Ok(Ok(())) => tracing::debug!(callback = callback.name(), "cleanup callback done"),
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(
                        callback = callback.name(),
                        error = %e,
                        "cleanup callback failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(callback = callback.name(), "cleanup callback panicked");
                }
            }
        }
        failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn CleanupCallback>>> {
        self.callbacks.lock().unwrap_or_else(|p| p.into_inner())
    }
}
