//! Shutdown callbacks run once when the bot loop ends, whichever path ended it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Ordered list of zero-argument callbacks.
///
/// Hooks are drained when run, so each one fires at most once even if [`ShutdownHooks::run_all`]
/// is called again.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<ShutdownHook>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook; hooks run in registration order.
    pub fn register<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.lock().push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs and removes every registered hook. A panicking hook is logged and does not stop the rest.
    pub fn run_all(&self) {
        let hooks = std::mem::take(&mut *self.lock());
        debug!(count = hooks.len(), "step: running shutdown hooks");
        for (index, hook) in hooks.into_iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                error!(index, "Shutdown hook panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ShutdownHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs the hooks when dropped: on normal return, on error return, and while unwinding.
pub(crate) struct ShutdownGuard<'a>(pub(crate) &'a ShutdownHooks);

impl Drop for ShutdownGuard<'_> {
    fn drop(&mut self) {
        self.0.run_all();
    }
}
