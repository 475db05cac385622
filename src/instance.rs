//! Once-only process instance holder
//!
//! Each binary keeps its running side in a `static Instance`, so the signal
//! handler and the serving task share the same object and it is built at
//! most once, even when several callers race to create it.

use std::sync::{Arc, OnceLock};

/// Lazily initialised, shared process-wide value
#[derive(Debug)]
pub struct Instance<T> {
    cell: OnceLock<Arc<T>>,
}

impl<T> Default for Instance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Instance<T> {
    /// Create an empty holder
    pub const fn new() -> Self {
        Instance {
            cell: OnceLock::new(),
        }
    }

    /// Return the instance, building it with `init` on first use
    ///
    /// Later calls ignore their `init` and return the existing value.
    pub fn get_or_init<F>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        Arc::clone(self.cell.get_or_init(|| Arc::new(init())))
    }

    /// Return the instance if it has been built
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}
