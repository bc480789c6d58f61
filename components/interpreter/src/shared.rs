//! A runtime shared between threads.
//!
//! Evaluation is single-threaded; sharing serializes whole operations
//! behind one lock, so no heap object is ever touched by two threads at once.

use std::sync::Arc;

use core_types::Value;
use parking_lot::{Mutex, MutexGuard};

use crate::error::KaiError;
use crate::runtime::Runtime;

/// Cloneable handle to a locked [`Runtime`]
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use interpreter::{Runtime, RuntimeConfig, SharedRuntime};
///
/// let shared = SharedRuntime::new(Runtime::new(RuntimeConfig::default()).unwrap());
/// let worker = shared.clone();
/// std::thread::spawn(move || worker.eval_str("(define n 7)").unwrap())
///     .join()
///     .unwrap();
/// assert_eq!(shared.eval_str("n").unwrap(), Value::Integer(7));
/// ```
#[derive(Clone)]
pub struct SharedRuntime {
    inner: Arc<Mutex<Runtime>>,
}

impl SharedRuntime {
    /// Wrap `runtime`
    pub fn new(runtime: Runtime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(runtime)),
        }
    }

    /// Parse and evaluate `source` while holding the lock
    pub fn eval_str(&self, source: &str) -> Result<Value, KaiError> {
        self.inner.lock().eval_str(source)
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Lock the runtime for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Runtime> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for SharedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRuntime").finish_non_exhaustive()
    }
}
