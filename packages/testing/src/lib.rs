#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in the pool and event bus packages.

use std::sync::{Arc, mpsc};
use std::{mem, thread};
use std::time::Duration;

use parking_lot::Mutex;

/// Runs a test on a separate thread and fails it if it does not complete in time.
///
/// Tests that involve several threads racing on a pool or an event queue can hang if a lock is
/// mishandled. Without a watchdog such a test would stall the whole test run.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled and
/// the test function is executed directly, so that mutation testing can detect hangs itself.
///
/// # Panics
///
/// Panics if the test exceeds the timeout or if the test itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        // If this fails, the watchdog has already given up on us.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after sending a result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded timeout of {timeout:?}");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected without a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// An ordered, thread-safe record of calls, for asserting which handlers ran and in what order.
///
/// Clones share the same record, so a clone can be moved into each handler under test.
///
/// # Example
///
/// ```rust
/// use testing::CallLog;
///
/// let log = CallLog::new();
///
/// let handler_log = log.clone();
/// let handler = move |id: i32| handler_log.record(("handler", id));
///
/// handler(1);
/// handler(2);
///
/// assert_eq!(log.entries(), vec![("handler", 1), ("handler", 2)]);
/// ```
#[derive(Debug)]
pub struct CallLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> CallLog<T> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends an entry to the log.
    pub fn record(&self, entry: T) {
        self.entries.lock().push(entry);
    }

    /// The number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes and returns all entries recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<T> {
        mem::take(&mut *self.entries.lock())
    }
}

impl<T: Clone> CallLog<T> {
    /// A copy of all entries recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}
