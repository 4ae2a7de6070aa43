use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use reference_pool::{Reference, ReferencePool};

use crate::{EventArgs, Result, Sender};

/// An event waiting in a [`DeferredQueue`] for the next update of its bus.
///
/// The wrapper is itself pooled, so enqueueing an event does not allocate once the pool is warm.
pub(crate) struct PendingEvent<T> {
    pub(crate) sender: Option<Sender>,
    pub(crate) payload: Option<Box<T>>,
}

impl<T> Default for PendingEvent<T> {
    fn default() -> Self {
        Self {
            sender: None,
            payload: None,
        }
    }
}

impl<T: EventArgs> Reference for PendingEvent<T> {
    fn clear(&mut self) {
        self.sender = None;
        self.payload = None;
    }
}

/// A thread-safe FIFO of events fired for later dispatch.
///
/// Clones share the same queue, which is how producers on other threads reach the queue of a
/// bus that itself stays on its owning thread.
pub(crate) struct DeferredQueue<T> {
    entries: Arc<Mutex<VecDeque<Box<PendingEvent<T>>>>>,
}

impl<T: EventArgs> DeferredQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Wraps the event into a pooled entry and appends it to the queue.
    pub(crate) fn push(
        &self,
        pool: &ReferencePool,
        sender: Option<Sender>,
        payload: Box<T>,
    ) -> Result<()> {
        let mut entry = pool.acquire::<PendingEvent<T>>()?;
        entry.sender = sender;
        entry.payload = Some(payload);

        self.entries.lock().push_back(entry);
        Ok(())
    }

    /// Takes the oldest entry, if any. The lock is held only for the duration of this call.
    pub(crate) fn pop(&self) -> Option<Box<PendingEvent<T>>> {
        self.entries.lock().pop_front()
    }

    /// Takes all entries, oldest first.
    pub(crate) fn take_all(&self) -> VecDeque<Box<PendingEvent<T>>> {
        mem::take(&mut *self.entries.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<T> Clone for DeferredQueue<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> fmt::Debug for DeferredQueue<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, no contract to verify.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("len", &self.entries.lock().len())
            .finish()
    }
}
