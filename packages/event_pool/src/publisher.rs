use reference_pool::ReferencePool;
use tracing::trace;

use crate::{DeferredQueue, EventArgs, Result, Sender};

/// A thread-safe handle for firing events into the queue of an [`EventBus`][crate::EventBus].
///
/// The bus itself stays on its owning thread because its handlers are not required to be
/// thread-safe. Producers on other threads fire through a publisher instead; the events are
/// dispatched on the owning thread during the next [`update()`][crate::EventBus::update], in the
/// order they were fired.
///
/// Publishers are cheap to clone and may outlive the bus, in which case firing still succeeds
/// but the events are never dispatched.
///
/// # Example
///
/// ```rust
/// use std::thread;
/// use std::time::Duration;
///
/// use event_pool::{EventArgs, EventBus, EventHandler, EventId};
/// use reference_pool::{Reference, ReferencePool};
///
/// #[derive(Default)]
/// struct Downloaded {
///     bytes: usize,
/// }
///
/// impl Reference for Downloaded {
///     fn clear(&mut self) {
///         self.bytes = 0;
///     }
/// }
///
/// impl EventArgs for Downloaded {
///     fn id(&self) -> EventId {
///         1
///     }
/// }
///
/// let bus = EventBus::<Downloaded>::builder()
///     .pool(ReferencePool::new())
///     .build();
/// bus.subscribe(1, EventHandler::new(|_, event: &Downloaded| println!("{} bytes", event.bytes)))
///     .unwrap();
///
/// let publisher = bus.publisher();
/// thread::spawn(move || {
///     let mut event = publisher.pool().acquire::<Downloaded>().unwrap();
///     event.bytes = 1024;
///     publisher.fire(None, event).unwrap();
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(bus.pending_count(), 1);
/// bus.update(Duration::ZERO, Duration::ZERO).unwrap();
/// assert_eq!(bus.pending_count(), 0);
/// ```
#[derive(derive_more::Debug)]
pub struct Publisher<T: EventArgs> {
    #[debug(ignore)]
    queue: DeferredQueue<T>,
    pool: ReferencePool,
}

impl<T: EventArgs> Publisher<T> {
    pub(crate) fn new(queue: DeferredQueue<T>, pool: ReferencePool) -> Self {
        Self { queue, pool }
    }

    /// Queues an event for dispatch during the next update of the bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pool`][crate::Error::Pool] if the pool of the bus rejects the queue entry.
    pub fn fire(&self, sender: Option<Sender>, payload: Box<T>) -> Result<()> {
        let id = payload.id();

        self.queue.push(&self.pool, sender, payload)?;

        trace!(id, "event queued from publisher");
        Ok(())
    }

    /// The number of events waiting for the next update of the bus.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// The pool that payloads are released to after dispatch. Acquire payloads from here.
    #[must_use]
    pub fn pool(&self) -> &ReferencePool {
        &self.pool
    }
}

impl<T: EventArgs> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            pool: self.pool.clone(),
        }
    }
}
