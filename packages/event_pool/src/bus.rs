use std::cell::RefCell;
use std::time::Duration;

use reference_pool::ReferencePool;
use tracing::{debug, trace};

use crate::{
    DeferredQueue, Error, EventArgs, EventBusBuilder, EventBusMode, EventHandler, EventId,
    HandlerRegistry, Publisher, Result, Sender,
};

/// A publish/subscribe event bus with deferred, single-threaded dispatch of pooled payloads.
///
/// Handlers subscribe to integer event ids. Events are either [fired][Self::fire] into a queue
/// that is drained in FIFO order by [`update()`][Self::update], which the owner calls once per
/// frame, or [dispatched immediately][Self::fire_now]. Either way, the handlers of the event id
/// are invoked in subscription order and the payload is released to the [`ReferencePool`] of the
/// bus afterwards, so steady-state event traffic does not allocate.
///
/// The [mode][EventBusMode] of the bus decides whether an event id may have several handlers,
/// whether the same handler may be subscribed twice and whether events without handlers are
/// errors.
///
/// # Re-entrancy
///
/// Handlers may use the bus they are invoked by: subscribe, unsubscribe (including themselves),
/// fire and dispatch further events. Unsubscribing a handler that has not yet been reached by an
/// in-flight dispatch prevents it from being invoked. Handlers subscribed during a dispatch of an
/// id are first invoked by the next dispatch of that id.
///
/// # Thread safety
///
/// The bus is single-threaded: handlers are not required to be thread-safe, so neither is the
/// bus. Other threads fire events through a [`Publisher`] obtained from
/// [`publisher()`][Self::publisher].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use event_pool::{EventArgs, EventBus, EventBusMode, EventHandler, EventId};
/// use reference_pool::{Reference, ReferencePool};
///
/// const LEVEL_LOADED: EventId = 1;
///
/// #[derive(Default)]
/// struct SceneEvent {
///     id: EventId,
///     name: String,
/// }
///
/// impl Reference for SceneEvent {
///     fn clear(&mut self) {
///         self.id = 0;
///         self.name.clear();
///     }
/// }
///
/// impl EventArgs for SceneEvent {
///     fn id(&self) -> EventId {
///         self.id
///     }
/// }
///
/// let pool = ReferencePool::new();
/// let bus = EventBus::<SceneEvent>::builder()
///     .mode(EventBusMode::ALLOW_MULTI_HANDLER)
///     .pool(pool.clone())
///     .build();
///
/// let on_loaded = EventHandler::new(|_, event: &SceneEvent| println!("loaded {}", event.name));
/// bus.subscribe(LEVEL_LOADED, on_loaded.clone()).unwrap();
///
/// let mut event = pool.acquire::<SceneEvent>().unwrap();
/// event.id = LEVEL_LOADED;
/// event.name.push_str("forest");
/// bus.fire(None, event).unwrap();
///
/// // Nothing is dispatched until the owner updates the bus.
/// bus.update(Duration::from_millis(16), Duration::from_millis(16))
///     .unwrap();
///
/// bus.unsubscribe(LEVEL_LOADED, &on_loaded).unwrap();
/// ```
#[derive(derive_more::Debug)]
pub struct EventBus<T: EventArgs> {
    #[debug(ignore)]
    handlers: HandlerRegistry<T>,

    #[debug(ignore)]
    default_handler: RefCell<Option<EventHandler<T>>>,

    #[debug(ignore)]
    queue: DeferredQueue<T>,

    pool: ReferencePool,
    mode: EventBusMode,
}

impl<T: EventArgs> EventBus<T> {
    pub(crate) fn new_inner(mode: EventBusMode, pool: ReferencePool) -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            default_handler: RefCell::new(None),
            queue: DeferredQueue::new(),
            pool,
            mode,
        }
    }

    /// Creates a new [`EventBus`] in [`EventBusMode::DEFAULT`], releasing payloads to the
    /// process-wide [`ReferencePool::global()`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`EventBus`].
    ///
    /// Use this when you want to customize the mode or the pool.
    pub fn builder() -> EventBusBuilder<T> {
        EventBusBuilder::new()
    }

    /// The mode the bus was built with.
    #[must_use]
    pub fn mode(&self) -> EventBusMode {
        self.mode
    }

    /// The pool that payloads are released to after dispatch. Acquire payloads from here.
    #[must_use]
    pub fn pool(&self) -> &ReferencePool {
        &self.pool
    }

    /// Creates a thread-safe handle for firing events into this bus from other threads.
    #[must_use]
    pub fn publisher(&self) -> Publisher<T> {
        Publisher::new(self.queue.clone(), self.pool.clone())
    }

    /// The number of handlers subscribed to `id`, counting duplicate subscriptions.
    #[must_use]
    pub fn handler_count(&self, id: EventId) -> usize {
        self.handlers.handler_count(id)
    }

    /// The number of event ids with at least one handler.
    #[must_use]
    pub fn subscribed_id_count(&self) -> usize {
        self.handlers.id_count()
    }

    /// Whether `handler` is subscribed to `id`.
    #[must_use]
    pub fn contains(&self, id: EventId, handler: &EventHandler<T>) -> bool {
        self.handlers.contains(id, handler)
    }

    /// The number of fired events waiting for the next [`update()`][Self::update].
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Subscribes `handler` to events with the given id.
    ///
    /// Handlers of an id are invoked in the order they were subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MultiHandlerNotAllowed`] if the id already has a handler and the mode
    /// does not allow multiple handlers, or [`Error::DuplicateHandlerNotAllowed`] if `handler` is
    /// already subscribed to the id and the mode does not allow duplicates. The subscriptions
    /// are unchanged in either case.
    pub fn subscribe(&self, id: EventId, handler: EventHandler<T>) -> Result<()> {
        self.handlers.subscribe(id, handler, self.mode)?;

        trace!(id, "handler subscribed");
        Ok(())
    }

    /// Unsubscribes `handler` from events with the given id.
    ///
    /// If the handler is subscribed more than once, the earliest subscription is removed. May be
    /// called from within a handler, including the handler being unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerNotFound`] if `handler` is not subscribed to the id.
    pub fn unsubscribe(&self, id: EventId, handler: &EventHandler<T>) -> Result<()> {
        self.handlers.unsubscribe(id, handler)?;

        trace!(id, "handler unsubscribed");
        Ok(())
    }

    /// Sets the handler that is invoked for events whose id has no handlers, replacing any
    /// previous one. `None` removes the default handler.
    ///
    /// The default handler takes priority over [`EventBusMode::ALLOW_NO_HANDLER`].
    pub fn set_default_handler(&self, handler: Option<EventHandler<T>>) {
        // The previous handler is dropped after the borrow ends.
        let previous = self.default_handler.replace(handler);
        drop(previous);
    }

    /// Queues an event for dispatch during the next [`update()`][Self::update].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pool`] if the pool rejects the queue entry.
    pub fn fire(&self, sender: Option<Sender>, payload: Box<T>) -> Result<()> {
        let id = payload.id();

        self.queue.push(&self.pool, sender, payload)?;

        trace!(id, "event queued");
        Ok(())
    }

    /// Dispatches an event immediately, ahead of any queued events, and releases its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHandler`] if the event has no handlers, there is no default handler
    /// and the mode does not allow unhandled events. The payload has been released by then.
    ///
    /// Returns [`Error::Pool`] if the pool rejects the payload on release.
    pub fn fire_now(&self, sender: Option<Sender>, payload: Box<T>) -> Result<()> {
        self.dispatch(sender, payload)
    }

    /// Dispatches queued events in the order they were fired, until the queue is empty.
    ///
    /// Events fired while the queue is being drained, whether by handlers or other threads, are
    /// dispatched by the same call after the events queued before them. The elapsed times are
    /// those of the frame that drives the update; they are not interpreted by the bus.
    ///
    /// # Errors
    ///
    /// Stops at the first event whose dispatch fails and returns its error. That event's payload
    /// has been released; the events behind it remain queued for the next update.
    pub fn update(&self, elapsed: Duration, real_elapsed: Duration) -> Result<()> {
        trace!(
            ?elapsed,
            ?real_elapsed,
            pending_count = self.queue.len(),
            "updating event bus"
        );

        while let Some(mut entry) = self.queue.pop() {
            let sender = entry.sender.take();
            let payload = entry.payload.take();

            self.pool.release(entry)?;

            if let Some(payload) = payload {
                self.dispatch(sender, payload)?;
            }
        }

        Ok(())
    }

    /// Discards all queued events without dispatching them.
    ///
    /// The discarded payloads are dropped, not released to the pool.
    pub fn clear(&self) {
        let discarded = self.queue.take_all();

        if !discarded.is_empty() {
            debug!(count = discarded.len(), "discarding queued events");
        }
    }

    /// Discards all queued events and removes all handlers, including the default handler.
    ///
    /// The bus remains usable afterwards.
    pub fn shutdown(&self) {
        self.clear();
        self.handlers.clear();
        self.set_default_handler(None);

        debug!("event bus shut down");
    }

    fn dispatch(&self, sender: Option<Sender>, payload: Box<T>) -> Result<()> {
        let id = payload.id();
        trace!(id, "dispatching event");

        let outcome = if self.handlers.dispatch(id, sender.as_ref(), &payload) {
            Ok(())
        } else if let Some(default_handler) = self.default_handler() {
            default_handler.invoke(sender.as_ref(), &payload);
            Ok(())
        } else if self.mode.contains(EventBusMode::ALLOW_NO_HANDLER) {
            trace!(id, "event has no handler, dropping");
            Ok(())
        } else {
            Err(Error::NoHandler { id })
        };

        // Released even if the event was unhandled, so that the error leaks nothing.
        let released = self.pool.release(payload).map_err(Error::from);

        outcome.and(released)
    }

    fn default_handler(&self) -> Option<EventHandler<T>> {
        self.default_handler.borrow().clone()
    }
}

impl<T: EventArgs> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
