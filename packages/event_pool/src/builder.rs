use std::fmt;
use std::marker::PhantomData;

use reference_pool::ReferencePool;

use crate::{EventArgs, EventBus, EventBusMode};

/// Builder for creating an instance of [`EventBus`].
///
/// The default configuration used by [`EventBus::new()`][1] uses [`EventBusMode::DEFAULT`] and
/// the process-wide [`ReferencePool::global()`].
///
/// # Examples
///
/// ```
/// use event_pool::{EventArgs, EventBus, EventBusMode, EventId};
/// use reference_pool::{Reference, ReferencePool};
///
/// #[derive(Default)]
/// struct UiEvent {
///     id: EventId,
/// }
///
/// impl Reference for UiEvent {
///     fn clear(&mut self) {
///         self.id = 0;
///     }
/// }
///
/// impl EventArgs for UiEvent {
///     fn id(&self) -> EventId {
///         self.id
///     }
/// }
///
/// let bus = EventBus::<UiEvent>::builder()
///     .mode(EventBusMode::ALLOW_NO_HANDLER | EventBusMode::ALLOW_MULTI_HANDLER)
///     .pool(ReferencePool::new())
///     .build();
///
/// assert!(bus.mode().contains(EventBusMode::ALLOW_NO_HANDLER));
/// ```
///
/// [1]: EventBus::new
#[must_use]
pub struct EventBusBuilder<T> {
    mode: EventBusMode,
    pool: Option<ReferencePool>,

    _payload: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for EventBusBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, no contract to verify.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field(
                "payload_type",
                &format_args!("{}", std::any::type_name::<T>()),
            )
            .field("mode", &self.mode)
            .field("pool", &self.pool)
            .finish()
    }
}

impl<T: EventArgs> EventBusBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            mode: EventBusMode::DEFAULT,
            pool: None,
            _payload: PhantomData,
        }
    }

    /// Sets the [mode][EventBusMode] that governs subscriptions and unhandled events.
    pub fn mode(mut self, mode: EventBusMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the pool that payloads are released to after dispatch and that pending queue
    /// entries are taken from.
    ///
    /// Defaults to [`ReferencePool::global()`].
    pub fn pool(mut self, pool: ReferencePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Builds the event bus with the specified configuration.
    #[must_use]
    pub fn build(self) -> EventBus<T> {
        let pool = self
            .pool
            .unwrap_or_else(|| ReferencePool::global().clone());

        EventBus::new_inner(self.mode, pool)
    }
}
