use thiserror::Error;

use crate::EventId;

/// Errors that can occur when operating on an [`EventBus`][crate::EventBus].
///
/// All of these indicate a programming error in the caller, either a subscription that violates
/// the [mode][crate::EventBusMode] of the bus or an event that nobody listens to.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A second handler was subscribed to an event id on a bus that does not allow
    /// multiple handlers per id.
    #[error("event {id} already has a handler and multiple handlers are not allowed")]
    MultiHandlerNotAllowed {
        /// The event id the subscription was for.
        id: EventId,
    },

    /// The same handler was subscribed twice to an event id on a bus that does not allow
    /// duplicate handlers.
    #[error("handler is already subscribed to event {id} and duplicate handlers are not allowed")]
    DuplicateHandlerNotAllowed {
        /// The event id the subscription was for.
        id: EventId,
    },

    /// The handler being unsubscribed is not subscribed to the event id.
    #[error("handler is not subscribed to event {id}")]
    HandlerNotFound {
        /// The event id the handler was expected under.
        id: EventId,
    },

    /// An event was dispatched that has no handlers, on a bus without a default handler that
    /// does not allow unhandled events.
    ///
    /// The payload has already been returned to the pool when this error is reported.
    #[error("event {id} has no handler")]
    NoHandler {
        /// The id of the unhandled event.
        id: EventId,
    },

    /// The reference pool backing the bus rejected an operation.
    #[error(transparent)]
    Pool(#[from] reference_pool::Error),
}

impl Error {
    /// Whether the error is a violation of the subscription policy of the bus.
    ///
    /// These are raised by `subscribe()` and `unsubscribe()` and leave the subscriptions
    /// unchanged.
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::MultiHandlerNotAllowed { .. }
                | Self::DuplicateHandlerNotAllowed { .. }
                | Self::HandlerNotFound { .. }
        )
    }
}

/// A specialized `Result` type for event bus operations, returning the crate's [`Error`] type
/// as the error value.
pub type Result<T> = std::result::Result<T, Error>;
