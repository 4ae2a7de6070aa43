use std::any::Any;
use std::sync::Arc;

use reference_pool::Reference;

/// Identifies the topic of an event. Handlers are subscribed per id.
pub type EventId = i32;

/// The object that raised an event, passed through to handlers unchanged.
///
/// Handlers that care about the sender recover its concrete type with `downcast_ref()`.
pub type Sender = Arc<dyn Any + Send + Sync>;

/// The payload base capability of an [`EventBus`][crate::EventBus].
///
/// Payloads are pooled objects: producers acquire them from the [`ReferencePool`] of the bus,
/// fill them in and fire them, after which the bus releases them back to the pool once all
/// handlers have seen them.
///
/// Implementations are usually enums or structs that group all events of one module, with
/// `id()` derived from the variant or a field.
///
/// [`ReferencePool`]: reference_pool::ReferencePool
pub trait EventArgs: Reference {
    /// The id of the event, used to look up its handlers.
    fn id(&self) -> EventId;
}
