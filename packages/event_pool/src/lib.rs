#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This package provides [`EventBus`], a deferred publish/subscribe event bus whose payloads are
//! recycled through a [`ReferencePool`][reference_pool::ReferencePool].
//!
//! Modules of a frame-driven application (a game, a simulation) notify each other through
//! events without knowing about each other: producers fire events with an integer id, consumers
//! subscribe handlers to the ids they care about. Events are queued and dispatched on the
//! owning thread when the bus is updated, typically once per frame, no matter which thread fired
//! them.
//!
//! # Features
//!
//! - **Deferred or immediate**: [`EventBus::fire()`] queues an event for the next
//!   [`EventBus::update()`], [`EventBus::fire_now()`] dispatches it on the spot.
//! - **Ordered**: queued events are dispatched in the order they were fired; the handlers of an
//!   id are invoked in the order they were subscribed.
//! - **Re-entrant**: handlers may subscribe, unsubscribe and fire events while being invoked,
//!   including unsubscribing themselves or handlers that have not run yet.
//! - **Pooled payloads**: payloads are released to the pool after dispatch, so steady-state
//!   event traffic does not allocate.
//! - **Policies**: the [`EventBusMode`] of a bus decides whether ids may have several handlers,
//!   whether a handler may be subscribed twice and whether unhandled events are errors.
//! - **Cross-thread producers**: a [`Publisher`] fires events into the queue from any thread.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use event_pool::{EventArgs, EventBus, EventBusMode, EventHandler, EventId};
//! use reference_pool::{Reference, ReferencePool};
//!
//! const PLAYER_DIED: EventId = 10;
//! const PLAYER_RESPAWNED: EventId = 11;
//!
//! #[derive(Default)]
//! struct PlayerEvent {
//!     id: EventId,
//!     player_id: u32,
//! }
//!
//! impl Reference for PlayerEvent {
//!     fn clear(&mut self) {
//!         *self = Self::default();
//!     }
//! }
//!
//! impl EventArgs for PlayerEvent {
//!     fn id(&self) -> EventId {
//!         self.id
//!     }
//! }
//!
//! let pool = ReferencePool::new();
//! let bus = EventBus::<PlayerEvent>::builder()
//!     .mode(EventBusMode::ALLOW_NO_HANDLER | EventBusMode::ALLOW_MULTI_HANDLER)
//!     .pool(pool.clone())
//!     .build();
//!
//! bus.subscribe(
//!     PLAYER_DIED,
//!     EventHandler::new(|_, event: &PlayerEvent| println!("player {} died", event.player_id)),
//! )
//! .unwrap();
//!
//! for (id, player_id) in [(PLAYER_DIED, 1), (PLAYER_RESPAWNED, 1)] {
//!     let mut event = pool.acquire::<PlayerEvent>().unwrap();
//!     event.id = id;
//!     event.player_id = player_id;
//!     bus.fire(None, event).unwrap();
//! }
//!
//! // Once per frame, on the owning thread. Nobody listens to PLAYER_RESPAWNED,
//! // which this bus allows.
//! bus.update(Duration::from_millis(16), Duration::from_millis(16))
//!     .unwrap();
//! assert_eq!(bus.pending_count(), 0);
//! ```

mod args;
mod builder;
mod bus;
mod error;
mod handler;
mod mode;
mod publisher;
mod queue;
mod registry;

pub use args::*;
pub use builder::*;
pub use bus::*;
pub use error::*;
pub use handler::*;
pub use mode::*;
pub use publisher::*;
pub(crate) use queue::*;
pub(crate) use registry::*;
