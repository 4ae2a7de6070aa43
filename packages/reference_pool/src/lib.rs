#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This package provides [`ReferencePool`], a type-keyed pool of reusable objects.
//!
//! Game loops and similar frame-driven systems create many short-lived objects every frame:
//! event payloads, command arguments, intermediate results. Allocating each of them anew puts
//! the allocator on the hot path. A reference pool instead keeps a free list per type: objects
//! are acquired from the pool, used, and released back to it, where they wait (cleared) for
//! the next acquire of the same type.
//!
//! # Features
//!
//! - **Any type**: every type implementing [`Reference`] can be pooled; free lists are created
//!   on first use of a type.
//! - **Typed and dynamic access**: [`ReferencePool::acquire()`] for statically known types,
//!   [`ReferencePool::acquire_dyn()`] with a runtime [`ReferenceType`] descriptor.
//! - **No state leaks**: instances are cleared when released, so an acquired instance is always
//!   in its default state.
//! - **Thread-safe**: acquire and release from any thread; each type has its own lock.
//! - **Diagnostics**: [`ReferencePool::snapshot()`] reports per-type usage statistics.
//! - **Strict checking**: optional detection of unpoolable types and double releases, enabled
//!   by default in debug builds.
//!
//! # Example
//!
//! ```rust
//! use reference_pool::{Reference, ReferencePool};
//!
//! #[derive(Default)]
//! struct PlayerMoved {
//!     player_id: u32,
//!     x: f32,
//!     y: f32,
//! }
//!
//! impl Reference for PlayerMoved {
//!     fn clear(&mut self) {
//!         *self = Self::default();
//!     }
//! }
//!
//! let pool = ReferencePool::new();
//!
//! // Warm up the pool so that the first frames do not allocate.
//! pool.add::<PlayerMoved>(16).unwrap();
//!
//! let mut moved = pool.acquire::<PlayerMoved>().unwrap();
//! moved.player_id = 7;
//! moved.x = 1.5;
//!
//! pool.release(moved).unwrap();
//!
//! let info = &pool.snapshot()[0];
//! assert_eq!(info.unused_count(), 16);
//! assert_eq!(info.using_count(), 0);
//! ```

mod builder;
mod collection;
mod error;
mod info;
mod pool;
mod reference;

pub use builder::*;
pub(crate) use collection::*;
pub use error::*;
pub use info::*;
pub use pool::*;
pub use reference::*;
