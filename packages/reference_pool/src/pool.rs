use std::any::TypeId;
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    AnyReference, Error, Reference, ReferenceCollection, ReferencePoolBuilder, ReferencePoolInfo,
    ReferenceType, Result,
};

static GLOBAL: LazyLock<ReferencePool> = LazyLock::new(ReferencePool::new);

/// A pool of reusable objects of any [`Reference`] type, keyed by type.
///
/// Each type gets its own free list (created on first use of that type), so short-lived objects
/// such as event payloads can be recycled instead of allocated anew every frame. After a warm-up
/// period in which the free lists fill up, a steady acquire/release cycle performs no allocations.
///
/// Instances are handed out as `Box<T>`. The identity of an instance is its heap allocation:
/// releasing an instance and acquiring one of the same type again returns the very same
/// allocation, cleared.
///
/// This type acts as a cloneable handle to a shared pool instance. All clones operate on the
/// same free lists. A process-wide instance is available via [`global()`][Self::global], while
/// separate instances can be created for isolation (e.g. in tests).
///
/// # Strict checking
///
/// When [strict checking][Self::strict_check] is enabled, the pool rejects zero-sized types
/// (which have no allocation to reuse) with [`Error::InvalidType`] and detects releasing an
/// instance that is already in its free list with [`Error::DoubleRelease`]. Without strict
/// checking, these conditions are not detected.
///
/// # Thread safety
///
/// This type is thread-safe. The registry of types and each free list are guarded by separate
/// locks, so operations on different types do not contend with each other beyond the brief
/// registry lookup.
///
/// # Example
///
/// ```rust
/// use reference_pool::{Reference, ReferencePool};
///
/// #[derive(Default)]
/// struct ItemPickedUp {
///     item_id: u32,
/// }
///
/// impl Reference for ItemPickedUp {
///     fn clear(&mut self) {
///         self.item_id = 0;
///     }
/// }
///
/// let pool = ReferencePool::new();
///
/// let mut event = pool.acquire::<ItemPickedUp>().unwrap();
/// event.item_id = 42;
/// pool.release(event).unwrap();
///
/// // The released instance is reused, already cleared.
/// let event = pool.acquire::<ItemPickedUp>().unwrap();
/// assert_eq!(event.item_id, 0);
/// ```
#[derive(Clone, Debug)]
pub struct ReferencePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    collections: Mutex<HashMap<TypeId, Arc<ReferenceCollection>>>,
    strict_check: AtomicBool,
}

impl fmt::Debug for PoolInner {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, no contract to verify.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let collection_count = self.collections.lock().len();

        f.debug_struct("PoolInner")
            .field("collection_count", &collection_count)
            .field("strict_check", &self.strict_check.load(Ordering::Relaxed))
            .finish()
    }
}

impl ReferencePool {
    pub(crate) fn new_inner(strict_check: bool) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                collections: Mutex::new(HashMap::new()),
                strict_check: AtomicBool::new(strict_check),
            }),
        }
    }

    /// Creates a new [`ReferencePool`] with the default configuration.
    ///
    /// The pool starts empty; free lists are created as types are first used.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`ReferencePool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> ReferencePoolBuilder {
        ReferencePoolBuilder::new()
    }

    /// The process-wide pool shared by all modules that do not bring their own.
    ///
    /// Created with the default configuration on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Whether strict checking is currently enabled.
    #[must_use]
    pub fn strict_check(&self) -> bool {
        self.inner.strict_check.load(Ordering::Relaxed)
    }

    /// Enables or disables strict checking for all handles to this pool.
    pub fn set_strict_check(&self, enabled: bool) {
        self.inner.strict_check.store(enabled, Ordering::Relaxed);
    }

    /// The number of distinct types the pool has seen.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.inner.collections.lock().len()
    }

    /// Takes an instance of `T` from the pool, constructing a new one if none is available.
    ///
    /// A reused instance was cleared when it was released, so it is in its default state.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized.
    pub fn acquire<T: Reference>(&self) -> Result<Box<T>> {
        let reference_type = ReferenceType::of::<T>();
        self.check_poolable(&reference_type)?;

        self.collection(&reference_type).acquire::<T>()
    }

    /// Takes an instance of the described type from the pool, constructing a new one if none
    /// is available.
    ///
    /// Use `downcast()` on the result to recover the concrete type.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if the type is zero-sized.
    pub fn acquire_dyn(&self, reference_type: &ReferenceType) -> Result<Box<dyn AnyReference>> {
        self.check_poolable(reference_type)?;

        Ok(self.collection(reference_type).acquire_erased())
    }

    /// Takes an instance of `T` from the pool and gives up the `Box`, returning the raw
    /// allocation.
    ///
    /// The allocation must eventually be handed back via [`release_raw()`][1] or reassembled into
    /// a `Box<T>` via [`Box::from_raw()`].
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized.
    ///
    /// [1]: Self::release_raw
    pub fn acquire_raw<T: Reference>(&self) -> Result<NonNull<T>> {
        self.acquire::<T>().map(|reference| NonNull::from(Box::leak(reference)))
    }

    /// Clears the instance and returns it to the free list of its type.
    ///
    /// The instance does not need to have been acquired from this pool.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized and
    /// [`Error::DoubleRelease`] if the allocation is already in the free list.
    pub fn release<T: Reference>(&self, reference: Box<T>) -> Result<()> {
        let reference_type = ReferenceType::of::<T>();
        self.check_poolable(&reference_type)?;

        self.collection(&reference_type)
            .release(reference, self.strict_check())
    }

    /// Clears the type-erased instance and returns it to the free list of its type.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if the type is zero-sized and
    /// [`Error::DoubleRelease`] if the allocation is already in the free list.
    pub fn release_dyn(&self, reference: Box<dyn AnyReference>) -> Result<()> {
        let reference_type = reference.reference_type();
        self.check_poolable(&reference_type)?;

        self.collection(&reference_type)
            .release(reference, self.strict_check())
    }

    /// Clears the instance behind a raw allocation and returns it to the free list of its type.
    ///
    /// Unlike a `Box`, a raw pointer can be duplicated, so the same allocation can be released
    /// more than once. With strict checking, the second release is detected and rejected before
    /// the pool takes ownership, leaving the free list intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the pointer is not aligned for `T`. With strict
    /// checking, returns [`Error::InvalidType`] if `T` is zero-sized and
    /// [`Error::DoubleRelease`] if the allocation is already in the free list.
    ///
    /// # Safety
    ///
    /// The pointer must have been obtained from [`acquire_raw()`][1] or [`Box::into_raw()`] for
    /// a `Box<T>`, and the caller must own the allocation: it must not have been released or
    /// freed since it was obtained, and no references to it may exist.
    ///
    /// With strict checking enabled, releasing an allocation that is currently in the free list
    /// is an exception to this rule: it is detected and returns [`Error::DoubleRelease`].
    /// Without strict checking, doing so is undefined behavior.
    ///
    /// [1]: Self::acquire_raw
    pub unsafe fn release_raw<T: Reference>(&self, reference: NonNull<T>) -> Result<()> {
        let reference_type = ReferenceType::of::<T>();
        self.check_poolable(&reference_type)?;

        if !reference.as_ptr().is_aligned() {
            return Err(Error::InvalidArgument {
                message: format!(
                    "pointer {reference:p} is not aligned for '{}'",
                    reference_type.name()
                ),
            });
        }

        let collection = self.collection(&reference_type);
        let strict_check = self.strict_check();

        if strict_check && collection.contains(reference.as_ptr().cast_const().cast::<()>()) {
            return Err(Error::DoubleRelease {
                type_name: reference_type.name(),
            });
        }

        // SAFETY: Forwarding guarantee from the caller that we are the owner of a `Box<T>`
        // allocation. We have verified above that the free list is not a competing owner.
        let reference = unsafe { Box::from_raw(reference.as_ptr()) };

        collection.release(reference, strict_check)
    }

    /// Preallocates `count` instances of `T` into its free list.
    ///
    /// Does not affect the count of instances in use.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized.
    pub fn add<T: Reference>(&self, count: usize) -> Result<()> {
        self.add_dyn(&ReferenceType::of::<T>(), count)
    }

    /// Preallocates `count` instances of the described type into its free list.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if the type is zero-sized.
    pub fn add_dyn(&self, reference_type: &ReferenceType, count: usize) -> Result<()> {
        self.check_poolable(reference_type)?;

        self.collection(reference_type).add(count);
        Ok(())
    }

    /// Evicts up to `count` unused instances of `T` from its free list.
    ///
    /// If fewer than `count` instances are unused, all of them are evicted.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized.
    pub fn remove<T: Reference>(&self, count: usize) -> Result<()> {
        self.remove_dyn(&ReferenceType::of::<T>(), count)
    }

    /// Evicts up to `count` unused instances of the described type from its free list.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if the type is zero-sized.
    pub fn remove_dyn(&self, reference_type: &ReferenceType, count: usize) -> Result<()> {
        self.check_poolable(reference_type)?;

        self.collection(reference_type).remove(count);
        Ok(())
    }

    /// Evicts all unused instances of `T` from its free list.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if `T` is zero-sized.
    pub fn remove_all<T: Reference>(&self) -> Result<()> {
        self.remove_all_dyn(&ReferenceType::of::<T>())
    }

    /// Evicts all unused instances of the described type from its free list.
    ///
    /// # Errors
    ///
    /// With strict checking, returns [`Error::InvalidType`] if the type is zero-sized.
    pub fn remove_all_dyn(&self, reference_type: &ReferenceType) -> Result<()> {
        self.check_poolable(reference_type)?;

        self.collection(reference_type).remove_all();
        Ok(())
    }

    /// Evicts all unused instances of all types and forgets all types and their statistics.
    ///
    /// Intended for process teardown. Instances still in use are not tracked after this point;
    /// releasing one later starts fresh statistics for its type.
    pub fn clear_all(&self) {
        let collections = mem::take(&mut *self.inner.collections.lock());

        debug!(
            collection_count = collections.len(),
            "clearing all reference collections"
        );

        for collection in collections.values() {
            collection.remove_all();
        }
    }

    /// Returns the usage statistics of every type the pool has seen, ordered by type name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ReferencePoolInfo> {
        let collections: Vec<_> = self
            .inner
            .collections
            .lock()
            .values()
            .map(Arc::clone)
            .collect();

        let mut infos: Vec<_> = collections
            .iter()
            .map(|collection| collection.info())
            .collect();
        infos.sort_by_key(|info| info.reference_type().name());

        infos
    }

    fn check_poolable(&self, reference_type: &ReferenceType) -> Result<()> {
        if !self.strict_check() {
            return Ok(());
        }

        if reference_type.size() == 0 {
            return Err(Error::InvalidType {
                type_name: reference_type.name(),
                reason: "zero-sized types have no allocation to reuse",
            });
        }

        Ok(())
    }

    fn collection(&self, reference_type: &ReferenceType) -> Arc<ReferenceCollection> {
        let mut collections = self.inner.collections.lock();

        let collection = collections
            .entry(reference_type.type_id())
            .or_insert_with(|| {
                debug!(
                    type_name = reference_type.name(),
                    "creating reference collection"
                );
                Arc::new(ReferenceCollection::new(*reference_type))
            });

        Arc::clone(collection)
    }
}

impl Default for ReferencePool {
    fn default() -> Self {
        Self::new()
    }
}
