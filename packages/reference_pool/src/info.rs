use crate::ReferenceType;

/// Point-in-time usage statistics of one reference type in a
/// [`ReferencePool`][crate::ReferencePool].
///
/// Obtained from [`ReferencePool::snapshot()`][crate::ReferencePool::snapshot]. The counters of
/// one record are mutually consistent: `using_count() == acquire_count() - release_count()`.
///
/// # Example
///
/// ```rust
/// use reference_pool::{Reference, ReferencePool};
///
/// #[derive(Default)]
/// struct Spawned {
///     entity: u64,
/// }
///
/// impl Reference for Spawned {
///     fn clear(&mut self) {
///         self.entity = 0;
///     }
/// }
///
/// let pool = ReferencePool::new();
/// let spawned = pool.acquire::<Spawned>().unwrap();
///
/// let info = &pool.snapshot()[0];
/// assert_eq!(info.using_count(), 1);
/// assert_eq!(info.unused_count(), 0);
///
/// pool.release(spawned).unwrap();
///
/// let info = &pool.snapshot()[0];
/// assert_eq!(info.using_count(), 0);
/// assert_eq!(info.unused_count(), 1);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReferencePoolInfo {
    reference_type: ReferenceType,
    unused_count: usize,
    using_count: isize,
    acquire_count: usize,
    release_count: usize,
    add_count: usize,
    remove_count: usize,
}

impl ReferencePoolInfo {
    pub(crate) fn new(
        reference_type: ReferenceType,
        unused_count: usize,
        using_count: isize,
        acquire_count: usize,
        release_count: usize,
        add_count: usize,
        remove_count: usize,
    ) -> Self {
        Self {
            reference_type,
            unused_count,
            using_count,
            acquire_count,
            release_count,
            add_count,
            remove_count,
        }
    }

    /// The type these statistics describe.
    #[must_use]
    pub fn reference_type(&self) -> ReferenceType {
        self.reference_type
    }

    /// Number of released instances waiting in the free list.
    #[must_use]
    pub fn unused_count(&self) -> usize {
        self.unused_count
    }

    /// Number of instances acquired and not yet released.
    ///
    /// Negative if more instances were released than acquired, which happens when callers
    /// release instances they constructed themselves.
    #[must_use]
    pub fn using_count(&self) -> isize {
        self.using_count
    }

    /// Total number of acquire operations.
    #[must_use]
    pub fn acquire_count(&self) -> usize {
        self.acquire_count
    }

    /// Total number of release operations.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Total number of instances constructed by the pool, either because an acquire found the
    /// free list empty or through preallocation.
    #[must_use]
    pub fn add_count(&self) -> usize {
        self.add_count
    }

    /// Total number of instances evicted from the free list.
    #[must_use]
    pub fn remove_count(&self) -> usize {
        self.remove_count
    }
}
