use crate::ReferencePool;

/// Builder for creating an instance of [`ReferencePool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`ReferencePool::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use reference_pool::ReferencePool;
///
/// let pool = ReferencePool::builder().strict_check(true).build();
/// assert!(pool.strict_check());
/// ```
///
/// [1]: ReferencePool::new
#[derive(Debug)]
#[must_use]
pub struct ReferencePoolBuilder {
    strict_check: bool,
}

impl ReferencePoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            strict_check: cfg!(debug_assertions),
        }
    }

    /// Enables or disables strict checking.
    ///
    /// With strict checking, the pool rejects types that cannot be meaningfully pooled and
    /// detects instances being released twice. The double release check scans the free list of
    /// the released type, so its cost grows with the number of unused instances.
    ///
    /// Defaults to enabled in debug builds and disabled in release builds. The setting can be
    /// changed later via [`ReferencePool::set_strict_check()`].
    pub fn strict_check(mut self, enabled: bool) -> Self {
        self.strict_check = enabled;
        self
    }

    /// Builds the reference pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> ReferencePool {
        ReferencePool::new_inner(self.strict_check)
    }
}
