use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::ptr;

use parking_lot::Mutex;
use tracing::trace;

use crate::{AnyReference, Error, Reference, ReferencePoolInfo, ReferenceType, Result};

/// The free list and usage counters of one reference type.
///
/// The free list and the counters share one lock, so any snapshot of the counters is consistent
/// with the free list length at the time it was taken.
pub(crate) struct ReferenceCollection {
    reference_type: ReferenceType,
    state: Mutex<CollectionState>,
}

struct CollectionState {
    /// Released instances, oldest first. Every instance in here has been cleared.
    free: VecDeque<Box<dyn AnyReference>>,

    /// Signed because callers may release instances they constructed themselves, which were
    /// never counted as acquired.
    using_count: isize,
    acquire_count: usize,
    release_count: usize,
    add_count: usize,
    remove_count: usize,
}

impl CollectionState {
    fn contains(&self, address: *const ()) -> bool {
        self.free
            .iter()
            .any(|resident| ptr::addr_eq(address_of(resident.as_ref()), address))
    }
}

fn address_of(reference: &dyn AnyReference) -> *const () {
    ptr::from_ref(reference).cast::<()>()
}

impl ReferenceCollection {
    pub(crate) fn new(reference_type: ReferenceType) -> Self {
        Self {
            reference_type,
            state: Mutex::new(CollectionState {
                free: VecDeque::new(),
                using_count: 0,
                acquire_count: 0,
                release_count: 0,
                add_count: 0,
                remove_count: 0,
            }),
        }
    }

    /// Takes an instance from the free list, or `None` if the caller has to construct one.
    ///
    /// Either way the instance is counted as acquired.
    fn take_free(&self) -> Option<Box<dyn AnyReference>> {
        let mut state = self.state.lock();

        state.using_count = state.using_count.wrapping_add(1);
        state.acquire_count = state.acquire_count.wrapping_add(1);

        let reused = state.free.pop_front();

        if reused.is_none() {
            state.add_count = state.add_count.wrapping_add(1);
        }

        reused
    }

    pub(crate) fn acquire<T: Reference>(&self) -> Result<Box<T>> {
        if !self.holds::<T>() {
            return Err(type_mismatch::<T>());
        }

        match self.take_free() {
            Some(reused) => reused.downcast::<T>().map_err(|_| type_mismatch::<T>()),
            None => {
                trace!(
                    type_name = self.reference_type.name(),
                    "free list empty, constructing new instance"
                );
                Ok(Box::default())
            }
        }
    }

    pub(crate) fn acquire_erased(&self) -> Box<dyn AnyReference> {
        self.take_free().unwrap_or_else(|| {
            trace!(
                type_name = self.reference_type.name(),
                "free list empty, constructing new instance"
            );
            self.reference_type.construct()
        })
    }

    /// Clears the instance and appends it to the free list.
    ///
    /// With `strict_check`, fails if the same allocation is already in the free list. In that
    /// case the free list remains the owner of the allocation and `reference` is forgotten
    /// instead of dropped, so the allocation is not freed twice.
    pub(crate) fn release(
        &self,
        mut reference: Box<dyn AnyReference>,
        strict_check: bool,
    ) -> Result<()> {
        // User code; must not run under our lock.
        reference.clear_any();

        let mut state = self.state.lock();

        if strict_check && state.contains(address_of(reference.as_ref())) {
            drop(state);
            mem::forget(reference);

            return Err(Error::DoubleRelease {
                type_name: self.reference_type.name(),
            });
        }

        state.free.push_back(reference);
        state.release_count = state.release_count.wrapping_add(1);
        state.using_count = state.using_count.wrapping_sub(1);

        Ok(())
    }

    /// Whether the allocation at `address` is currently in the free list.
    pub(crate) fn contains(&self, address: *const ()) -> bool {
        self.state.lock().contains(address)
    }

    pub(crate) fn add(&self, count: usize) {
        let mut created = Vec::with_capacity(count);
        created.extend((0..count).map(|_| self.reference_type.construct()));

        let mut state = self.state.lock();
        state.add_count = state.add_count.wrapping_add(count);
        state.free.extend(created);
    }

    /// Removes up to `count` instances from the free list. Over-removal is clamped.
    pub(crate) fn remove(&self, count: usize) {
        let removed: Vec<_> = {
            let mut state = self.state.lock();
            let count = count.min(state.free.len());

            state.remove_count = state.remove_count.wrapping_add(count);
            state.free.drain(..count).collect()
        };

        // Dropping runs user code, so it happens after the lock is released.
        drop(removed);
    }

    pub(crate) fn remove_all(&self) {
        let removed = {
            let mut state = self.state.lock();
            let removed = mem::take(&mut state.free);

            state.remove_count = state.remove_count.wrapping_add(removed.len());
            removed
        };

        drop(removed);
    }

    pub(crate) fn info(&self) -> ReferencePoolInfo {
        let state = self.state.lock();

        ReferencePoolInfo::new(
            self.reference_type,
            state.free.len(),
            state.using_count,
            state.acquire_count,
            state.release_count,
            state.add_count,
            state.remove_count,
        )
    }

    fn holds<T: Reference>(&self) -> bool {
        self.reference_type == ReferenceType::of::<T>()
    }
}

fn type_mismatch<T: Reference>() -> Error {
    Error::InvalidType {
        type_name: std::any::type_name::<T>(),
        reason: "the collection holds instances of a different type",
    }
}

impl fmt::Debug for ReferenceCollection {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, no contract to verify.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("ReferenceCollection")
            .field("reference_type", &self.reference_type)
            .field("unused_count", &state.free.len())
            .field("using_count", &state.using_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ReferenceCollection: Send, Sync);

    #[derive(Debug, Default)]
    struct Score {
        points: u32,
    }

    impl Reference for Score {
        fn clear(&mut self) {
            self.points = 0;
        }
    }

    #[derive(Debug, Default)]
    struct Other {
        _value: u8,
    }

    impl Reference for Other {
        fn clear(&mut self) {}
    }

    fn collection() -> ReferenceCollection {
        ReferenceCollection::new(ReferenceType::of::<Score>())
    }

    #[test]
    fn acquire_from_empty_counts_as_added() {
        let collection = collection();

        let score = collection.acquire::<Score>().unwrap();
        assert_eq!(score.points, 0);

        let info = collection.info();
        assert_eq!(info.unused_count(), 0);
        assert_eq!(info.using_count(), 1);
        assert_eq!(info.acquire_count(), 1);
        assert_eq!(info.add_count(), 1);
    }

    #[test]
    fn release_clears_and_reuses_oldest_first() {
        let collection = collection();

        let mut first = collection.acquire::<Score>().unwrap();
        let mut second = collection.acquire::<Score>().unwrap();
        first.points = 1;
        second.points = 2;

        let first_address = ptr::from_ref(first.as_ref()).cast::<()>();

        collection.release(first, true).unwrap();
        collection.release(second, true).unwrap();

        let reused = collection.acquire::<Score>().unwrap();
        assert!(ptr::addr_eq(ptr::from_ref(reused.as_ref()), first_address));
        assert_eq!(reused.points, 0);
    }

    #[test]
    fn acquire_of_wrong_type_is_rejected() {
        let collection = collection();

        let error = collection.acquire::<Other>().unwrap_err();
        assert!(matches!(error, Error::InvalidType { .. }));

        // Rejected before touching the counters.
        assert_eq!(collection.info().acquire_count(), 0);
    }

    #[test]
    fn contains_finds_resident_allocation() {
        let collection = collection();
        let score = collection.acquire::<Score>().unwrap();
        let address = ptr::from_ref(score.as_ref()).cast::<()>();

        collection.release(score, true).unwrap();

        assert!(collection.contains(address));
        assert!(!collection.contains(ptr::null()));
    }

    #[test]
    fn remove_is_clamped_to_free_list() {
        let collection = collection();
        collection.add(3);

        collection.remove(10);

        let info = collection.info();
        assert_eq!(info.unused_count(), 0);
        assert_eq!(info.add_count(), 3);
        assert_eq!(info.remove_count(), 3);
    }

    #[test]
    fn remove_all_counts_removed_instances() {
        let collection = collection();
        collection.add(4);
        collection.remove(1);

        collection.remove_all();

        let info = collection.info();
        assert_eq!(info.unused_count(), 0);
        assert_eq!(info.remove_count(), 4);
    }

    #[test]
    fn erased_acquire_constructs_described_type() {
        let collection = collection();

        let erased = collection.acquire_erased();
        assert!(erased.is::<Score>());

        collection.release(erased, false).unwrap();
        assert_eq!(collection.info().unused_count(), 1);
        assert_eq!(collection.info().using_count(), 0);
    }
}
