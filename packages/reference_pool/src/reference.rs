use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An object that can be stored in a [`ReferencePool`][crate::ReferencePool] and reused.
///
/// The pool creates new instances through [`Default`] when its free list is empty and calls
/// [`clear()`][Self::clear] on every instance that is released back to it, before the instance
/// becomes available for reuse. An acquired instance is therefore always either freshly
/// constructed or cleared.
///
/// # Example
///
/// ```rust
/// use reference_pool::Reference;
///
/// #[derive(Default)]
/// struct DamageTaken {
///     amount: u32,
///     source: String,
/// }
///
/// impl Reference for DamageTaken {
///     fn clear(&mut self) {
///         self.amount = 0;
///         self.source.clear();
///     }
/// }
/// ```
pub trait Reference: Default + Send + 'static {
    /// Resets the object to a state indistinguishable from a freshly constructed one.
    ///
    /// Implementations should retain any owned capacity (e.g. string or vector buffers) so that
    /// reuse stays allocation-free.
    fn clear(&mut self);
}

/// Type-erased view of a [`Reference`], used by the dynamic (`*_dyn`) pool operations.
///
/// This is implemented for every [`Reference`] type; you never need to implement it yourself.
pub trait AnyReference: Any + Send {
    /// Calls [`Reference::clear()`] on the underlying object.
    fn clear_any(&mut self);

    /// Describes the concrete type of the underlying object.
    fn reference_type(&self) -> ReferenceType;

    /// Converts the boxed object into a `Box<dyn Any>` for downcasting by the caller.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Reference> AnyReference for T {
    fn clear_any(&mut self) {
        self.clear();
    }

    fn reference_type(&self) -> ReferenceType {
        ReferenceType::of::<T>()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl dyn AnyReference {
    /// Whether the underlying object is of type `T`.
    #[must_use]
    pub fn is<T: Reference>(&self) -> bool {
        self.reference_type().type_id() == TypeId::of::<T>()
    }

    /// Recovers the concrete type of a type-erased reference.
    ///
    /// # Errors
    ///
    /// Returns the original box if the underlying object is not of type `T`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use reference_pool::{AnyReference, Reference, ReferencePool, ReferenceType};
    ///
    /// #[derive(Default)]
    /// struct Marker(u8);
    ///
    /// impl Reference for Marker {
    ///     fn clear(&mut self) {
    ///         self.0 = 0;
    ///     }
    /// }
    ///
    /// let pool = ReferencePool::new();
    /// let erased = pool.acquire_dyn(&ReferenceType::of::<Marker>()).unwrap();
    ///
    /// let marker: Box<Marker> = erased.downcast().unwrap();
    /// assert_eq!(marker.0, 0);
    /// ```
    pub fn downcast<T: Reference>(self: Box<Self>) -> Result<Box<T>, Box<Self>> {
        if !self.is::<T>() {
            return Err(self);
        }

        // SAFETY: The object was constructed as a `T` (its type ID matches), so the data
        // pointer of the trait object points to a valid, uniquely owned `T` allocation.
        Ok(unsafe { Box::from_raw(Box::into_raw(self).cast::<T>()) })
    }
}

impl fmt::Debug for dyn AnyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyReference")
            .field("type_name", &self.reference_type().name())
            .finish_non_exhaustive()
    }
}

/// Runtime descriptor of a [`Reference`] type.
///
/// This is the "type" argument of the dynamic pool operations, for callers that only know the
/// type to pool at runtime (e.g. from a registration table). Two descriptors are equal if they
/// describe the same type.
///
/// # Example
///
/// ```rust
/// use reference_pool::{Reference, ReferenceType};
///
/// #[derive(Default)]
/// struct Hit;
///
/// impl Reference for Hit {
///     fn clear(&mut self) {}
/// }
///
/// let descriptor = ReferenceType::of::<Hit>();
/// assert!(descriptor.name().ends_with("Hit"));
/// assert_eq!(descriptor, ReferenceType::of::<Hit>());
/// ```
#[derive(Clone, Copy)]
pub struct ReferenceType {
    type_id: TypeId,
    name: &'static str,
    size: usize,
    construct: fn() -> Box<dyn AnyReference>,
}

impl ReferenceType {
    /// Describes the type `T`.
    #[must_use]
    pub fn of<T: Reference>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            size: size_of::<T>(),
            construct: construct::<T>,
        }
    }

    /// The unique identifier of the described type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The name of the described type, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The size of one instance of the described type, in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Creates a new default-constructed instance of the described type.
    #[must_use]
    pub fn construct(&self) -> Box<dyn AnyReference> {
        (self.construct)()
    }
}

fn construct<T: Reference>() -> Box<dyn AnyReference> {
    Box::new(T::default())
}

impl PartialEq for ReferenceType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ReferenceType {}

impl Hash for ReferenceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceType")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
