use thiserror::Error;

/// Errors that can occur when operating on a [`ReferencePool`][crate::ReferencePool].
///
/// All of these indicate a programming error in the caller. The pool never retries an operation
/// internally and an operation that fails has no partial effect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An argument had a shape that the type system cannot rule out but the pool cannot accept.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        message: String,
    },

    /// The type does not satisfy the requirements for pooling.
    ///
    /// Only detected when strict checking is enabled.
    #[error("reference type '{type_name}' cannot be pooled: {reason}")]
    InvalidType {
        /// The name of the rejected type.
        type_name: &'static str,

        /// A human-readable description of why the type was rejected.
        reason: &'static str,
    },

    /// The instance being released is already in the free list of its type.
    ///
    /// Only detected when strict checking is enabled.
    #[error("reference of type '{type_name}' has already been released")]
    DoubleRelease {
        /// The name of the type of the released instance.
        type_name: &'static str,
    },
}

/// A specialized `Result` type for reference pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn messages_name_the_type() {
        let error = Error::DoubleRelease { type_name: "Foo" };
        assert_eq!(error.to_string(), "reference of type 'Foo' has already been released");

        let error = Error::InvalidType {
            type_name: "Bar",
            reason: "zero-sized",
        };
        assert_eq!(error.to_string(), "reference type 'Bar' cannot be pooled: zero-sized");
    }
}
