use core::alloc::Layout;

use alloc::alloc::handle_alloc_error;
use thiserror::Error;

/// Errors reported by the fallible table operations.
///
/// Whenever one of these is returned the table is left exactly as it was
/// before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested key is not present in the map.
    #[error("key not found")]
    KeyNotFound,

    /// The number of slots required does not fit in `usize`, or its memory
    /// layout exceeds `isize::MAX` bytes.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator could not provide the backing storage for a rehash.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// Layout of the allocation that failed.
        layout: Layout,
    },
}

/// Unwraps the result of a growth operation for the infallible APIs.
///
/// Allocation failures go through `handle_alloc_error`, matching the
/// behavior of the standard collections.
#[cold]
#[inline(never)]
pub(crate) fn growth_failed(err: Error) -> ! {
    match err {
        Error::AllocError { layout } => handle_alloc_error(layout),
        err => panic!("{err}"),
    }
}

#[inline]
pub(crate) fn infallible<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => growth_failed(err),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(Error::CapacityOverflow.to_string(), "capacity overflow");

        let layout = Layout::array::<u64>(4).unwrap();
        assert_eq!(
            Error::AllocError { layout }.to_string(),
            "memory allocation of 32 bytes failed"
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn overflow_panics() {
        infallible::<()>(Err(Error::CapacityOverflow));
    }
}
