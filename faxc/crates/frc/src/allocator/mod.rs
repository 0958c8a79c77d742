//! Allocator Module - Raw Storage for Reference-Counted Objects
//!
//! FRC does not own a general-purpose allocator. Storage comes from an
//! opaque collaborator behind the [`RawAllocator`] trait, which sees exactly
//! two calls:
//!
//! - `allocate(size)` when a constructor builds an object
//!   (`size = HEADER_SIZE + capacity`)
//! - `free(capacity, address)` when a release observes the count reach zero
//!   (`capacity` as recorded in the header, so size-class allocators can find
//!   the matching bin without a lookup)
//!
//! ## Implementations
//!
//! - [`SystemAllocator`]: the Rust global allocator
//! - [`TrackingAllocator`]: wrapper recording every allocation and free,
//!   catching double frees and leaks

pub mod system;
pub mod tracking;

pub use system::SystemAllocator;
pub use tracking::{FreeRecord, TrackingAllocator};

use crate::error::Result;

/// Storage provider for heap objects
///
/// Addresses are plain `usize` values; `0` is never a valid result.
pub trait RawAllocator {
    /// Allocate `size` bytes (header included), at least 8-byte aligned
    ///
    /// # Errors
    /// `FrcError::OutOfMemory` when no storage is available,
    /// `FrcError::InvalidLayout` for a negative size.
    fn allocate(&mut self, size: i32) -> Result<usize>;

    /// Return the object at `address`, whose header records `capacity`
    ///
    /// Must accept exactly the addresses returned by `allocate`. Has no
    /// failure mode.
    fn free(&mut self, capacity: i32, address: usize);
}

impl<A: RawAllocator + ?Sized> RawAllocator for &mut A {
    fn allocate(&mut self, size: i32) -> Result<usize> {
        (**self).allocate(size)
    }

    fn free(&mut self, capacity: i32, address: usize) {
        (**self).free(capacity, address)
    }
}
