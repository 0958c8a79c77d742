//! # FRC - Reference-Counted Heap for Fax
//!
//! FRC manages the lifetime of heap objects produced by compiled Fax code
//! with manual reference counting. Every object carries a fixed 16-byte
//! header; generated code calls `retain` when it copies a reference and
//! `release` when a reference goes out of scope. The release that takes the
//! count to zero releases everything the object owns and hands its storage
//! back to the allocator.
//!
//! ## Quick Start
//!
//! ```rust
//! use frc::{RcConfig, RcHeap, SystemAllocator};
//!
//! fn main() -> Result<(), frc::FrcError> {
//!     let mut heap = RcHeap::new(RcConfig::default(), SystemAllocator)?;
//!
//!     let name = frc::object::new_string(&mut heap, "fax")?;
//!     let list = frc::object::new_list(&mut heap, 4)?;
//!
//!     unsafe {
//!         // The list takes over our reference to `name`.
//!         frc::object::list_push(list, name)?;
//!
//!         // Frees the list and the string it owns.
//!         heap.release(list);
//!     }
//!
//!     assert_eq!(heap.stats().live_objects(), 0);
//!     Ok(())
//! }
//! ```
//!
//! ## Object Layout
//!
//! ```text
//! ┌──────────┬──────────┬───────────────┬──────────┬─────────────────────────────┐
//! │ refcount │ capacity │ pointer_count │ reserved │ payload                     │
//! │ i32 @0   │ i32 @4   │ i32 @8        │ i32 @12  │ @16: pointers, then data    │
//! └──────────┴──────────┴───────────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! `capacity` and `pointer_count` are written once at construction. Only
//! `refcount` changes afterwards. `reserved` belongs to the object's type
//! (string length, list length) and is never read by `retain` / `release`.
//!
//! ## Safety
//!
//! References are raw addresses (`usize`, `0` is null). The lifecycle
//! operations trust their callers:
//!
//! 1. **Balance**: every reference is released exactly once
//! 2. **Ownership**: an owned slot holds null or a live object, and the owner
//!    holds one count on it
//! 3. **Construction**: objects come from [`RcHeap::alloc_object`] or the
//!    typed constructors, never from hand-written headers
//!
//! Enable `RcConfig::debug_checks` to turn use-after-free, double release
//! and count underflow into immediate panics instead of heap corruption.
//!
//! ## Modules
//!
//! - [`allocator`]: Storage seam and the system/tracking allocators
//! - [`config`]: Heap configuration and validation
//! - [`debug`]: Debug-mode validation
//! - [`error`]: Error types
//! - [`heap`]: The `RcHeap` facade
//! - [`logging`]: Heap event log
//! - [`object`]: Header codec, strings, lists
//! - [`rc`]: Retain, release and the release cascade
//! - [`stats`]: Counters and metrics export
//! - [`util`]: Alignment and formatting helpers

// Core
pub mod config;
pub mod error;
pub mod heap;
pub mod rc;

// Memory layout
pub mod allocator;
pub mod object;

// Validation and monitoring
pub mod debug;
pub mod logging;
pub mod stats;

// Utilities
pub mod util;

pub use allocator::{RawAllocator, SystemAllocator, TrackingAllocator};
pub use config::RcConfig;
pub use error::{FrcError, Result};
pub use heap::RcHeap;
pub use rc::{release, retain, CascadeReport};

/// FRC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a heap over the system allocator with default configuration
pub fn init() -> Result<RcHeap> {
    RcHeap::new(RcConfig::default(), SystemAllocator)
}

/// Create a heap over the system allocator with `config`
///
/// # Examples
///
/// ```rust
/// let config = frc::RcConfig {
///     debug_checks: true,
///     poison_on_free: true,
///     ..Default::default()
/// };
///
/// let heap = frc::init_with_config(config)?;
/// # Ok::<(), frc::FrcError>(())
/// ```
pub fn init_with_config(config: RcConfig) -> Result<RcHeap> {
    RcHeap::new(config, SystemAllocator)
}
