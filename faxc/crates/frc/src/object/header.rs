//! Object Header - Metadata prepended to every reference-counted object
//!
//! Object Header Layout (16 bytes, all fields little-endian i32 on the
//! supported targets):
//! ┌─────────────────────────────────────────┐
//! │  offset 0   refcount      (i32)         │  <- live strong references
//! ├─────────────────────────────────────────┤
//! │  offset 4   capacity      (i32)         │  <- payload bytes, header excluded
//! ├─────────────────────────────────────────┤
//! │  offset 8   pointer_count (i32)         │  <- owned pointers at payload start
//! ├─────────────────────────────────────────┤
//! │  offset 12  reserved      (i32)         │  <- producer-defined, never read here
//! ├─────────────────────────────────────────┤
//! │  offset 16  payload                     │
//! │    [ptr 0][ptr 1]..[ptr n-1][raw data]  │
//! └─────────────────────────────────────────┘
//!
//! The layout is bit-exact so objects built by generated code and objects
//! built through [`crate::RcHeap`] are interchangeable.
//!
//! The accessors here are a trusted layer: they never check bounds or
//! liveness. Callers must respect `pointer_count` and only touch live objects.

use static_assertions::const_assert_eq;

/// Size of object header in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of one owned-pointer slot in the payload
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Field offsets from the object base
pub const REFCOUNT_OFFSET: usize = 0;
pub const CAPACITY_OFFSET: usize = 4;
pub const POINTER_COUNT_OFFSET: usize = 8;
pub const RESERVED_OFFSET: usize = 12;

/// Object Header
///
/// In-memory mirror of the layout above. The free functions in this module
/// operate on raw addresses and are what the lifecycle code uses; the struct
/// exists for constructors and for taking header snapshots.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Live strong-reference count
    pub refcount: i32,
    /// Payload size in bytes (excluding header)
    pub capacity: i32,
    /// Owned pointers at the start of the payload
    pub pointer_count: i32,
    /// Type-specific slot
    pub reserved: i32,
}

const_assert_eq!(std::mem::size_of::<ObjectHeader>(), HEADER_SIZE);

impl ObjectHeader {
    /// Create header for a freshly constructed object (refcount 1)
    pub fn new(capacity: i32, pointer_count: i32) -> Self {
        Self {
            refcount: 1,
            capacity,
            pointer_count,
            reserved: 0,
        }
    }

    /// Bytes occupied by the owned-pointer region
    #[inline]
    pub fn pointer_bytes(&self) -> usize {
        self.pointer_count.max(0) as usize * POINTER_SIZE
    }

    /// Bytes of raw data after the pointer region
    #[inline]
    pub fn data_bytes(&self) -> usize {
        (self.capacity.max(0) as usize).saturating_sub(self.pointer_bytes())
    }

    /// Total object size including header
    #[inline]
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.capacity.max(0) as usize
    }

    /// Snapshot the header of the object at `addr`
    ///
    /// # Safety
    /// `addr` must point to a live object.
    #[inline]
    pub unsafe fn read(addr: usize) -> Self {
        std::ptr::read(addr as *const ObjectHeader)
    }

    /// Write this header to `addr`
    ///
    /// # Safety
    /// `addr` must point to at least `HEADER_SIZE` writable, 4-byte aligned bytes.
    #[inline]
    pub unsafe fn write(self, addr: usize) {
        std::ptr::write(addr as *mut ObjectHeader, self)
    }
}

#[inline]
unsafe fn field(addr: usize, offset: usize) -> *mut i32 {
    (addr + offset) as *mut i32
}

// === Refcount ===

/// Read the refcount
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn read_refcount(addr: usize) -> i32 {
    field(addr, REFCOUNT_OFFSET).read()
}

/// Write the refcount
///
/// # Safety
/// `addr` must point to a live object. Only the lifecycle operations and
/// constructors may call this.
#[inline]
pub unsafe fn write_refcount(addr: usize, value: i32) {
    field(addr, REFCOUNT_OFFSET).write(value)
}

// === Immutable fields ===

/// Read the payload capacity in bytes
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn read_capacity(addr: usize) -> i32 {
    field(addr, CAPACITY_OFFSET).read()
}

/// Read the number of owned pointers
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn read_pointer_count(addr: usize) -> i32 {
    field(addr, POINTER_COUNT_OFFSET).read()
}

// === Reserved slot ===

/// Read the producer-defined reserved field
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn read_reserved(addr: usize) -> i32 {
    field(addr, RESERVED_OFFSET).read()
}

/// Write the producer-defined reserved field
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn write_reserved(addr: usize, value: i32) {
    field(addr, RESERVED_OFFSET).write(value)
}

// === Payload ===

/// Get payload start (after header)
///
/// # Safety
/// `addr` must point to an object.
#[inline]
pub unsafe fn payload_start(addr: usize) -> usize {
    addr + HEADER_SIZE
}

/// Address of owned-pointer slot `index`
///
/// # Safety
/// `addr` must point to a live object and `index < pointer_count`.
#[inline]
pub unsafe fn pointer_slot(addr: usize, index: usize) -> *mut usize {
    (payload_start(addr) + index * POINTER_SIZE) as *mut usize
}

/// Read owned-pointer slot `index`
///
/// # Safety
/// Same as [`pointer_slot`].
#[inline]
pub unsafe fn read_pointer(addr: usize, index: usize) -> usize {
    pointer_slot(addr, index).read()
}

/// Overwrite owned-pointer slot `index` without touching refcounts
///
/// # Safety
/// Same as [`pointer_slot`]; the caller takes over the ownership bookkeeping.
#[inline]
pub unsafe fn write_pointer(addr: usize, index: usize, value: usize) {
    pointer_slot(addr, index).write(value)
}

/// First byte of raw data after the pointer region
///
/// # Safety
/// `addr` must point to a live object.
#[inline]
pub unsafe fn data_start(addr: usize) -> usize {
    payload_start(addr) + read_pointer_count(addr).max(0) as usize * POINTER_SIZE
}

/// Initialize a new object's header: refcount 1 plus the immutable fields
///
/// Does not touch the payload; constructors must null the pointer region.
///
/// # Safety
/// `addr` must point to at least `HEADER_SIZE` writable, aligned bytes that
/// are not yet visible as an object anywhere.
#[inline]
pub unsafe fn init_header(addr: usize, capacity: i32, pointer_count: i32, reserved: i32) {
    ObjectHeader {
        refcount: 1,
        capacity,
        pointer_count,
        reserved,
    }
    .write(addr)
}
