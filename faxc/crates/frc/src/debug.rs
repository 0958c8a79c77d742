//! Debug Validation - Optional checks around retain and release
//!
//! In release builds the lifecycle operations trust their callers
//! completely. With `RcConfig::debug_checks` on, the heap runs every retain
//! and release past a [`DebugValidator`] first, which remembers the
//! addresses it has seen freed and reads the header before the count is
//! touched:
//!
//! | Check | Trap |
//! |---|---|
//! | address already freed | `UseAfterFree` (double release, stale retain) |
//! | refcount `<= 0` on a live address | `DeadObject` (negative transition) |
//! | refcount `== i32::MAX` on retain | `Overflow` |
//! | `pointer_count < 0` at the zero transition | `CorruptHeader` |
//!
//! The freed set is consulted before the header is read, so a second
//! release of a freed object never dereferences freed storage.
//!
//! A trap is not an error the caller can handle: a corrupted heap has no
//! recovery. The heap logs the violation and panics with it.

use crate::object::header;
use rustc_hash::FxHashSet;
use std::fmt;

/// Lifecycle operation that tripped a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Retain,
    Release,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Retain => f.write_str("retain"),
            Operation::Release => f.write_str("release"),
        }
    }
}

/// Heap invariant violation detected in debug mode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Operation on an address whose storage was already returned
    #[error("use after free: {op} of freed object {address:#x}")]
    UseAfterFree { op: Operation, address: usize },

    /// Live address whose count is already zero or negative
    #[error("refcount underflow: {op} of object {address:#x} with refcount {count}")]
    DeadObject {
        op: Operation,
        address: usize,
        count: i32,
    },

    /// Retain would overflow the 32-bit count
    #[error("refcount overflow: retain of object {address:#x} at i32::MAX")]
    Overflow { address: usize },

    /// Header that cannot describe a real object
    #[error("corrupt header: object {address:#x} reports pointer_count {pointer_count}")]
    CorruptHeader { address: usize, pointer_count: i32 },
}

impl Violation {
    /// Address the violation refers to
    pub fn address(&self) -> usize {
        match self {
            Violation::UseAfterFree { address, .. }
            | Violation::DeadObject { address, .. }
            | Violation::Overflow { address }
            | Violation::CorruptHeader { address, .. } => *address,
        }
    }

    /// Whether the object's storage is still owned by the heap
    ///
    /// Only then is it safe to dump the header for diagnostics.
    pub fn storage_readable(&self) -> bool {
        !matches!(self, Violation::UseAfterFree { .. })
    }
}

/// DebugValidator - freed-address ledger plus header checks
#[derive(Debug, Default)]
pub struct DebugValidator {
    freed: FxHashSet<usize>,
}

impl DebugValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a retain of non-null `addr`
    ///
    /// # Safety
    /// If `addr` is not in the freed set it must point to readable header
    /// memory.
    pub unsafe fn check_retain(&self, addr: usize) -> Result<(), Violation> {
        if self.freed.contains(&addr) {
            return Err(Violation::UseAfterFree {
                op: Operation::Retain,
                address: addr,
            });
        }

        let count = header::read_refcount(addr);
        if count <= 0 {
            return Err(Violation::DeadObject {
                op: Operation::Retain,
                address: addr,
                count,
            });
        }
        if count == i32::MAX {
            return Err(Violation::Overflow { address: addr });
        }

        Ok(())
    }

    /// Check a release of non-null `addr`
    ///
    /// # Safety
    /// Same as [`DebugValidator::check_retain`].
    pub unsafe fn check_release(&self, addr: usize) -> Result<(), Violation> {
        if self.freed.contains(&addr) {
            return Err(Violation::UseAfterFree {
                op: Operation::Release,
                address: addr,
            });
        }

        let count = header::read_refcount(addr);
        if count <= 0 {
            return Err(Violation::DeadObject {
                op: Operation::Release,
                address: addr,
                count,
            });
        }

        Ok(())
    }

    /// Check the pointer count read at the zero transition
    pub fn check_pointer_count(&self, addr: usize, pointer_count: i32) -> Result<(), Violation> {
        if pointer_count < 0 {
            return Err(Violation::CorruptHeader {
                address: addr,
                pointer_count,
            });
        }
        Ok(())
    }

    /// Record that `addr` was returned to the allocator
    pub fn mark_freed(&mut self, addr: usize) {
        self.freed.insert(addr);
    }

    /// Record that the allocator handed `addr` out again
    pub fn mark_allocated(&mut self, addr: usize) {
        self.freed.remove(&addr);
    }

    /// Check whether `addr` is known to be freed
    pub fn is_freed(&self, addr: usize) -> bool {
        self.freed.contains(&addr)
    }

    /// Number of freed addresses being remembered
    pub fn freed_count(&self) -> usize {
        self.freed.len()
    }
}
