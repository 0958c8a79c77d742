//! Tracking Allocator
//!
//! Wraps another allocator and keeps a ledger of every object it hands out.
//! Catches the failures the lifecycle code must never produce:
//!
//! - DOUBLE-FREE: the same address returned twice
//! - FREE-OF-UNALLOCATED: an address that never came from `allocate`
//! - CAPACITY MISMATCH: `free` told a different size than was allocated
//! - LEAKS: allocations never returned
//!
//! The free log preserves order, so tests can check that a cascade frees
//! children before their parent.

use super::{RawAllocator, SystemAllocator};
use crate::error::Result;
use crate::object::header::HEADER_SIZE;
use rustc_hash::{FxHashMap, FxHashSet};

/// One call to `free`, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRecord {
    pub address: usize,
    pub capacity: i32,
}

/// TrackingAllocator - ledger-keeping allocator wrapper
#[derive(Debug, Default)]
pub struct TrackingAllocator<A: RawAllocator = SystemAllocator> {
    inner: A,
    /// Live allocations: address -> requested size
    live: FxHashMap<usize, i32>,
    /// Addresses freed and not handed out again since
    retired: FxHashSet<usize>,
    /// Every free, in order
    free_log: Vec<FreeRecord>,
    total_allocations: u64,
    total_bytes: u64,
}

impl TrackingAllocator<SystemAllocator> {
    /// Tracking allocator over the system allocator
    pub fn new() -> Self {
        Self::wrap(SystemAllocator)
    }
}

impl<A: RawAllocator> TrackingAllocator<A> {
    /// Track allocations made through `inner`
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            live: FxHashMap::default(),
            retired: FxHashSet::default(),
            free_log: Vec::new(),
            total_allocations: 0,
            total_bytes: 0,
        }
    }

    /// Number of allocations not yet freed
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Bytes held by allocations not yet freed
    pub fn live_bytes(&self) -> u64 {
        self.live.values().map(|&size| size as u64).sum()
    }

    /// Check whether `address` is currently allocated
    pub fn is_live(&self, address: usize) -> bool {
        self.live.contains_key(&address)
    }

    /// Every free so far, oldest first
    pub fn free_log(&self) -> &[FreeRecord] {
        &self.free_log
    }

    /// Addresses freed so far, oldest first
    pub fn freed_addresses(&self) -> Vec<usize> {
        self.free_log.iter().map(|r| r.address).collect()
    }

    /// Number of times `address` appears in the free log
    pub fn free_count(&self, address: usize) -> usize {
        self.free_log.iter().filter(|r| r.address == address).count()
    }

    /// Total allocations ever made
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations
    }

    /// Total bytes ever allocated
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Forget the free log (the live ledger is kept)
    pub fn clear_free_log(&mut self) {
        self.free_log.clear();
    }

    /// Panic if any allocation is still live
    #[track_caller]
    pub fn assert_no_leaks(&self, context: &str) {
        let mut leaked: Vec<_> = self.live.keys().copied().collect();
        leaked.sort_unstable();

        assert!(
            leaked.is_empty(),
            "{}: Memory leak detected - {} addresses allocated but not freed: {:#x?}",
            context,
            leaked.len(),
            leaked.iter().take(10).collect::<Vec<_>>()
        );
    }

    /// Borrow the wrapped allocator
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: RawAllocator> RawAllocator for TrackingAllocator<A> {
    fn allocate(&mut self, size: i32) -> Result<usize> {
        let address = self.inner.allocate(size)?;

        if let Some(previous) = self.live.insert(address, size) {
            panic!(
                "DOUBLE-ALLOC detected: Address {:#x} already allocated ({} bytes)",
                address, previous
            );
        }

        self.retired.remove(&address);
        self.total_allocations += 1;
        self.total_bytes += size.max(0) as u64;
        Ok(address)
    }

    fn free(&mut self, capacity: i32, address: usize) {
        let Some(size) = self.live.remove(&address) else {
            if self.retired.contains(&address) {
                panic!("DOUBLE-FREE detected: Address {:#x} already freed", address);
            }
            panic!(
                "FREE-OF-UNALLOCATED detected: Address {:#x} was never allocated",
                address
            );
        };

        let expected = (size.max(0) as usize).saturating_sub(HEADER_SIZE);
        assert_eq!(
            capacity.max(0) as usize,
            expected,
            "CAPACITY MISMATCH: Address {:#x} allocated with {} payload bytes, freed with {}",
            address,
            expected,
            capacity
        );

        self.retired.insert(address);
        self.free_log.push(FreeRecord { address, capacity });
        self.inner.free(capacity, address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger() {
        let mut allocator = TrackingAllocator::new();

        let a = allocator.allocate(HEADER_SIZE as i32 + 8).unwrap();
        let b = allocator.allocate(HEADER_SIZE as i32 + 16).unwrap();
        assert_eq!(allocator.live_count(), 2);
        assert_eq!(allocator.live_bytes(), (2 * HEADER_SIZE + 24) as u64);
        assert!(allocator.is_live(a));

        allocator.free(16, b);
        allocator.free(8, a);
        assert_eq!(allocator.live_count(), 0);
        assert_eq!(allocator.freed_addresses(), vec![b, a]);
        assert_eq!(allocator.free_count(a), 1);
        assert_eq!(allocator.total_allocations(), 2);
        allocator.assert_no_leaks("ledger");
    }

    #[test]
    #[should_panic(expected = "DOUBLE-FREE")]
    fn test_double_free_detected() {
        let mut allocator = TrackingAllocator::new();
        let a = allocator.allocate(HEADER_SIZE as i32).unwrap();
        allocator.free(0, a);
        allocator.free(0, a);
    }

    #[test]
    #[should_panic(expected = "FREE-OF-UNALLOCATED")]
    fn test_unknown_free_detected() {
        let mut allocator = TrackingAllocator::new();
        allocator.free(0, 0x1000);
    }

    #[test]
    #[should_panic(expected = "CAPACITY MISMATCH")]
    fn test_capacity_mismatch_detected() {
        let mut allocator = TrackingAllocator::new();
        let a = allocator.allocate(HEADER_SIZE as i32 + 32).unwrap();
        allocator.free(8, a);
    }

    #[test]
    #[should_panic(expected = "Memory leak detected")]
    fn test_leak_detected() {
        let mut allocator = TrackingAllocator::new();
        let _ = allocator.allocate(HEADER_SIZE as i32).unwrap();
        allocator.assert_no_leaks("leak");
    }
}
