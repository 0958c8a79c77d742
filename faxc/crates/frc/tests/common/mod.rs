//! Test Utilities for the FRC Test Suite
//!
//! Fixtures and STRICT assertion helpers shared by the integration tests.
//! Every heap built here runs over a `TrackingAllocator`, so a double free,
//! a free of an unknown address or a capacity mismatch panics on the spot,
//! and every test can end with a leak check.

#![allow(dead_code)]

use frc::object::header::{self, ObjectHeader, POINTER_SIZE};
use frc::{CascadeReport, RcConfig, RcHeap, TrackingAllocator};

/// Default raw-data bytes for test objects
pub const DEFAULT_DATA_BYTES: i32 = 16;

/// ============================================================================
/// RC FIXTURE
/// ============================================================================

/// Test fixture owning a tracked heap
pub struct RcFixture {
    pub heap: RcHeap<TrackingAllocator>,
}

impl RcFixture {
    /// Fixture with debug checks on
    ///
    /// **Bug this finds:** use-after-free and double release surface as panics
    /// instead of silent corruption
    pub fn with_defaults() -> Self {
        Self::with_config(RcConfig {
            debug_checks: true,
            ..Default::default()
        })
    }

    /// Fixture with debug checks off (release-build behavior)
    pub fn without_debug_checks() -> Self {
        Self::with_config(RcConfig {
            debug_checks: false,
            ..Default::default()
        })
    }

    /// Fixture with a custom configuration
    pub fn with_config(config: RcConfig) -> Self {
        let heap = RcHeap::new(config, TrackingAllocator::new())
            .expect("heap initialization should succeed with valid config");
        Self { heap }
    }

    /// Allocate an object owning `children`, plus `data` raw bytes
    ///
    /// The new object takes over the caller's reference to each child.
    pub fn object(&mut self, children: &[usize], data: i32) -> usize {
        let pointer_count = children.len() as i32;
        let capacity = pointer_count * POINTER_SIZE as i32 + data;

        let addr = self
            .heap
            .alloc_object(capacity, pointer_count)
            .unwrap_or_else(|e| panic!("allocation of {} bytes failed: {:?}", capacity, e));

        for (index, &child) in children.iter().enumerate() {
            unsafe { header::write_pointer(addr, index, child) };
        }
        addr
    }

    /// Allocate an object with no owned pointers
    pub fn leaf(&mut self) -> usize {
        self.object(&[], DEFAULT_DATA_BYTES)
    }

    /// Build a singly linked chain of `len` objects, returning the head
    pub fn chain(&mut self, len: usize) -> usize {
        let mut head = 0;
        for _ in 0..len {
            head = self.object(&[head], 0);
        }
        head
    }

    pub fn retain(&mut self, addr: usize) {
        unsafe { self.heap.retain(addr) }
    }

    pub fn release(&mut self, addr: usize) -> CascadeReport {
        unsafe { self.heap.release(addr) }
    }

    /// Refcount of a live object
    pub fn refcount(&self, addr: usize) -> i32 {
        unsafe { self.heap.refcount(addr) }
    }

    /// Header snapshot of a live object
    pub fn header(&self, addr: usize) -> ObjectHeader {
        unsafe { ObjectHeader::read(addr) }
    }

    /// Addresses freed so far, oldest first
    pub fn free_order(&self) -> Vec<usize> {
        self.heap.allocator().freed_addresses()
    }

    pub fn is_live(&self, addr: usize) -> bool {
        self.heap.allocator().is_live(addr)
    }

    #[track_caller]
    pub fn assert_no_leaks(&self, context: &str) {
        self.heap.allocator().assert_no_leaks(context);
        assert_eq!(
            self.heap.stats().live_objects(),
            0,
            "{}: heap stats report live objects after all references were dropped",
            context
        );
    }
}

/// ============================================================================
/// STRICT ASSERTION HELPERS
/// ============================================================================

/// Assert the refcount of a live object
///
/// **Bug this finds:** missed or doubled increments and decrements
#[track_caller]
pub fn assert_refcount(fixture: &RcFixture, addr: usize, expected: i32, context: &str) {
    let actual = fixture.refcount(addr);
    assert_eq!(
        actual, expected,
        "{}: object {:#x} has refcount {}, expected {}",
        context, addr, actual, expected
    );
}

/// Assert that an object was freed exactly once
///
/// **Bug this finds:** leaks, double frees
#[track_caller]
pub fn assert_freed_once(fixture: &RcFixture, addr: usize, context: &str) {
    assert!(
        !fixture.is_live(addr),
        "{}: object {:#x} is still allocated",
        context,
        addr
    );
    assert_eq!(
        fixture.heap.allocator().free_count(addr),
        1,
        "{}: object {:#x} was not freed exactly once",
        context,
        addr
    );
}

/// Assert that an object is still allocated
///
/// **Bug this finds:** premature free of a shared object
#[track_caller]
pub fn assert_live(fixture: &RcFixture, addr: usize, context: &str) {
    assert!(
        fixture.is_live(addr),
        "{}: object {:#x} was freed while still referenced",
        context,
        addr
    );
}

/// Assert that `child` was freed before `parent`
///
/// **Bug this finds:** parent storage returned while its slots were pending
#[track_caller]
pub fn assert_freed_before(order: &[usize], child: usize, parent: usize, context: &str) {
    let position = |addr: usize| {
        order
            .iter()
            .position(|&a| a == addr)
            .unwrap_or_else(|| panic!("{}: {:#x} was never freed", context, addr))
    };

    assert!(
        position(child) < position(parent),
        "{}: child {:#x} freed after parent {:#x}",
        context,
        child,
        parent
    );
}

/// Assert that everything but the refcount is unchanged
///
/// **Bug this finds:** retain/release writing outside the refcount field
#[track_caller]
pub fn assert_layout_unchanged(before: &ObjectHeader, after: &ObjectHeader, context: &str) {
    assert_eq!(before.capacity, after.capacity, "{}: capacity changed", context);
    assert_eq!(
        before.pointer_count, after.pointer_count,
        "{}: pointer_count changed",
        context
    );
    assert_eq!(before.reserved, after.reserved, "{}: reserved changed", context);
}
