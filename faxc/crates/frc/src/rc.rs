//! Reference Counting - Retain and Release
//!
//! The two operations that govern object lifetime:
//!
//! - `retain(ref)`: null is a no-op, otherwise refcount += 1
//! - `release(ref)`: null is a no-op, otherwise refcount -= 1; when the count
//!   reaches zero every owned pointer is released (slot order, depth-first)
//!   and then the storage goes back to the allocator via
//!   `free(capacity, ref)`
//!
//! ## Cascade
//!
//! The zero transition is driven by an explicit work-list instead of native
//! recursion, so a long chain of objects costs heap, not stack:
//!
//! ```text
//! release(X) with X = [Y, Z], Y = [W]
//!
//!   work-list (top on the right)        action
//!   [Free X, Rel Z, Rel Y]              X hits zero, schedule children
//!   [Free X, Rel Z, Free Y, Rel W]      Y hits zero
//!   [Free X, Rel Z, Free Y, Free W]     W hits zero (no children)
//!   [Free X, Rel Z, Free Y]             free W
//!   [Free X, Rel Z]                     free Y
//!   [Free X]                            Z stays alive at refcount n-1
//!   []                                  free X
//! ```
//!
//! The `Free` marker sits beneath its children, so the order of releases and
//! frees is exactly the order native recursion would produce, and a parent's
//! storage is always intact while its slots are still pending.
//!
//! Nothing here validates anything. Hooks for validation, statistics and
//! logging are threaded through a [`LifecycleObserver`]; the plain
//! [`retain`] / [`release`] entry points use a no-op observer that compiles
//! away.

use crate::allocator::RawAllocator;
use crate::object::header::{self, HEADER_SIZE};

/// Hooks invoked at each step of retain and release
///
/// All methods default to doing nothing.
pub trait LifecycleObserver {
    /// Every `retain` call, null included, before the count changes
    fn on_retain(&mut self, _addr: usize) {}

    /// Every `release` call, null included and cascaded calls included,
    /// before the count is read
    fn on_release(&mut self, _addr: usize) {}

    /// An object's count reached zero; its slots are about to be scheduled
    fn on_zero(&mut self, _addr: usize, _pointer_count: i32) {}

    /// An object's storage is about to be returned to the allocator
    fn on_free(&mut self, _addr: usize, _capacity: i32) {}

    /// A zero transition finished cascading
    fn on_cascade_end(&mut self, _root: usize, _report: &CascadeReport) {}
}

/// Observer that ignores every hook
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

/// Outcome of a release that reached zero
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    /// Objects whose storage was returned
    pub freed_objects: usize,
    /// Bytes returned, headers included
    pub freed_bytes: usize,
    /// Largest work-list length seen while cascading
    pub peak_depth: usize,
}

impl CascadeReport {
    /// True when the release did not free anything
    pub fn is_empty(&self) -> bool {
        self.freed_objects == 0
    }
}

enum Work {
    Release(usize),
    Free { addr: usize, capacity: i32 },
}

/// Increment the refcount of `addr`
///
/// # Safety
/// `addr` must be null or a live object.
#[inline]
pub unsafe fn retain(addr: usize) {
    retain_observed(addr, &mut NoopObserver)
}

/// [`retain`] with hooks
///
/// # Safety
/// Same as [`retain`].
#[inline]
pub unsafe fn retain_observed<O: LifecycleObserver>(addr: usize, observer: &mut O) {
    observer.on_retain(addr);
    if addr == 0 {
        return;
    }

    let count = header::read_refcount(addr);
    header::write_refcount(addr, count.wrapping_add(1));
}

/// Decrement the refcount of `addr`, freeing it and cascading on zero
///
/// # Safety
/// `addr` must be null or a live object whose owned slots hold null or live
/// objects, and every object reachable from it must have been allocated by
/// `allocator`.
#[inline]
pub unsafe fn release<A: RawAllocator>(addr: usize, allocator: &mut A) -> CascadeReport {
    release_observed(addr, allocator, &mut NoopObserver)
}

/// [`release`] with hooks
///
/// # Safety
/// Same as [`release`].
#[inline]
pub unsafe fn release_observed<A, O>(
    addr: usize,
    allocator: &mut A,
    observer: &mut O,
) -> CascadeReport
where
    A: RawAllocator,
    O: LifecycleObserver,
{
    observer.on_release(addr);
    if addr == 0 {
        return CascadeReport::default();
    }

    let count = header::read_refcount(addr).wrapping_sub(1);
    if count > 0 {
        header::write_refcount(addr, count);
        return CascadeReport::default();
    }

    cascade(addr, allocator, observer)
}

#[cold]
#[inline(never)]
unsafe fn cascade<A, O>(root: usize, allocator: &mut A, observer: &mut O) -> CascadeReport
where
    A: RawAllocator,
    O: LifecycleObserver,
{
    let mut report = CascadeReport::default();
    let mut work = Vec::new();

    schedule_destroy(root, &mut work, observer);
    report.peak_depth = work.len();

    while let Some(item) = work.pop() {
        match item {
            Work::Release(addr) => {
                observer.on_release(addr);
                if addr == 0 {
                    continue;
                }

                let count = header::read_refcount(addr).wrapping_sub(1);
                if count > 0 {
                    header::write_refcount(addr, count);
                    continue;
                }

                schedule_destroy(addr, &mut work, observer);
                report.peak_depth = report.peak_depth.max(work.len());
            },
            Work::Free { addr, capacity } => {
                observer.on_free(addr, capacity);
                allocator.free(capacity, addr);
                report.freed_objects += 1;
                report.freed_bytes += HEADER_SIZE + capacity.max(0) as usize;
            },
        }
    }

    observer.on_cascade_end(root, &report);
    report
}

/// Push the free marker for `addr`, then its slots so slot 0 pops first
unsafe fn schedule_destroy<O: LifecycleObserver>(addr: usize, work: &mut Vec<Work>, observer: &mut O) {
    let pointer_count = header::read_pointer_count(addr);
    observer.on_zero(addr, pointer_count);

    work.push(Work::Free {
        addr,
        capacity: header::read_capacity(addr),
    });

    let slots = pointer_count.max(0) as usize;
    work.reserve(slots);
    for index in (0..slots).rev() {
        work.push(Work::Release(header::read_pointer(addr, index)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TrackingAllocator;
    use crate::object::header::POINTER_SIZE;

    fn alloc(allocator: &mut TrackingAllocator, pointers: &[usize], data: i32) -> usize {
        let capacity = (pointers.len() * POINTER_SIZE) as i32 + data;
        let addr = allocator
            .allocate(HEADER_SIZE as i32 + capacity)
            .expect("allocation failed");
        unsafe {
            header::init_header(addr, capacity, pointers.len() as i32, 0);
            for (i, &p) in pointers.iter().enumerate() {
                header::write_pointer(addr, i, p);
            }
        }
        addr
    }

    #[derive(Default)]
    struct Recorder {
        releases: Vec<usize>,
        frees: Vec<usize>,
        zeros: Vec<(usize, i32)>,
        cascades: usize,
    }

    impl LifecycleObserver for Recorder {
        fn on_release(&mut self, addr: usize) {
            self.releases.push(addr);
        }

        fn on_zero(&mut self, addr: usize, pointer_count: i32) {
            self.zeros.push((addr, pointer_count));
        }

        fn on_free(&mut self, addr: usize, _capacity: i32) {
            self.frees.push(addr);
        }

        fn on_cascade_end(&mut self, _root: usize, _report: &CascadeReport) {
            self.cascades += 1;
        }
    }

    #[test]
    fn test_null_is_noop() {
        let mut allocator = TrackingAllocator::new();
        unsafe {
            retain(0);
            let report = release(0, &mut allocator);
            assert!(report.is_empty());
        }
        assert_eq!(allocator.total_allocations(), 0);
        assert!(allocator.free_log().is_empty());
    }

    #[test]
    fn test_retain_release_balance() {
        let mut allocator = TrackingAllocator::new();
        let x = alloc(&mut allocator, &[], 8);

        unsafe {
            retain(x);
            retain(x);
            assert_eq!(header::read_refcount(x), 3);

            assert!(release(x, &mut allocator).is_empty());
            assert!(release(x, &mut allocator).is_empty());
            assert_eq!(header::read_refcount(x), 1);

            let report = release(x, &mut allocator);
            assert_eq!(report.freed_objects, 1);
            assert_eq!(report.freed_bytes, HEADER_SIZE + 8);
        }

        allocator.assert_no_leaks("balance");
    }

    #[test]
    fn test_cascade_order_matches_recursion() {
        let mut allocator = TrackingAllocator::new();
        let w = alloc(&mut allocator, &[], 0);
        let z = alloc(&mut allocator, &[], 0);
        let y = alloc(&mut allocator, &[w], 0);
        let x = alloc(&mut allocator, &[y, 0, z], 0);

        let mut recorder = Recorder::default();
        let report = unsafe { release_observed(x, &mut allocator, &mut recorder) };

        assert_eq!(recorder.releases, vec![x, y, w, 0, z]);
        assert_eq!(recorder.frees, vec![w, y, z, x]);
        assert_eq!(recorder.zeros, vec![(x, 3), (y, 1), (w, 0), (z, 0)]);
        assert_eq!(recorder.cascades, 1);
        assert_eq!(allocator.freed_addresses(), vec![w, y, z, x]);
        assert_eq!(report.freed_objects, 4);
        allocator.assert_no_leaks("cascade order");
    }

    #[test]
    fn test_shared_child_survives() {
        let mut allocator = TrackingAllocator::new();
        let y = alloc(&mut allocator, &[], 4);
        let x = alloc(&mut allocator, &[y], 0);

        unsafe {
            retain(y);
            release(x, &mut allocator);
            assert_eq!(header::read_refcount(y), 1);
            assert!(allocator.is_live(y));
            assert!(!allocator.is_live(x));

            release(y, &mut allocator);
        }
        allocator.assert_no_leaks("shared child");
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut allocator = TrackingAllocator::new();
        let mut head = 0;
        for _ in 0..200_000 {
            head = alloc(&mut allocator, &[head], 0);
        }

        let report = unsafe { release(head, &mut allocator) };
        assert_eq!(report.freed_objects, 200_000);
        // One pending free per ancestor plus the next release.
        assert_eq!(report.peak_depth, 200_001);
        allocator.assert_no_leaks("deep chain");
    }
}
