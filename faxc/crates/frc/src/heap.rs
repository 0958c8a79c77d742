//! RcHeap - Main Entry Point
//!
//! Owns the allocator and everything that surrounds the lifecycle
//! operations: debug validation, statistics and the event logger. Generated
//! code talks to an `RcHeap` (directly, or through the C ABI in
//! `faxc-runtime`).
//!
//! ## Example
//!
//! ```rust
//! use frc::{RcConfig, RcHeap, SystemAllocator};
//!
//! let mut heap = RcHeap::new(RcConfig::default(), SystemAllocator).unwrap();
//!
//! let child = heap.alloc_object(8, 0).unwrap();
//! let parent = heap.alloc_object(8, 1).unwrap();
//!
//! unsafe {
//!     // The slot takes over the constructor's reference to `child`.
//!     frc::object::header::write_pointer(parent, 0, child);
//!
//!     heap.retain(parent);
//!     heap.release(parent);
//!     heap.release(parent); // frees parent, then child
//! }
//!
//! assert_eq!(heap.stats().live_objects(), 0);
//! ```

use crate::allocator::{RawAllocator, SystemAllocator};
use crate::config::RcConfig;
use crate::debug::{DebugValidator, Violation};
use crate::error::{FrcError, Result};
use crate::logging::{LogLevel, RcEvent, RcLogger, RcLoggerConfig};
use crate::object::header::{self, ObjectHeader, HEADER_SIZE, POINTER_SIZE};
use crate::rc::{self, CascadeReport, LifecycleObserver};
use crate::stats::RcStats;
use crate::util::debug::{dump_object, format_address};

/// Byte written over payloads before they are freed
pub const POISON_BYTE: u8 = 0xDD;

/// RcHeap - reference-counted object heap
///
/// Every mutating operation takes `&mut self`: the heap is single-threaded.
pub struct RcHeap<A: RawAllocator = SystemAllocator> {
    config: RcConfig,
    allocator: A,
    validator: Option<DebugValidator>,
    stats: RcStats,
    logger: RcLogger,
}

impl<A: RawAllocator> RcHeap<A> {
    /// Create a heap over `allocator`
    ///
    /// # Errors
    /// `FrcError::Configuration` if the configuration does not validate.
    pub fn new(config: RcConfig, allocator: A) -> Result<Self> {
        config.validate()?;

        let logger = RcLogger::new(RcLoggerConfig {
            level: config.log_level,
            console: config.verbose,
            json: config.json_logs,
            timestamps: true,
            max_events: config.max_events,
        });

        let validator = config.debug_checks.then(DebugValidator::new);

        log::debug!(
            "rc heap created (debug_checks={}, poison_on_free={}, max_capacity={})",
            config.debug_checks,
            config.poison_on_free,
            config.max_capacity
        );

        Ok(Self {
            config,
            allocator,
            validator,
            stats: RcStats::new(),
            logger,
        })
    }

    /// Construct an object with `refcount = 1`, null pointer slots and
    /// `reserved = 0`
    ///
    /// The caller owns the returned reference.
    ///
    /// # Errors
    /// - `FrcError::InvalidLayout` for a negative capacity or pointer count,
    ///   a pointer region larger than `capacity`, or a capacity above
    ///   `max_capacity`
    /// - `FrcError::OutOfMemory` if the allocator has no storage
    pub fn alloc_object(&mut self, capacity: i32, pointer_count: i32) -> Result<usize> {
        self.check_layout(capacity, pointer_count)?;

        let layout = ObjectHeader::new(capacity, pointer_count);
        let addr = self.allocator.allocate(HEADER_SIZE as i32 + capacity)?;

        unsafe {
            layout.write(addr);
            for index in 0..pointer_count as usize {
                header::write_pointer(addr, index, 0);
            }
        }

        if let Some(validator) = self.validator.as_mut() {
            validator.mark_allocated(addr);
        }
        if self.config.stats_enabled {
            self.stats.record_allocation(layout.total_size());
        }
        if self.logger.wants(LogLevel::Trace) {
            self.logger.log(RcEvent::Allocate {
                address: addr,
                capacity,
                pointer_count,
            });
        }

        Ok(addr)
    }

    fn check_layout(&self, capacity: i32, pointer_count: i32) -> Result<()> {
        if capacity < 0 || pointer_count < 0 {
            return Err(FrcError::InvalidLayout(format!(
                "negative capacity ({}) or pointer count ({})",
                capacity, pointer_count
            )));
        }

        if capacity > self.config.max_capacity {
            return Err(FrcError::InvalidLayout(format!(
                "capacity {} exceeds max_capacity {}",
                capacity, self.config.max_capacity
            )));
        }

        let pointer_bytes = pointer_count as usize * POINTER_SIZE;
        if pointer_bytes > capacity as usize {
            return Err(FrcError::InvalidLayout(format!(
                "{} pointers need {} bytes, capacity is {}",
                pointer_count, pointer_bytes, capacity
            )));
        }

        Ok(())
    }

    /// Take an additional reference to `addr`
    ///
    /// # Safety
    /// `addr` must be null or an object allocated by this heap. With debug
    /// checks on, a freed address traps instead.
    pub unsafe fn retain(&mut self, addr: usize) {
        let (mut observer, _) = self.split();
        rc::retain_observed(addr, &mut observer);
    }

    /// Drop a reference to `addr`, freeing it and everything it solely owns
    /// when the count reaches zero
    ///
    /// # Safety
    /// `addr` must be null or a live object allocated by this heap, and the
    /// caller must own the reference being dropped.
    pub unsafe fn release(&mut self, addr: usize) -> CascadeReport {
        let (mut observer, allocator) = self.split();
        rc::release_observed(addr, allocator, &mut observer)
    }

    fn split(&mut self) -> (HeapObserver<'_>, &mut A) {
        let observer = HeapObserver {
            validator: self.validator.as_mut(),
            stats: self.config.stats_enabled.then_some(&self.stats),
            logger: &self.logger,
            poison: self.config.poison_on_free,
        };
        (observer, &mut self.allocator)
    }

    /// Current refcount of `addr` (0 for null)
    ///
    /// # Safety
    /// `addr` must be null or a live object.
    pub unsafe fn refcount(&self, addr: usize) -> i32 {
        if addr == 0 {
            return 0;
        }
        header::read_refcount(addr)
    }

    /// Check whether `addr` was freed and not reused
    ///
    /// Always false with debug checks off.
    pub fn is_freed(&self, addr: usize) -> bool {
        self.validator
            .as_ref()
            .is_some_and(|validator| validator.is_freed(addr))
    }

    /// Store `value` into slot `index` of `owner`, releasing the old value
    ///
    /// `value` is retained; the caller keeps its own reference. The new value
    /// is retained before the old one is released, so storing an object into
    /// the slot that already holds it is safe.
    ///
    /// # Errors
    /// - `FrcError::InvalidPointer` if `owner` is null
    /// - `FrcError::BoundsCheckFailed` if `index >= pointer_count`
    ///
    /// # Safety
    /// `owner` must be null or a live object of this heap, `value` null or
    /// live.
    pub unsafe fn replace_slot(&mut self, owner: usize, index: usize, value: usize) -> Result<()> {
        check_slot(owner, index)?;

        self.retain(value);
        let old = header::read_pointer(owner, index);
        header::write_pointer(owner, index, value);
        self.release(old);
        Ok(())
    }

    /// Move the reference out of slot `index` of `owner`, leaving null
    ///
    /// The caller owns the returned reference.
    ///
    /// # Errors
    /// Same as [`RcHeap::replace_slot`].
    ///
    /// # Safety
    /// `owner` must be null or a live object of this heap.
    pub unsafe fn take_slot(&mut self, owner: usize, index: usize) -> Result<usize> {
        check_slot(owner, index)?;

        let old = header::read_pointer(owner, index);
        header::write_pointer(owner, index, 0);
        Ok(old)
    }

    /// Log a heap statistics snapshot
    pub fn report_stats(&self) {
        let summary = self.stats.summary();
        log::info!(
            "rc heap: {} live objects ({} bytes), {} allocations, {} frees",
            summary.live_objects,
            summary.live_bytes,
            summary.allocations,
            summary.frees
        );
        self.logger.log(RcEvent::HeapStats {
            live_objects: summary.live_objects,
            live_bytes: summary.live_bytes,
            allocations: summary.allocations,
            frees: summary.frees,
        });
    }

    /// Heap statistics
    pub fn stats(&self) -> &RcStats {
        &self.stats
    }

    /// Heap event logger
    pub fn logger(&self) -> &RcLogger {
        &self.logger
    }

    /// Heap configuration
    pub fn config(&self) -> &RcConfig {
        &self.config
    }

    /// Borrow the allocator
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Mutably borrow the allocator
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Consume the heap, returning its allocator
    ///
    /// Objects still alive are not freed.
    pub fn into_allocator(self) -> A {
        self.allocator
    }
}

unsafe fn check_slot(owner: usize, index: usize) -> Result<()> {
    if owner == 0 {
        return Err(FrcError::InvalidPointer { address: owner });
    }

    let length = header::read_pointer_count(owner).max(0) as usize;
    if index >= length {
        return Err(FrcError::BoundsCheckFailed { index, length });
    }
    Ok(())
}

/// Heap-side hooks: validation, poisoning, stats, events
///
/// Borrows disjoint fields of the heap so the allocator can be lent to the
/// cascade at the same time.
struct HeapObserver<'h> {
    validator: Option<&'h mut DebugValidator>,
    stats: Option<&'h RcStats>,
    logger: &'h RcLogger,
    poison: bool,
}

impl LifecycleObserver for HeapObserver<'_> {
    fn on_retain(&mut self, addr: usize) {
        if let Some(stats) = self.stats {
            stats.record_retain();
        }
        if addr == 0 {
            return;
        }
        if let Some(validator) = self.validator.as_deref() {
            if let Err(violation) = unsafe { validator.check_retain(addr) } {
                trap(self.logger, violation);
            }
        }
    }

    fn on_release(&mut self, addr: usize) {
        if let Some(stats) = self.stats {
            stats.record_release();
        }
        if addr == 0 {
            return;
        }
        if let Some(validator) = self.validator.as_deref() {
            if let Err(violation) = unsafe { validator.check_release(addr) } {
                trap(self.logger, violation);
            }
        }
    }

    fn on_zero(&mut self, addr: usize, pointer_count: i32) {
        if let Some(validator) = self.validator.as_deref() {
            if let Err(violation) = validator.check_pointer_count(addr, pointer_count) {
                trap(self.logger, violation);
            }
        }
    }

    fn on_free(&mut self, addr: usize, capacity: i32) {
        let capacity_bytes = capacity.max(0) as usize;

        if self.poison {
            unsafe {
                std::ptr::write_bytes(
                    header::payload_start(addr) as *mut u8,
                    POISON_BYTE,
                    capacity_bytes,
                );
            }
        }
        if let Some(validator) = self.validator.as_deref_mut() {
            validator.mark_freed(addr);
        }
        if let Some(stats) = self.stats {
            stats.record_free(HEADER_SIZE + capacity_bytes);
        }
        if self.logger.wants(LogLevel::Debug) {
            self.logger.log(RcEvent::Free {
                address: addr,
                capacity,
            });
        }
    }

    fn on_cascade_end(&mut self, root: usize, report: &CascadeReport) {
        if let Some(stats) = self.stats {
            stats.record_cascade(report.peak_depth);
        }

        log::debug!(
            "release of {} freed {} objects ({} bytes)",
            format_address(root),
            report.freed_objects,
            report.freed_bytes
        );
        self.logger.log(RcEvent::Cascade {
            root,
            freed_objects: report.freed_objects,
            freed_bytes: report.freed_bytes,
            peak_depth: report.peak_depth,
        });
    }
}

/// Report a heap invariant violation and abort the operation
#[cold]
#[inline(never)]
fn trap(logger: &RcLogger, violation: Violation) -> ! {
    let address = violation.address();

    log::error!("heap invariant violated: {}", violation);
    if violation.storage_readable() {
        log::error!("{}", unsafe { dump_object(address, 64) });
    }
    logger.log(RcEvent::Violation {
        address,
        message: violation.to_string(),
    });

    panic!("frc: heap invariant violated: {}", violation);
}
