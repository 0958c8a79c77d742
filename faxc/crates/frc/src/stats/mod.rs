//! Stats Module - Heap Activity Counters
//!
//! Counts what the heap does so leaks, churn and cascade sizes can be
//! inspected:
//! - Allocations and bytes allocated
//! - Retain and release calls (null and cascaded calls included)
//! - Frees, bytes freed, cascades, peak work-list depth
//!
//! The heap is single-threaded, so the counters are plain cells.

pub mod metrics;

pub use metrics::{MetricValue, RcMetrics};

use serde::Serialize;
use std::cell::Cell;

/// RcStats - counters for one heap
#[derive(Debug, Default)]
pub struct RcStats {
    allocations: Cell<u64>,
    bytes_allocated: Cell<u64>,
    retain_calls: Cell<u64>,
    release_calls: Cell<u64>,
    frees: Cell<u64>,
    bytes_freed: Cell<u64>,
    cascades: Cell<u64>,
    peak_work_list: Cell<u64>,
}

#[inline]
fn bump(cell: &Cell<u64>, by: u64) {
    cell.set(cell.get() + by);
}

impl RcStats {
    /// Create new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an object construction of `bytes` (header included)
    pub fn record_allocation(&self, bytes: usize) {
        bump(&self.allocations, 1);
        bump(&self.bytes_allocated, bytes as u64);
    }

    /// Record a retain call
    #[inline]
    pub fn record_retain(&self) {
        bump(&self.retain_calls, 1);
    }

    /// Record a release call
    #[inline]
    pub fn record_release(&self) {
        bump(&self.release_calls, 1);
    }

    /// Record storage of `bytes` (header included) returned to the allocator
    pub fn record_free(&self, bytes: usize) {
        bump(&self.frees, 1);
        bump(&self.bytes_freed, bytes as u64);
    }

    /// Record a finished cascade
    pub fn record_cascade(&self, peak_depth: usize) {
        bump(&self.cascades, 1);
        if peak_depth as u64 > self.peak_work_list.get() {
            self.peak_work_list.set(peak_depth as u64);
        }
    }

    /// Total retain calls
    pub fn retain_calls(&self) -> u64 {
        self.retain_calls.get()
    }

    /// Total release calls, cascaded ones included
    pub fn release_calls(&self) -> u64 {
        self.release_calls.get()
    }

    /// Objects freed
    pub fn frees(&self) -> u64 {
        self.frees.get()
    }

    /// Objects allocated and not yet freed
    ///
    /// Objects built outside this heap can still be freed by it, so frees may
    /// outnumber allocations; the count stops at zero.
    pub fn live_objects(&self) -> u64 {
        self.allocations.get().saturating_sub(self.frees.get())
    }

    /// Bytes allocated and not yet freed, clamped at zero like
    /// [`RcStats::live_objects`]
    pub fn live_bytes(&self) -> u64 {
        self.bytes_allocated.get().saturating_sub(self.bytes_freed.get())
    }

    /// Get summary statistics
    pub fn summary(&self) -> RcSummary {
        RcSummary {
            allocations: self.allocations.get(),
            bytes_allocated: self.bytes_allocated.get(),
            retain_calls: self.retain_calls.get(),
            release_calls: self.release_calls.get(),
            frees: self.frees.get(),
            bytes_freed: self.bytes_freed.get(),
            cascades: self.cascades.get(),
            peak_work_list: self.peak_work_list.get(),
            live_objects: self.live_objects(),
            live_bytes: self.live_bytes(),
        }
    }

    /// Reset call counters
    ///
    /// Allocation and free totals are kept so live counts stay correct.
    pub fn reset(&self) {
        self.retain_calls.set(0);
        self.release_calls.set(0);
        self.cascades.set(0);
        self.peak_work_list.set(0);
    }
}

/// Summary statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RcSummary {
    pub allocations: u64,
    pub bytes_allocated: u64,
    pub retain_calls: u64,
    pub release_calls: u64,
    pub frees: u64,
    pub bytes_freed: u64,
    pub cascades: u64,
    pub peak_work_list: u64,
    pub live_objects: u64,
    pub live_bytes: u64,
}
