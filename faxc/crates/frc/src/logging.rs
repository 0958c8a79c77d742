//! Heap Logging and Tracing
//!
//! Event log for heap operations, useful for:
//! - Debugging leaks and premature frees
//! - Inspecting cascade sizes
//! - Production monitoring
//!
//! Log Levels:
//! - ERROR: Heap invariant violations
//! - WARN: Unusual conditions
//! - INFO: Cascades, heap statistics
//! - DEBUG: Frees
//! - TRACE: Per-object allocation

use crate::util::debug::format_address;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Instant;

/// Default number of events a logger keeps before dropping the oldest
pub const DEFAULT_MAX_EVENTS: usize = 1024;

/// Log level for heap events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// Heap event types
#[derive(Debug, Clone, PartialEq)]
pub enum RcEvent {
    /// Object constructed
    Allocate {
        address: usize,
        capacity: i32,
        pointer_count: i32,
    },

    /// Object storage returned to the allocator
    Free { address: usize, capacity: i32 },

    /// Zero transition finished cascading
    Cascade {
        root: usize,
        freed_objects: usize,
        freed_bytes: usize,
        peak_depth: usize,
    },

    /// Debug validation trapped a heap invariant violation
    Violation { address: usize, message: String },

    /// Heap statistics snapshot
    HeapStats {
        live_objects: u64,
        live_bytes: u64,
        allocations: u64,
        frees: u64,
    },
}

/// Heap logger configuration
#[derive(Debug, Clone)]
pub struct RcLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,

    /// Events kept in the buffer; the oldest is dropped when full.
    /// `0` keeps nothing (console output still happens).
    pub max_events: usize,
}

impl Default for RcLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: false,
            json: false,
            timestamps: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

/// Heap logger - event log for a single heap
///
/// Single-threaded like the heap it belongs to; the global logger wraps one
/// in a mutex. The buffer is a ring of at most `max_events` entries.
pub struct RcLogger {
    config: RcLoggerConfig,
    events: RefCell<VecDeque<(Instant, RcEvent)>>,
    dropped: Cell<u64>,
    enabled: Cell<bool>,
}

impl RcLogger {
    /// Create new heap logger
    pub fn new(config: RcLoggerConfig) -> Self {
        Self {
            config,
            events: RefCell::new(VecDeque::new()),
            dropped: Cell::new(0),
            enabled: Cell::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.set(true);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.set(false);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Check whether an event at `level` would be recorded
    ///
    /// Lets hot paths skip building events nobody will keep.
    #[inline]
    pub fn wants(&self, level: LogLevel) -> bool {
        self.is_enabled() && level <= self.config.level
    }

    /// Log a heap event
    pub fn log(&self, event: RcEvent) {
        if !self.wants(event.level()) {
            return;
        }

        if self.config.console {
            self.output_console(&event);
        }

        if self.config.max_events == 0 {
            self.dropped.set(self.dropped.get() + 1);
            return;
        }

        let mut events = self.events.borrow_mut();
        if events.len() >= self.config.max_events {
            events.pop_front();
            self.dropped.set(self.dropped.get() + 1);
        }
        events.push_back((Instant::now(), event));
    }

    fn output_console(&self, event: &RcEvent) {
        if self.config.timestamps {
            let now = chrono::Local::now();
            print!("[{}] ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        }

        if self.config.json {
            println!("{}", event.to_json());
        } else if matches!(event, RcEvent::Violation { .. }) {
            eprintln!("{}", event.to_human());
        } else {
            println!("{}", event.to_human());
        }
    }

    /// Get all events
    pub fn get_events(&self) -> Vec<(Instant, RcEvent)> {
        self.events.borrow().iter().cloned().collect()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    /// Events evicted from (or never stored in) the full buffer
    pub fn dropped_count(&self) -> u64 {
        self.dropped.get()
    }
}

impl Default for RcLogger {
    fn default() -> Self {
        Self::new(RcLoggerConfig::default())
    }
}

impl RcEvent {
    /// Log level of this event
    pub fn level(&self) -> LogLevel {
        match self {
            RcEvent::Violation { .. } => LogLevel::Error,
            RcEvent::Cascade { .. } | RcEvent::HeapStats { .. } => LogLevel::Info,
            RcEvent::Free { .. } => LogLevel::Debug,
            RcEvent::Allocate { .. } => LogLevel::Trace,
        }
    }

    /// Human-readable rendering
    pub fn to_human(&self) -> String {
        match self {
            RcEvent::Allocate {
                address,
                capacity,
                pointer_count,
            } => format!(
                "[RC] Allocated {} ({} bytes, {} pointers)",
                format_address(*address),
                capacity,
                pointer_count
            ),
            RcEvent::Free { address, capacity } => {
                format!("[RC] Freed {} ({} bytes)", format_address(*address), capacity)
            },
            RcEvent::Cascade {
                root,
                freed_objects,
                freed_bytes,
                peak_depth,
            } => format!(
                "[RC] Release of {} freed {} objects ({} bytes, work-list peak {})",
                format_address(*root),
                freed_objects,
                freed_bytes,
                peak_depth
            ),
            RcEvent::Violation { address, message } => format!(
                "[RC] Heap violation at {}: {}",
                format_address(*address),
                message
            ),
            RcEvent::HeapStats {
                live_objects,
                live_bytes,
                allocations,
                frees,
            } => format!(
                "[RC] Heap: {} live objects ({} bytes), {} allocations, {} frees",
                live_objects, live_bytes, allocations, frees
            ),
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RcEvent::Allocate {
                address,
                capacity,
                pointer_count,
            } => serde_json::json!({
                "type": "allocate",
                "address": address,
                "capacity": capacity,
                "pointer_count": pointer_count
            }),
            RcEvent::Free { address, capacity } => serde_json::json!({
                "type": "free",
                "address": address,
                "capacity": capacity
            }),
            RcEvent::Cascade {
                root,
                freed_objects,
                freed_bytes,
                peak_depth,
            } => serde_json::json!({
                "type": "cascade",
                "root": root,
                "freed_objects": freed_objects,
                "freed_bytes": freed_bytes,
                "peak_depth": peak_depth
            }),
            RcEvent::Violation { address, message } => serde_json::json!({
                "type": "violation",
                "address": address,
                "message": message
            }),
            RcEvent::HeapStats {
                live_objects,
                live_bytes,
                allocations,
                frees,
            } => serde_json::json!({
                "type": "heap_stats",
                "live_objects": live_objects,
                "live_bytes": live_bytes,
                "allocations": allocations,
                "frees": frees
            }),
        }
    }
}

// Global heap logger
lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: parking_lot::Mutex<RcLogger> =
        parking_lot::Mutex::new(RcLogger::default());
}

/// Log a heap event to the global logger
pub fn log_event(event: RcEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Configure the global logger
pub fn configure_logger(config: RcLoggerConfig) {
    *GLOBAL_LOGGER.lock() = RcLogger::new(config);
}

/// Get global logger event count
pub fn get_event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}
