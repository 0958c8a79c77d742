//! RC Runtime - C FFI wrapper for FRC
//!
//! Generated code links against these functions. They share one
//! process-wide heap over `malloc`, created on first use or by
//! `fax_rc_init`.
//!
//! Failures are logged and reported as null / `false` / `0`, except out of
//! memory, which aborts the process.

use frc::object::{self, header};
use frc::stats::RcMetrics;
use frc::{FrcError, RawAllocator, RcConfig, RcHeap, Result};
use parking_lot::Mutex;
use std::ffi::c_void;

/// Storage from the C allocator
///
/// Objects handed to C code must be freeable by the same allocator C uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocAllocator;

impl RawAllocator for MallocAllocator {
    fn allocate(&mut self, size: i32) -> Result<usize> {
        if size < 0 {
            return Err(FrcError::InvalidLayout(format!(
                "negative allocation size {}",
                size
            )));
        }

        let size = (size as usize).max(header::HEADER_SIZE);
        let ptr = unsafe { libc::calloc(1, size) };
        if ptr.is_null() {
            return Err(FrcError::OutOfMemory { requested: size });
        }
        Ok(ptr as usize)
    }

    fn free(&mut self, _capacity: i32, address: usize) {
        unsafe { libc::free(address as *mut c_void) }
    }
}

static HEAP: Mutex<Option<RcHeap<MallocAllocator>>> = Mutex::new(None);

fn create_heap() -> Result<RcHeap<MallocAllocator>> {
    RcHeap::new(RcConfig::from_env(), MallocAllocator)
}

/// Run `f` on the global heap, creating it if needed
///
/// Returns `default` if the heap cannot be created.
fn with_heap<R>(default: R, f: impl FnOnce(&mut RcHeap<MallocAllocator>) -> R) -> R {
    let mut guard = HEAP.lock();

    if guard.is_none() {
        match create_heap() {
            Ok(heap) => *guard = Some(heap),
            Err(e) => {
                log::error!("Failed to create RC heap: {}", e);
                return default;
            },
        }
    }

    match guard.as_mut() {
        Some(heap) => f(heap),
        None => default,
    }
}

fn into_ptr(result: Result<usize>, what: &str) -> *mut c_void {
    match result {
        Ok(addr) => addr as *mut c_void,
        Err(FrcError::OutOfMemory { requested }) => {
            log::error!("{}: out of memory ({} bytes requested)", what, requested);
            std::process::abort()
        },
        Err(e) => {
            log::error!("{} failed: {}", what, e);
            std::ptr::null_mut()
        },
    }
}

#[no_mangle]
pub extern "C" fn fax_rc_init() -> bool {
    let mut guard = HEAP.lock();
    if guard.is_some() {
        return true;
    }

    match create_heap() {
        Ok(heap) => {
            *guard = Some(heap);
            true
        },
        Err(e) => {
            log::error!("Failed to create RC heap: {}", e);
            false
        },
    }
}

/// Drop the global heap, reporting objects that were never released
///
/// Live objects are not freed.
#[no_mangle]
pub extern "C" fn fax_rc_shutdown() {
    if let Some(heap) = HEAP.lock().take() {
        heap.report_stats();
        let live = heap.stats().live_objects();
        if live > 0 {
            log::warn!("RC heap shut down with {} live objects", live);
        }
    }
}

/// Live objects of the global heap (0 if there is none yet)
#[no_mangle]
pub extern "C" fn fax_rc_live_objects() -> u64 {
    HEAP.lock()
        .as_ref()
        .map_or(0, |heap| heap.stats().live_objects())
}

/// Print heap metrics in Prometheus text format to stderr
#[no_mangle]
pub extern "C" fn fax_rc_dump_stats() {
    let text = with_heap(String::new(), |heap| {
        RcMetrics::from_summary(&heap.stats().summary()).to_prometheus()
    });
    eprint!("{}", text);
}

#[no_mangle]
pub extern "C" fn fax_rc_alloc(capacity: i32, pointer_count: i32) -> *mut c_void {
    with_heap(std::ptr::null_mut(), |heap| {
        into_ptr(heap.alloc_object(capacity, pointer_count), "fax_rc_alloc")
    })
}

#[no_mangle]
pub extern "C" fn fax_rc_retain(ptr: *mut c_void) {
    with_heap((), |heap| unsafe { heap.retain(ptr as usize) })
}

#[no_mangle]
pub extern "C" fn fax_rc_release(ptr: *mut c_void) {
    with_heap((), |heap| {
        unsafe { heap.release(ptr as usize) };
    })
}

#[no_mangle]
pub extern "C" fn fax_rc_refcount(ptr: *const c_void) -> i32 {
    if ptr.is_null() {
        return 0;
    }
    unsafe { header::read_refcount(ptr as usize) }
}

#[no_mangle]
pub extern "C" fn fax_rc_capacity(ptr: *const c_void) -> i32 {
    if ptr.is_null() {
        return 0;
    }
    unsafe { header::read_capacity(ptr as usize) }
}

#[no_mangle]
pub extern "C" fn fax_rc_pointer_count(ptr: *const c_void) -> i32 {
    if ptr.is_null() {
        return 0;
    }
    unsafe { header::read_pointer_count(ptr as usize) }
}

#[no_mangle]
pub extern "C" fn fax_rc_reserved(ptr: *const c_void) -> i32 {
    if ptr.is_null() {
        return 0;
    }
    unsafe { header::read_reserved(ptr as usize) }
}

#[no_mangle]
pub extern "C" fn fax_rc_set_reserved(ptr: *mut c_void, value: i32) {
    if ptr.is_null() {
        return;
    }
    unsafe { header::write_reserved(ptr as usize, value) }
}

/// Address of pointer slot `index`, or null when out of range
#[no_mangle]
pub extern "C" fn fax_rc_pointer_slot(ptr: *mut c_void, index: usize) -> *mut *mut c_void {
    if ptr.is_null() {
        return std::ptr::null_mut();
    }

    let addr = ptr as usize;
    let length = unsafe { header::read_pointer_count(addr) }.max(0) as usize;
    if index >= length {
        log::error!(
            "fax_rc_pointer_slot failed: {}",
            FrcError::BoundsCheckFailed { index, length }
        );
        return std::ptr::null_mut();
    }
    unsafe { header::pointer_slot(addr, index) as *mut *mut c_void }
}

/// Store `value` into slot `index` of `owner`, releasing the previous value
#[no_mangle]
pub extern "C" fn fax_rc_store(owner: *mut c_void, index: usize, value: *mut c_void) -> bool {
    with_heap(false, |heap| {
        match unsafe { heap.replace_slot(owner as usize, index, value as usize) } {
            Ok(()) => true,
            Err(e) => {
                log::error!("fax_rc_store failed: {}", e);
                false
            },
        }
    })
}

fn string_from_bytes(heap: &mut RcHeap<MallocAllocator>, bytes: *const u8, len: usize) -> Result<usize> {
    let bytes: &[u8] = if len == 0 {
        &[]
    } else if bytes.is_null() {
        return Err(FrcError::InvalidPointer { address: 0 });
    } else {
        unsafe { std::slice::from_raw_parts(bytes, len) }
    };

    let text = std::str::from_utf8(bytes)?;
    object::new_string(heap, text)
}

#[no_mangle]
pub extern "C" fn fax_rc_string_new(bytes: *const u8, len: usize) -> *mut c_void {
    with_heap(std::ptr::null_mut(), |heap| {
        into_ptr(string_from_bytes(heap, bytes, len), "fax_rc_string_new")
    })
}

#[no_mangle]
pub extern "C" fn fax_rc_string_len(ptr: *const c_void) -> usize {
    if ptr.is_null() {
        return 0;
    }
    unsafe { object::string_len(ptr as usize) }
}

/// Pointer to the string's bytes (not NUL-terminated)
#[no_mangle]
pub extern "C" fn fax_rc_string_data(ptr: *const c_void) -> *const u8 {
    if ptr.is_null() {
        return std::ptr::null();
    }
    unsafe { header::data_start(ptr as usize) as *const u8 }
}

#[no_mangle]
pub extern "C" fn fax_rc_string_concat(a: *const c_void, b: *const c_void) -> *mut c_void {
    with_heap(std::ptr::null_mut(), |heap| {
        let result = unsafe { object::string_concat(heap, a as usize, b as usize) };
        into_ptr(result, "fax_rc_string_concat")
    })
}

#[no_mangle]
pub extern "C" fn fax_rc_list_new(slots: i32) -> *mut c_void {
    with_heap(std::ptr::null_mut(), |heap| {
        into_ptr(object::new_list(heap, slots), "fax_rc_list_new")
    })
}

/// Append `item`, transferring the caller's reference on success
#[no_mangle]
pub extern "C" fn fax_rc_list_push(list: *mut c_void, item: *mut c_void) -> bool {
    match unsafe { object::list_push(list as usize, item as usize) } {
        Ok(()) => true,
        Err(e) => {
            log::error!("fax_rc_list_push failed: {}", e);
            false
        },
    }
}

/// Borrow element `index`, or null when out of range
#[no_mangle]
pub extern "C" fn fax_rc_list_get(list: *const c_void, index: usize) -> *mut c_void {
    match unsafe { object::list_get(list as usize, index) } {
        Ok(item) => item as *mut c_void,
        Err(e) => {
            log::error!("fax_rc_list_get failed: {}", e);
            std::ptr::null_mut()
        },
    }
}

#[no_mangle]
pub extern "C" fn fax_rc_list_len(list: *const c_void) -> usize {
    if list.is_null() {
        return 0;
    }
    unsafe { object::list_len(list as usize) }
}
