//! String Objects
//!
//! ```text
//! +----------------------+---------------------------+
//! | header               | payload                   |
//! | pointer_count = 0    | UTF-8 bytes               |
//! | reserved = byte len  |                           |
//! +----------------------+---------------------------+
//! ```
//!
//! Strings own no references, so releasing one never cascades.

use super::header;
use crate::allocator::RawAllocator;
use crate::error::{FrcError, Result};
use crate::heap::RcHeap;

/// Construct a string object holding a copy of `text`
///
/// The caller owns the returned reference.
pub fn new_string<A: RawAllocator>(heap: &mut RcHeap<A>, text: &str) -> Result<usize> {
    alloc_bytes(heap, &[text.as_bytes()])
}

fn alloc_bytes<A: RawAllocator>(heap: &mut RcHeap<A>, parts: &[&[u8]]) -> Result<usize> {
    let total: usize = parts.iter().map(|part| part.len()).sum();
    let len = i32::try_from(total)
        .map_err(|_| FrcError::InvalidLayout(format!("string of {} bytes is too long", total)))?;

    let addr = heap.alloc_object(len, 0)?;
    unsafe {
        let mut dst = header::data_start(addr) as *mut u8;
        for part in parts {
            std::ptr::copy_nonoverlapping(part.as_ptr(), dst, part.len());
            dst = dst.add(part.len());
        }
        header::write_reserved(addr, len);
    }
    Ok(addr)
}

/// Length of a string in bytes
///
/// # Safety
/// `addr` must be a live string object.
pub unsafe fn string_len(addr: usize) -> usize {
    header::read_reserved(addr).max(0) as usize
}

/// Raw bytes of a string
///
/// # Safety
/// `addr` must be a live string object, and must stay alive for `'a`.
pub unsafe fn string_bytes<'a>(addr: usize) -> &'a [u8] {
    let len = string_len(addr).min(header::read_capacity(addr).max(0) as usize);
    std::slice::from_raw_parts(header::data_start(addr) as *const u8, len)
}

/// Contents of a string as `&str`
///
/// # Errors
/// `FrcError::InvalidUtf8` if the payload is not UTF-8.
///
/// # Safety
/// Same as [`string_bytes`].
pub unsafe fn string_as_str<'a>(addr: usize) -> Result<&'a str> {
    Ok(std::str::from_utf8(string_bytes(addr))?)
}

/// Construct a new string holding `a` followed by `b`
///
/// Neither argument is consumed.
///
/// # Errors
/// `FrcError::InvalidPointer` if either argument is null, or any error of
/// [`RcHeap::alloc_object`].
///
/// # Safety
/// `a` and `b` must be null or live string objects.
pub unsafe fn string_concat<A: RawAllocator>(
    heap: &mut RcHeap<A>,
    a: usize,
    b: usize,
) -> Result<usize> {
    if a == 0 || b == 0 {
        return Err(FrcError::InvalidPointer { address: 0 });
    }
    alloc_bytes(heap, &[string_bytes(a), string_bytes(b)])
}
