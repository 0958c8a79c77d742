//! Debug Utilities
//!
//! Formatting helpers for diagnostics.

use crate::object::header;

/// Debug formatter for memory addresses
pub fn format_address(address: usize) -> String {
    format!("0x{:016X}", address)
}

/// Render an object's header and the first bytes of its payload
///
/// # Safety
/// `address` must point to memory that is still owned by the heap (live, or
/// about to be freed) and readable for at least `HEADER_SIZE + max_bytes`
/// bytes or its full capacity, whichever is smaller.
pub unsafe fn dump_object(address: usize, max_bytes: usize) -> String {
    let capacity = header::read_capacity(address);
    let mut out = format!(
        "object {}: refcount={} capacity={} pointer_count={} reserved={}\n",
        format_address(address),
        header::read_refcount(address),
        capacity,
        header::read_pointer_count(address),
        header::read_reserved(address),
    );

    let len = (capacity.max(0) as usize).min(max_bytes);
    let payload = header::payload_start(address);

    for line in 0..len.div_ceil(16) {
        let offset = line * 16;
        out.push_str(&format!("  {}: ", format_address(payload + offset)));
        for j in offset..(offset + 16).min(len) {
            let byte = *((payload + j) as *const u8);
            out.push_str(&format!("{:02X} ", byte));
        }
        out.push('\n');
    }

    out
}
