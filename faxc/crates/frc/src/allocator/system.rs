//! System Allocator
//!
//! Backs objects with the Rust global allocator. The layout of a freed
//! object is rebuilt from the capacity passed to `free`, so no side table is
//! needed.

use super::RawAllocator;
use crate::error::{FrcError, Result};
use crate::object::header::HEADER_SIZE;
use crate::util::Alignment;
use std::alloc::{self, Layout};

/// SystemAllocator - zeroed storage from `std::alloc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
    pub fn new() -> Self {
        Self
    }

    fn layout(size: usize) -> Result<Layout> {
        let size = Alignment::align_up(size.max(HEADER_SIZE), Alignment::OBJECT);
        Layout::from_size_align(size, Alignment::OBJECT)
            .map_err(|e| FrcError::InvalidLayout(e.to_string()))
    }
}

impl RawAllocator for SystemAllocator {
    fn allocate(&mut self, size: i32) -> Result<usize> {
        if size < 0 {
            return Err(FrcError::InvalidLayout(format!(
                "negative allocation size {}",
                size
            )));
        }

        let layout = Self::layout(size as usize)?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(FrcError::OutOfMemory {
                requested: layout.size(),
            });
        }

        Ok(ptr as usize)
    }

    fn free(&mut self, capacity: i32, address: usize) {
        // The layout was valid when the object was allocated with this capacity.
        if let Ok(layout) = Self::layout(HEADER_SIZE + capacity.max(0) as usize) {
            unsafe { alloc::dealloc(address as *mut u8, layout) }
        }
    }
}
