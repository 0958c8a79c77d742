//! List Objects
//!
//! A list of references with a fixed number of slots:
//!
//! ```text
//! +----------------------+----------------------------------+
//! | header               | payload                          |
//! | pointer_count = N    | slot 0 .. slot len-1 | null ...  |
//! | reserved = len       |                                  |
//! +----------------------+----------------------------------+
//! ```
//!
//! Every slot counts as an owned pointer. Slots past the logical length are
//! kept null, so releasing a list releases exactly its elements.

use super::header::{self, POINTER_SIZE};
use crate::allocator::RawAllocator;
use crate::error::{FrcError, Result};
use crate::heap::RcHeap;

/// Construct an empty list with room for `slots` references
pub fn new_list<A: RawAllocator>(heap: &mut RcHeap<A>, slots: i32) -> Result<usize> {
    let capacity = (slots.max(0) as usize)
        .checked_mul(POINTER_SIZE)
        .and_then(|bytes| i32::try_from(bytes).ok())
        .ok_or_else(|| FrcError::InvalidLayout(format!("list of {} slots is too large", slots)))?;

    // alloc_object rejects a negative slot count.
    heap.alloc_object(capacity, slots)
}

/// Number of elements in a list
///
/// # Safety
/// `list` must be a live list object.
pub unsafe fn list_len(list: usize) -> usize {
    header::read_reserved(list).max(0) as usize
}

/// Number of slots in a list
///
/// # Safety
/// `list` must be a live list object.
pub unsafe fn list_slots(list: usize) -> usize {
    header::read_pointer_count(list).max(0) as usize
}

/// Append `item`, transferring the caller's reference into the list
///
/// On error the caller still owns `item`.
///
/// # Errors
/// - `FrcError::InvalidPointer` if `list` is null
/// - `FrcError::ListFull` if every slot is in use
///
/// # Safety
/// `list` must be null or a live list object; `item` null or live.
pub unsafe fn list_push(list: usize, item: usize) -> Result<()> {
    if list == 0 {
        return Err(FrcError::InvalidPointer { address: list });
    }

    let len = list_len(list);
    let slots = list_slots(list);
    if len >= slots {
        return Err(FrcError::ListFull { capacity: slots });
    }

    header::write_pointer(list, len, item);
    header::write_reserved(list, len as i32 + 1);
    Ok(())
}

/// Borrow element `index`
///
/// The list keeps its reference; retain the result to keep it.
///
/// # Errors
/// - `FrcError::InvalidPointer` if `list` is null
/// - `FrcError::BoundsCheckFailed` if `index >= len`
///
/// # Safety
/// `list` must be null or a live list object.
pub unsafe fn list_get(list: usize, index: usize) -> Result<usize> {
    if list == 0 {
        return Err(FrcError::InvalidPointer { address: list });
    }

    let length = list_len(list);
    if index >= length {
        return Err(FrcError::BoundsCheckFailed { index, length });
    }
    Ok(header::read_pointer(list, index))
}

/// Remove the last element, transferring its reference to the caller
///
/// Returns `None` for an empty list.
///
/// # Safety
/// `list` must be a live list object.
pub unsafe fn list_pop(list: usize) -> Option<usize> {
    let len = list_len(list);
    if len == 0 {
        return None;
    }

    let item = header::read_pointer(list, len - 1);
    header::write_pointer(list, len - 1, 0);
    header::write_reserved(list, len as i32 - 1);
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::TrackingAllocator;
    use crate::object::string::new_string;
    use crate::RcConfig;

    fn heap() -> RcHeap<TrackingAllocator> {
        RcHeap::new(RcConfig::default(), TrackingAllocator::new()).unwrap()
    }

    #[test]
    fn test_push_get_pop() {
        let mut heap = heap();
        let list = new_list(&mut heap, 2).unwrap();
        let a = new_string(&mut heap, "a").unwrap();
        let b = new_string(&mut heap, "b").unwrap();
        let c = new_string(&mut heap, "c").unwrap();

        unsafe {
            assert_eq!(list_slots(list), 2);
            assert_eq!(list_len(list), 0);

            list_push(list, a).unwrap();
            list_push(list, b).unwrap();
            assert!(matches!(
                list_push(list, c),
                Err(FrcError::ListFull { capacity: 2 })
            ));

            assert_eq!(list_get(list, 1).unwrap(), b);
            assert!(matches!(
                list_get(list, 2),
                Err(FrcError::BoundsCheckFailed {
                    index: 2,
                    length: 2
                })
            ));

            assert_eq!(list_pop(list), Some(b));
            assert_eq!(list_len(list), 1);
            assert_eq!(header::read_pointer(list, 1), 0);

            heap.release(b);
            heap.release(c);
            // Releases `a` with it.
            heap.release(list);
        }
        heap.allocator().assert_no_leaks("list");
    }

    #[test]
    fn test_pop_empty() {
        let mut heap = heap();
        let list = new_list(&mut heap, 0).unwrap();
        unsafe {
            assert_eq!(list_pop(list), None);
            heap.release(list);
        }
    }

    #[test]
    fn test_negative_slots_rejected() {
        let mut heap = heap();
        assert!(matches!(
            new_list(&mut heap, -1),
            Err(FrcError::InvalidLayout(_))
        ));
    }
}
