//! Shutdown of the process-global heap
//!
//! Runs in its own test binary: shutting the heap down here cannot race with
//! the unit tests in `src/rc.rs`. Everything lives in one test so the steps
//! run in order.

use faxc_runtime::*;

#[test]
fn test_shutdown_then_reuse() {
    // No heap yet: shutting down is a no-op.
    fax_rc_shutdown();
    assert_eq!(fax_rc_live_objects(), 0);

    assert!(fax_rc_init());
    let survivor = fax_rc_alloc(16, 0);
    let temporary = fax_rc_alloc(8, 0);
    assert!(!survivor.is_null());
    fax_rc_release(temporary);
    assert_eq!(fax_rc_live_objects(), 1);

    // Reports the survivor and leaves it allocated.
    fax_rc_shutdown();
    assert_eq!(fax_rc_live_objects(), 0);
    assert_eq!(fax_rc_refcount(survivor), 1);
    assert_eq!(fax_rc_capacity(survivor), 16);

    // A fresh heap frees an object it never allocated without its live
    // count wrapping around.
    fax_rc_release(survivor);
    assert_eq!(fax_rc_live_objects(), 0);
    fax_rc_dump_stats();

    let again = fax_rc_alloc(8, 0);
    assert!(!again.is_null());
    assert_eq!(fax_rc_live_objects(), 1);
    fax_rc_release(again);
    assert_eq!(fax_rc_live_objects(), 0);

    fax_rc_shutdown();
}
