//! Property Tests - Counting Invariants
//!
//! Randomized checks, via quickcheck, of the invariants that must hold for
//! any correct call sequence:
//! - After `r` retains and `k <= r` releases the count is `1 + r - k`
//! - The object is freed exactly when that reaches zero
//! - Construction-time header fields survive any balanced sequence
//! - A cascade frees exactly the objects it solely owns

mod common;

use common::RcFixture;
use frc::object::header;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

#[quickcheck]
fn prop_balance(retains: u8, releases: u8) -> TestResult {
    if releases > retains {
        return TestResult::discard();
    }

    let mut fixture = RcFixture::with_defaults();
    let x = fixture.leaf();

    for _ in 0..retains {
        fixture.retain(x);
    }
    for _ in 0..releases {
        fixture.release(x);
    }

    let expected = 1 + retains as i32 - releases as i32;
    if fixture.refcount(x) != expected || !fixture.is_live(x) {
        return TestResult::failed();
    }

    for _ in 0..expected - 1 {
        fixture.release(x);
    }
    if !fixture.is_live(x) {
        return TestResult::failed();
    }

    let report = fixture.release(x);
    TestResult::from_bool(report.freed_objects == 1 && !fixture.is_live(x))
}

#[quickcheck]
fn prop_header_round_trip(pointer_count: u8, data: u16, retains: u8) -> bool {
    let mut fixture = RcFixture::with_defaults();
    let pointer_count = (pointer_count % 16) as i32;
    let capacity = pointer_count * header::POINTER_SIZE as i32 + data as i32;

    let x = fixture
        .heap
        .alloc_object(capacity, pointer_count)
        .expect("valid layout");

    for _ in 0..retains {
        fixture.retain(x);
    }
    let intact = unsafe {
        header::read_capacity(x) == capacity && header::read_pointer_count(x) == pointer_count
    };
    for _ in 0..retains {
        fixture.release(x);
    }
    fixture.release(x);

    intact && !fixture.is_live(x)
}

/// Children flagged in `shared` get an extra outside reference
#[quickcheck]
fn prop_cascade_frees_sole_owned(shared: Vec<bool>) -> bool {
    let mut fixture = RcFixture::with_defaults();
    let shared: Vec<bool> = shared.into_iter().take(32).collect();

    let children: Vec<usize> = shared.iter().map(|_| fixture.leaf()).collect();
    for (&child, &is_shared) in children.iter().zip(&shared) {
        if is_shared {
            fixture.retain(child);
        }
    }
    let parent = fixture.object(&children, 0);

    let report = fixture.release(parent);
    let sole = shared.iter().filter(|&&s| !s).count();
    let ok = report.freed_objects == sole + 1
        && children
            .iter()
            .zip(&shared)
            .all(|(&child, &is_shared)| fixture.is_live(child) == is_shared);

    for (&child, &is_shared) in children.iter().zip(&shared) {
        if is_shared {
            fixture.release(child);
        }
    }
    ok && fixture.heap.allocator().live_count() == 0
}
