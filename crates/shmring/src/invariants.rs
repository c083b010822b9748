//! Debug assertion macros for ring buffer invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

/// Assert that a cursor stays inside `[0, capacity)`.
///
/// Checked after every cursor computation, before the value is published.
macro_rules! debug_assert_cursor_in_bounds {
    ($name:literal, $cursor:expr, $capacity:expr) => {
        debug_assert!(
            $cursor < $capacity,
            "cursor invariant violated: {} = {} not below capacity {}",
            $name,
            $cursor,
            $capacity
        )
    };
}

/// Assert the occupancy conservation law: `free + occupied == capacity - 1`.
///
/// The one reserved slot keeps `read == write` unambiguous (empty, never full).
macro_rules! debug_assert_conservation {
    ($free:expr, $occupied:expr, $capacity:expr) => {
        debug_assert!(
            $free + $occupied == $capacity - 1,
            "conservation violated: free {} + occupied {} != capacity {} - 1",
            $free,
            $occupied,
            $capacity
        )
    };
}

/// Assert that a consume-side step never eats more than is occupied.
macro_rules! debug_assert_within_occupied {
    ($n:expr, $occupied:expr) => {
        debug_assert!(
            $n <= $occupied,
            "read-side invariant violated: consuming {} of {} occupied bytes",
            $n,
            $occupied
        )
    };
}

/// Assert that a produce-side step never eats the reserved slot.
macro_rules! debug_assert_within_free {
    ($n:expr, $free:expr) => {
        debug_assert!(
            $n <= $free,
            "write-side invariant violated: committing {} with {} free bytes",
            $n,
            $free
        )
    };
}

#[allow(unused_imports)] // exercised from test-only checks
pub(crate) use debug_assert_conservation;
pub(crate) use debug_assert_cursor_in_bounds;
pub(crate) use debug_assert_within_free;
pub(crate) use debug_assert_within_occupied;
