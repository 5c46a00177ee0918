//! Debug assertion macros for message store invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); zero overhead in
//! release builds. Used by `RetainedRing<T>`.

// =============================================================================
// INV-SEQ-01: Monotonic Watermark
// =============================================================================

/// Assert that the high watermark never decreases.
///
/// **Invariant**: `new_high_watermark >= old_high_watermark`
///
/// Used in: `RetainedRing::add()` after computing the new watermark.
macro_rules! debug_assert_monotonic_watermark {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-SEQ-01 violated: high watermark decreased from {} to {}",
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-SEQ-02: Retention Window
// =============================================================================

/// Assert that the oldest retained id never exceeds the high watermark.
///
/// **Invariant**: `oldest_retained_id <= high_watermark`
///
/// Used in: `RetainedRing::get_messages()` before computing the read range.
macro_rules! debug_assert_retention_window {
    ($oldest:expr, $high:expr) => {
        debug_assert!(
            $oldest <= $high,
            "INV-SEQ-02 violated: oldest retained id {} exceeds high watermark {}",
            $oldest,
            $high
        )
    };
}

// =============================================================================
// INV-RES-01: Bounded Read Range
// =============================================================================

/// Assert that a computed read range never asks for more than `max_count`
/// items and never reads past the high watermark.
///
/// Used in: `RetainedRing::get_messages()` after computing `start`/`end`.
macro_rules! debug_assert_bounded_read_range {
    ($start:expr, $end:expr, $max_count:expr, $high:expr) => {
        debug_assert!(
            $end >= $start
                && ($end - $start) <= $max_count as u64
                && $end <= $high,
            "INV-RES-01 violated: range [{}, {}) exceeds max_count {} or high watermark {}",
            $start,
            $end,
            $max_count,
            $high
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_read_range;
pub(crate) use debug_assert_monotonic_watermark;
pub(crate) use debug_assert_retention_window;
