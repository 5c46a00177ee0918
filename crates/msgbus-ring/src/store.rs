use crate::invariants::{
    debug_assert_bounded_read_range, debug_assert_monotonic_watermark,
    debug_assert_retention_window,
};
use crate::{Metrics, MetricsSnapshot, StoreConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// =============================================================================
// CONCURRENCY STRATEGY
// =============================================================================
//
// Unlike the SPSC ring this crate is descended from, a message-store slot is
// read by an unbounded number of concurrent subscriptions and written by
// potentially more than one concurrent publisher (nothing in the bus
// contract limits a topic to a single producer). So the single-producer
// cached-head/cached-tail fast path doesn't apply here; instead:
//
// - `high_watermark` is the monotonically increasing "next id to be written"
//   counter, published with Release after a slot write completes so that a
//   concurrent reader never observes a watermark pointing at a slot that
//   isn't finished being written yet.
// - `write_lock` serializes `add()` calls end to end (claim id, write slot,
//   publish watermark) so concurrent publishers to the same topic don't race
//   on the same id or interleave their watermark bumps out of order.
// - Each slot pairs an `AtomicU64` generation tag with a `Mutex<Option<T>>`
//   holding the payload. The tag is compared against the id a reader wants
//   before it locks the slot to clone the value out — this is the
//   generation-guarded-slab strategy the bus's message-store contract calls
//   for, adapted from this crate's cache-aligned slot layout.
//
// =============================================================================

#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

struct Slot<T> {
    /// Id of the message currently occupying this slot, or `u64::MAX` if the
    /// slot has never been written.
    id: AtomicU64,
    value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            id: AtomicU64::new(u64::MAX),
            value: Mutex::new(None),
        }
    }
}

/// A fixed-capacity, per-topic retained ring of messages, indexed by a
/// monotonically increasing 64-bit id.
///
/// Unlike a consume-once SPSC ring, reads never remove anything: any number
/// of readers may call [`RetainedRing::get_messages`] concurrently with
/// writers and with each other, each picking its own starting id.
pub struct RetainedRing<T> {
    write_lock: Mutex<()>,
    high_watermark: CacheAligned<AtomicU64>,
    capacity: usize,
    slots: Box<[CacheAligned<Slot<T>>]>,
    metrics: Metrics,
    config: StoreConfig,
}

unsafe impl<T: Send> Send for RetainedRing<T> {}
unsafe impl<T: Send> Sync for RetainedRing<T> {}

impl<T: Clone> RetainedRing<T> {
    /// Creates a new store with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.capacity;
        let slots = (0..capacity)
            .map(|_| CacheAligned::new(Slot::empty()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            write_lock: Mutex::new(()),
            high_watermark: CacheAligned::new(AtomicU64::new(0)),
            capacity,
            slots,
            metrics: Metrics::new(),
            config,
        }
    }

    /// Returns the fixed slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The id of the next slot to be written — equivalently, the total
    /// number of messages ever appended.
    #[inline]
    pub fn message_count(&self) -> u64 {
        self.high_watermark.load(Ordering::Acquire)
    }

    /// Appends a message, returning the id it was assigned.
    ///
    /// Safe to call concurrently with any number of readers and other
    /// writers; writers are serialized against each other.
    pub fn add(&self, value: T) -> u64 {
        let _guard = self.write_lock.lock().unwrap();

        let id = self.high_watermark.load(Ordering::Relaxed);
        let idx = (id % self.capacity as u64) as usize;
        let slot = &self.slots[idx];

        *slot.value.lock().unwrap() = Some(value);
        // Publish the slot contents before the id tag, and the id tag before
        // the watermark, so a reader that observes the new watermark via
        // Acquire also observes a slot whose tag already matches.
        slot.id.store(id, Ordering::Release);

        let new_high = id + 1;
        debug_assert_monotonic_watermark!(id, new_high);
        self.high_watermark.store(new_high, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.record_add();
        }

        id
    }

    /// Reads a contiguous run of messages starting at
    /// `max(from_id, oldest_retained_id)`, up to `max_count` messages.
    ///
    /// Returns the id of the first message in the returned list and the
    /// list itself. If `from_id` is at or beyond the high watermark, the
    /// result is empty and the returned id equals the high watermark.
    pub fn get_messages(&self, from_id: u64, max_count: usize) -> (u64, Vec<T>) {
        let high = self.message_count();
        if from_id >= high {
            return (high, Vec::new());
        }

        let oldest = high.saturating_sub(self.capacity as u64);
        debug_assert_retention_window!(oldest, high);

        let start = from_id.max(oldest);
        let end = high.min(start + max_count as u64);
        debug_assert_bounded_read_range!(start, end, max_count, high);

        let mut out = Vec::with_capacity((end - start) as usize);
        for id in start..end {
            let idx = (id % self.capacity as u64) as usize;
            let slot = &self.slots[idx];
            if slot.id.load(Ordering::Acquire) == id {
                if let Some(v) = slot.value.lock().unwrap().as_ref() {
                    out.push(v.clone());
                }
            }
        }

        if self.config.enable_metrics {
            self.metrics.record_read(out.len());
        }

        (start, out)
    }

    /// Returns a metrics snapshot (zeroed if metrics are disabled).
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}
