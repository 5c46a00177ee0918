use std::sync::atomic::{AtomicU64, Ordering};

/// Optional metrics for monitoring message-store activity.
///
/// Fields are plain `AtomicU64`, not `Mutex<u64>`: these are purely
/// statistical counters with no control-flow dependencies, so relaxed
/// increments are sufficient — the same rationale the rest of this
/// workspace uses for its own hot-path counters.
#[derive(Debug, Default)]
pub struct Metrics {
    messages_added: AtomicU64,
    reads: AtomicU64,
    messages_returned: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_add(&self) {
        self.messages_added.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, returned: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.messages_returned
            .fetch_add(returned as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_added: self.messages_added.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            messages_returned: self.messages_returned.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_added: u64,
    pub reads: u64,
    pub messages_returned: u64,
}
