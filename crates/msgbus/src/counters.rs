//! Write-only telemetry counter sink consumed by the core.
//!
//! Like the trace sink, this is an external collaborator consumed by the
//! core (`GetCounter(name) -> counter` with `SafeIncrement` /
//! `SafeDecrement` / `SafeSetRaw`); this module gives it a concrete default
//! so the bus can be built and tested standalone.

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Recognized counter names.
pub mod names {
    pub const MESSAGES_PUBLISHED_TOTAL: &str = "MessageBusMessagesPublishedTotal";
    pub const MESSAGES_PUBLISHED_PER_SEC: &str = "MessageBusMessagesPublishedPerSec";
    pub const SUBSCRIBERS_TOTAL: &str = "MessageBusSubscribersTotal";
    pub const SUBSCRIBERS_CURRENT: &str = "MessageBusSubscribersCurrent";
    pub const SUBSCRIBERS_PER_SEC: &str = "MessageBusSubscribersPerSec";
    pub const ALLOCATED_WORKERS: &str = "MessageBusAllocatedWorkers";
    pub const BUSY_WORKERS: &str = "MessageBusBusyWorkers";
}

/// A single write-only counter.
pub trait Counter: Send + Sync {
    fn safe_increment(&self);
    fn safe_decrement(&self);
    fn safe_set_raw(&self, value: i64);
    /// Not part of the external contract, but handy for tests and for a
    /// future export path — every default counter is readable.
    fn value(&self) -> i64;
}

/// `GetCounter(name) -> counter`.
pub trait CounterSink: Send + Sync {
    fn get_counter(&self, name: &str) -> Arc<dyn Counter>;
}

#[derive(Debug, Default)]
struct AtomicCounter(AtomicI64);

impl Counter for AtomicCounter {
    fn safe_increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn safe_decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    fn safe_set_raw(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Default [`CounterSink`], backed by the same sharded concurrent map the
/// topic registry uses — one dependency covering both lock-free maps.
#[derive(Debug, Default)]
pub struct AtomicCounterSink {
    counters: DashMap<String, Arc<AtomicCounter>>,
}

impl CounterSink for AtomicCounterSink {
    fn get_counter(&self, name: &str) -> Arc<dyn Counter> {
        let counter = self
            .counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicCounter::default()))
            .clone();
        counter as Arc<dyn Counter>
    }
}
