//! Adaptive worker-pool engine.
//!
//! A single FIFO of ready subscriptions behind a mutex, paired with a
//! `tokio::sync::Notify` for the "signal one waiter" step — the same
//! pairing this workspace's async bridge uses to wake a bounded consumer
//! without polling. Workers grow only when every existing worker is busy
//! (`AddWorker`'s guard) and shrink when idle beyond `max_idle_workers`,
//! giving quick ramp-up under burst load and a bounded steady-state
//! footprint. A periodic timer re-schedules every subscription as a
//! safety net against the narrow race where a subscription's `queued` flag
//! clears just as new messages become visible to it.

use crate::config::EngineConfig;
use crate::counters::{names, CounterSink};
use crate::subscription::Subscription;
use crate::topic::TopicRegistry;
use crate::trace::TraceSink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::debug;

pub struct Engine {
    queue: Mutex<VecDeque<Arc<Subscription>>>,
    notify: Notify,
    /// Tracks every spawned worker task so the pool's size is observable as
    /// a set, not just a counter — `allocated`/`busy` stay the source of
    /// truth for scheduling decisions, this exists for (future) graceful
    /// drain/shutdown.
    workers: Mutex<JoinSet<()>>,
    allocated: AtomicUsize,
    busy: AtomicUsize,
    checking: AtomicBool,
    config: EngineConfig,
    registry: Arc<TopicRegistry>,
    counters: Arc<dyn CounterSink>,
    trace: Arc<dyn TraceSink>,
}

impl Engine {
    /// Builds the engine and spawns its idle-check timer. The timer holds
    /// only a `Weak` reference, so the engine (and its tokio tasks) can be
    /// dropped cleanly once the owning [`crate::bus::MessageBus`] is.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        registry: Arc<TopicRegistry>,
        counters: Arc<dyn CounterSink>,
        trace: Arc<dyn TraceSink>,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            workers: Mutex::new(JoinSet::new()),
            allocated: AtomicUsize::new(0),
            busy: AtomicUsize::new(0),
            checking: AtomicBool::new(false),
            config,
            registry,
            counters,
            trace,
        });

        Self::spawn_idle_timer(&engine);
        engine
    }

    #[must_use]
    pub fn allocated_workers(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn busy_workers(&self) -> usize {
        self.busy.load(Ordering::Relaxed)
    }

    /// Enqueues `subscription` if it isn't already queued, and considers
    /// spawning a new worker to pick it up.
    pub fn schedule(self: &Arc<Self>, subscription: Arc<Subscription>) {
        if !subscription.set_queued() {
            return;
        }
        {
            let mut queue = self.queue.lock().unwrap();
            queue.push_back(subscription);
        }
        self.notify.notify_one();
        self.maybe_add_worker();
    }

    /// Spawns a new worker iff `allocated < max_workers` and
    /// `allocated == busy` (every existing worker is occupied).
    fn maybe_add_worker(self: &Arc<Self>) {
        loop {
            let allocated = self.allocated.load(Ordering::SeqCst);
            let busy = self.busy.load(Ordering::SeqCst);
            debug_assert!(busy <= allocated, "busy worker count exceeds allocated");
            if allocated >= self.config.max_workers || allocated != busy {
                return;
            }
            if self
                .allocated
                .compare_exchange(allocated, allocated + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.counters
                    .get_counter(names::ALLOCATED_WORKERS)
                    .safe_set_raw((allocated + 1) as i64);
                self.spawn_worker();
                return;
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        self.workers.lock().unwrap().spawn(async move {
            engine.worker_loop().await;
        });
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            let allocated = self.allocated.load(Ordering::SeqCst);
            let busy = self.busy.load(Ordering::SeqCst);
            let idle = allocated.saturating_sub(busy);
            if idle > self.config.max_idle_workers {
                self.terminate_worker();
                return;
            }

            let Some(subscription) = self.dequeue_or_wait().await else {
                self.terminate_worker();
                return;
            };

            self.busy.fetch_add(1, Ordering::SeqCst);
            self.counters
                .get_counter(names::BUSY_WORKERS)
                .safe_set_raw(self.busy.load(Ordering::Relaxed) as i64);

            subscription.work_async().await;
            subscription.unset_queued();

            self.busy.fetch_sub(1, Ordering::SeqCst);
            self.counters
                .get_counter(names::BUSY_WORKERS)
                .safe_set_raw(self.busy.load(Ordering::Relaxed) as i64);
        }
    }

    /// Waits on the queue's condition, backed by `Notify`. Returns `None`
    /// only if the engine itself has gone away (unreachable in practice
    /// while at least one `MessageBus` keeps it alive, but kept explicit
    /// rather than looping forever on a dropped engine).
    async fn dequeue_or_wait(self: &Arc<Self>) -> Option<Arc<Subscription>> {
        loop {
            {
                let mut queue = self.queue.lock().unwrap();
                if let Some(subscription) = queue.pop_front() {
                    return Some(subscription);
                }
            }
            self.notify.notified().await;
        }
    }

    fn terminate_worker(&self) {
        let allocated = self.allocated.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(allocated > 0, "allocated worker count underflowed");
        self.counters
            .get_counter(names::ALLOCATED_WORKERS)
            .safe_set_raw(allocated.saturating_sub(1) as i64);
    }

    fn spawn_idle_timer(engine: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(engine);
        let interval_dur = engine.config.idle_check_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_dur);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                let Some(engine) = weak.upgrade() else {
                    return;
                };
                engine.run_idle_check();
            }
        });
    }

    /// Single-flight (CAS-guarded) pass that reschedules every subscription
    /// of every topic. Recovers any subscription whose `queued` flag was
    /// cleared in the narrow window between a publish's visibility check and
    /// the pump's `unset_queued`, and delivers to subscriptions that joined
    /// mid-publish.
    fn run_idle_check(self: &Arc<Self>) {
        if self
            .checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let topics = engine.registry.snapshot_topics();
            debug!(topics = topics.len(), "idle check: rescheduling all subscriptions");
            engine.trace.debug("idle check: rescheduling all subscriptions");
            for topic in topics {
                for subscription in topic.snapshot_subscribers().await {
                    engine.schedule(subscription);
                }
            }
            engine.checking.store(false, Ordering::Release);
        });
    }
}
