//! Subscription state machine and pump loop — the core of the whole system.
//!
//! A subscription owns an identity, an ordered cursor list, a delivery
//! callback, and three atomic flags (`queued`, `working`, `disposed`). The
//! pump (`work_async`) drains every cursor's topic against its store, hands
//! a concatenated batch to the callback, and loops until idle or told to
//! stop — matching the original's `goto Process` tail-loop, expressed here
//! as a plain `loop { ... continue }`. Rust's `async`/`await` collapses the
//! original's synchronous-completion-vs-continuation split (pump algorithm
//! steps f/g): both become a single `.await`, since the executor — not the
//! caller — decides whether that future resolves immediately or suspends.

use crate::cursor::{self, CursorEntry};
use crate::delivery::{CallbackError, DeliveryCallbackBoxed, MessageResult};
use crate::message::Message;
use crate::topic::Topic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One `(key, next id, topic handle)` position within a subscription.
#[derive(Clone)]
struct Cursor {
    key: String,
    id: u64,
    topic: Option<Arc<Topic>>,
}

/// A subscriber's view across zero or more topics.
///
/// Equality and hashing are by `identity`, but this type does not implement
/// `Eq`/`Hash` itself — dedupe happens in the topic's identity set
/// (case-insensitive) rather than via a `HashSet<Subscription>`.
pub struct Subscription {
    identity: String,
    cursors: Mutex<Vec<Cursor>>,
    callback: Arc<dyn DeliveryCallbackBoxed>,
    max_messages: usize,
    queued: AtomicBool,
    working: AtomicBool,
    disposed: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        identity: String,
        callback: Arc<dyn DeliveryCallbackBoxed>,
        max_messages: usize,
    ) -> Self {
        Self {
            identity,
            cursors: Mutex::new(Vec::new()),
            callback,
            max_messages,
            queued: AtomicBool::new(false),
            working: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// If no cursor exists for `key`, appends `{key, id, topic}` and returns
    /// `true`. If one already exists, leaves it untouched and returns
    /// `false`.
    pub fn add_or_update_cursor(&self, key: String, id: u64, topic: Option<Arc<Topic>>) -> bool {
        let mut cursors = self.cursors.lock().unwrap();
        if cursors.iter().any(|c| c.key == key) {
            return false;
        }
        cursors.push(Cursor { key, id, topic });
        true
    }

    /// Sets the id of an existing cursor for `key`; returns whether one
    /// existed.
    pub fn update_cursor(&self, key: &str, id: u64) -> bool {
        let mut cursors = self.cursors.lock().unwrap();
        match cursors.iter_mut().find(|c| c.key == key) {
            Some(cursor) => {
                cursor.id = id;
                true
            }
            None => false,
        }
    }

    /// Attaches a topic handle to an existing cursor for `key`; returns
    /// whether one existed.
    pub fn set_cursor_topic(&self, key: &str, topic: Arc<Topic>) -> bool {
        let mut cursors = self.cursors.lock().unwrap();
        match cursors.iter_mut().find(|c| c.key == key) {
            Some(cursor) => {
                cursor.topic = Some(topic);
                true
            }
            None => false,
        }
    }

    /// Drops all cursors for `key`. Tolerant of `key` not being present.
    pub fn remove_cursor(&self, key: &str) {
        self.cursors.lock().unwrap().retain(|c| c.key != key);
    }

    /// Idempotent: marks the subscription disposed. No further callbacks are
    /// initiated after this; an in-flight pump completes normally.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// CAS `queued` 0 -> 1. Returns `true` if this call performed the
    /// transition (the caller should enqueue); `false` if it was already
    /// queued (the caller does nothing further — the subscription will see
    /// the new work on its current or next pump).
    pub(crate) fn set_queued(&self) -> bool {
        self.queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn unset_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }

    fn clone_cursors(&self) -> Vec<Cursor> {
        self.cursors.lock().unwrap().clone()
    }

    fn swap_cursors(&self, new_cursors: Vec<Cursor>) {
        *self.cursors.lock().unwrap() = new_cursors;
    }

    fn current_cursor_string(&self) -> String {
        encode_cursors(&self.cursors.lock().unwrap())
    }

    /// Entry point from the engine. If another worker already owns this
    /// subscription's pump, returns immediately. Otherwise drains pending
    /// messages for every cursor and invokes the callback until idle.
    pub(crate) async fn work_async(self: &Arc<Self>) {
        if self
            .working
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.pump_loop().await;
        self.working.store(false, Ordering::Release);
    }

    async fn pump_loop(self: &Arc<Self>) {
        loop {
            if self.is_disposed() {
                debug!(subscription = %self.identity, "pump: disposed, stopping");
                return;
            }

            let mut clones = self.clone_cursors();
            let mut items: Vec<Message> = Vec::new();

            for cursor in &mut clones {
                let Some(topic) = cursor.topic.as_ref() else {
                    continue;
                };
                let (first_id, mut batch) = topic.store().get_messages(cursor.id, self.max_messages);
                if !batch.is_empty() {
                    cursor.id = first_id + batch.len() as u64;
                    items.append(&mut batch);
                }
            }

            let next_cursor = encode_cursors(&clones);

            if items.is_empty() {
                return;
            }

            self.swap_cursors(clones);

            let total_count = items.len();
            let result = MessageResult {
                items,
                next_cursor,
                total_count,
            };

            match self.callback.deliver_boxed(result).await {
                Ok(true) => continue,
                Ok(false) => {
                    self.dispose();
                    let terminal = MessageResult {
                        items: Vec::new(),
                        next_cursor: self.current_cursor_string(),
                        total_count: 0,
                    };
                    let _ = self.callback.deliver_boxed(terminal).await;
                    return;
                }
                Err(err) => {
                    self.report_fault(&err);
                    return;
                }
            }
        }
    }

    fn report_fault(&self, err: &CallbackError) {
        // Callback faults are logged and tolerated, not auto-disposed — the
        // faulting subscription is simply not rescheduled by this pump; the
        // next publish or idle-check tick will try again.
        warn!(subscription = %self.identity, error = %err, "pump: callback faulted");
    }
}

fn encode_cursors(cursors: &[Cursor]) -> String {
    let entries: Vec<CursorEntry<'_>> = cursors
        .iter()
        .map(|c| CursorEntry { key: &c.key, id: c.id })
        .collect();
    cursor::encode(&entries)
}
