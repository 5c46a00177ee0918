//! Topic registry.
//!
//! A topic is created lazily on first publish or subscribe and never
//! destroyed — bounded memory under unbounded distinct topic keys is left
//! as documented future work, not handled here. It owns a message store
//! plus an ordered subscriber list and an identity set, both guarded by one
//! reader/writer lock — the write path (subscribe/unsubscribe) takes the
//! write lock, the read path (publish snapshotting subscribers to schedule)
//! takes the read lock.

use crate::message::Message;
use crate::subscription::Subscription;
use dashmap::DashMap;
use msgbus_ring::{RetainedRing, StoreConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Subscribers {
    /// Ordered so that delivery-triggering snapshots are deterministic for
    /// a given topic across repeated publishes.
    list: Vec<Arc<Subscription>>,
    /// Lower-cased identities, for case-insensitive dedupe per the
    /// specification's data model.
    identities: HashSet<String>,
}

impl Subscribers {
    fn new() -> Self {
        Self {
            list: Vec::new(),
            identities: HashSet::new(),
        }
    }
}

/// A named channel: one message store plus a subscriber set.
pub struct Topic {
    key: String,
    store: RetainedRing<Message>,
    subscribers: RwLock<Subscribers>,
}

impl Topic {
    pub(crate) fn new(key: String, store_config: StoreConfig) -> Self {
        Self {
            key,
            store: RetainedRing::new(store_config),
            subscribers: RwLock::new(Subscribers::new()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn store(&self) -> &RetainedRing<Message> {
        &self.store
    }

    /// Adds `subscription` to this topic's subscriber list, enforcing the
    /// identity-set dedupe (case-insensitive). Returns `true` if added,
    /// `false` if a subscription with the same identity was already present.
    pub async fn add_subscriber(&self, subscription: Arc<Subscription>) -> bool {
        let mut subs = self.subscribers.write().await;
        let identity_key = subscription.identity().to_lowercase();
        if !subs.identities.insert(identity_key) {
            return false;
        }
        subs.list.push(subscription);
        true
    }

    /// Removes every subscription with the given identity (case-sensitive
    /// match on the real identity string; the lowercase form is what backs
    /// the dedupe set). Tolerant of `identity` not being present.
    pub async fn remove_subscriber(&self, identity: &str) {
        let mut subs = self.subscribers.write().await;
        subs.list.retain(|s| s.identity() != identity);
        subs.identities.remove(&identity.to_lowercase());
    }

    /// Snapshots the current subscriber list for scheduling. Taken under the
    /// read lock so concurrent publishes don't block each other.
    pub async fn snapshot_subscribers(&self) -> Vec<Arc<Subscription>> {
        self.subscribers.read().await.list.clone()
    }
}

/// Thread-safe `key -> Topic` map with `get_or_add` semantics: concurrent
/// callers on the same key observe the same topic. The registry owns every
/// topic it creates; there is no removal.
pub struct TopicRegistry {
    topics: DashMap<String, Arc<Topic>>,
    store_config: StoreConfig,
}

impl TopicRegistry {
    #[must_use]
    pub fn new(store_config: StoreConfig) -> Self {
        Self {
            topics: DashMap::new(),
            store_config,
        }
    }

    /// Returns the topic for `key`, creating it if this is the first
    /// reference to it.
    pub fn get_or_add(&self, key: &str) -> Arc<Topic> {
        self.topics
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Topic::new(key.to_string(), self.store_config)))
            .clone()
    }

    /// Returns the topic for `key` if it has already been created, without
    /// creating it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Topic>> {
        self.topics.get(key).map(|t| t.clone())
    }

    /// The next-id-to-be-written for `key` as a plain integer, or 0 if the
    /// topic has never been created.
    #[must_use]
    pub fn cursor_value(&self, key: &str) -> u64 {
        self.get(key).map_or(0, |t| t.store().message_count())
    }

    /// Snapshots every topic currently registered, for the engine's idle
    /// safety-net timer.
    pub fn snapshot_topics(&self) -> Vec<Arc<Topic>> {
        self.topics.iter().map(|e| Arc::clone(e.value())).collect()
    }
}
