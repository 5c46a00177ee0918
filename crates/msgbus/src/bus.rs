//! The public `MessageBus` facade: wires the topic registry, subscription
//! state machine, cursor codec, and engine into `publish`/`subscribe`/
//! `get_cursor`/worker-count accessors.

use crate::config::BusConfig;
use crate::counters::{names, AtomicCounterSink, CounterSink};
use crate::cursor::{self, CursorDecodeError};
use crate::delivery::DeliveryCallbackBoxed;
use crate::engine::Engine;
use crate::message::Message;
use crate::subscription::Subscription;
use crate::topic::{Topic, TopicRegistry};
use crate::trace::{TraceSink, TracingSink};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Implemented by anything that can subscribe to the bus.
///
/// `event_keys` is read once at subscribe time to decide which topics to
/// attach cursors to. `on_event_added`/`on_event_removed` are hooks the bus
/// calls back into after [`UnsubscribeHandle::add_event_key`] /
/// [`UnsubscribeHandle::remove_event_key`] update the subscription's cursor
/// set — the core only needs to *signal* the interest change; reacting to
/// it is the subscriber's business, so both default to a no-op.
pub trait Subscriber: Send + Sync {
    fn identity(&self) -> &str;
    fn event_keys(&self) -> Vec<String>;
    fn on_event_added(&self, _key: &str) {}
    fn on_event_removed(&self, _key: &str) {}
}

/// The in-process message bus core.
pub struct MessageBus {
    registry: Arc<TopicRegistry>,
    engine: Arc<Engine>,
    counters: Arc<dyn CounterSink>,
    #[allow(dead_code)]
    trace: Arc<dyn TraceSink>,
    default_max_messages: usize,
}

impl MessageBus {
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let trace: Arc<dyn TraceSink> = Arc::new(TracingSink);
        let counters: Arc<dyn CounterSink> = Arc::new(AtomicCounterSink::default());
        let registry = Arc::new(TopicRegistry::new(config.store_config));
        let engine = Engine::new(
            config.engine,
            Arc::clone(&registry),
            Arc::clone(&counters),
            Arc::clone(&trace),
        );

        Self {
            registry,
            engine,
            counters,
            trace,
            default_max_messages: config.default_max_messages,
        }
    }

    /// Appends `message` to its topic's store, then schedules every current
    /// subscriber of that topic. Always completes; the bus never surfaces a
    /// publish failure to the caller.
    pub async fn publish(&self, message: Message) {
        let topic = self.registry.get_or_add(&message.key);
        topic.store().add(message);
        self.counters
            .get_counter(names::MESSAGES_PUBLISHED_TOTAL)
            .safe_increment();

        for subscription in topic.snapshot_subscribers().await {
            self.engine.schedule(subscription);
        }
    }

    /// Registers a new subscription.
    ///
    /// `cursor` is an opaque string from a prior [`UnsubscribeHandle`]'s
    /// last-seen `next_cursor`, or `None` to start fresh (id 0 for every
    /// topic in `subscriber.event_keys()`). Fails only if `cursor` doesn't
    /// decode — lazy topic creation itself never fails.
    pub async fn subscribe(
        &self,
        subscriber: Arc<dyn Subscriber>,
        cursor: Option<&str>,
        callback: Arc<dyn DeliveryCallbackBoxed>,
        max_messages: usize,
    ) -> Result<UnsubscribeHandle, CursorDecodeError> {
        let mut positions: HashMap<String, u64> = match cursor {
            Some(s) => cursor::decode(s)?
                .into_iter()
                .map(|c| (c.key, c.id))
                .collect(),
            None => HashMap::new(),
        };

        let subscription = Arc::new(Subscription::new(
            subscriber.identity().to_string(),
            callback,
            max_messages,
        ));

        let mut attached = HashMap::new();
        for key in subscriber.event_keys() {
            let topic = self.registry.get_or_add(&key);
            let id = positions.remove(&key).unwrap_or(0);
            subscription.add_or_update_cursor(key.clone(), id, Some(Arc::clone(&topic)));
            topic.add_subscriber(Arc::clone(&subscription)).await;
            attached.insert(key, topic);
        }

        self.counters.get_counter(names::SUBSCRIBERS_TOTAL).safe_increment();
        self.counters.get_counter(names::SUBSCRIBERS_CURRENT).safe_increment();

        self.engine.schedule(Arc::clone(&subscription));

        Ok(UnsubscribeHandle::new(
            subscription,
            subscriber,
            attached,
            Arc::clone(&self.registry),
            Arc::clone(&self.counters),
        ))
    }

    /// The next-id for `key` as a decimal string — anchors a fresh
    /// subscription's starting point without reading any messages.
    #[must_use]
    pub fn get_cursor(&self, key: &str) -> String {
        self.registry.cursor_value(key).to_string()
    }

    #[must_use]
    pub fn allocated_workers(&self) -> usize {
        self.engine.allocated_workers()
    }

    #[must_use]
    pub fn busy_workers(&self) -> usize {
        self.engine.busy_workers()
    }

    #[must_use]
    pub fn default_max_messages(&self) -> usize {
        self.default_max_messages
    }
}

/// An owning guard returned by [`MessageBus::subscribe`].
///
/// Dropping it (or calling [`UnsubscribeHandle::unsubscribe`] explicitly)
/// disposes the subscription and removes it from every topic it was
/// attached to. The topic registry is the sole strong owner of topics;
/// subscriptions are strongly owned by whoever holds this handle, and
/// topics hold them non-owningly through their subscriber list — this
/// teardown is what breaks the cycle before the subscription is dropped.
pub struct UnsubscribeHandle {
    subscription: Arc<Subscription>,
    subscriber: Arc<dyn Subscriber>,
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    registry: Arc<TopicRegistry>,
    counters: Arc<dyn CounterSink>,
    disposed: AtomicBool,
}

impl UnsubscribeHandle {
    fn new(
        subscription: Arc<Subscription>,
        subscriber: Arc<dyn Subscriber>,
        topics: HashMap<String, Arc<Topic>>,
        registry: Arc<TopicRegistry>,
        counters: Arc<dyn CounterSink>,
    ) -> Self {
        Self {
            subscription,
            subscriber,
            topics: Mutex::new(topics),
            registry,
            counters,
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        self.subscription.identity()
    }

    /// Adds a cursor at id 0 for `key` (creating its topic if needed),
    /// attaches the subscription to that topic, and notifies the subscriber
    /// via [`Subscriber::on_event_added`].
    pub async fn add_event_key(&self, key: &str) {
        let topic = self.registry.get_or_add(key);
        if self
            .subscription
            .add_or_update_cursor(key.to_string(), 0, Some(Arc::clone(&topic)))
        {
            topic.add_subscriber(Arc::clone(&self.subscription)).await;
            self.topics.lock().unwrap().insert(key.to_string(), topic);
        }
        self.subscriber.on_event_added(key);
    }

    /// Drops the cursor for `key` and detaches the subscription from that
    /// topic, notifying the subscriber via [`Subscriber::on_event_removed`].
    pub async fn remove_event_key(&self, key: &str) {
        self.subscription.remove_cursor(key);
        if let Some(topic) = self.topics.lock().unwrap().remove(key) {
            topic.remove_subscriber(self.subscription.identity()).await;
        }
        self.subscriber.on_event_removed(key);
    }

    /// Disposes the subscription immediately (no further callbacks fire
    /// after this returns) and removes it from every attached topic. Safe
    /// to call more than once; only the first call has effect.
    pub fn unsubscribe(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.subscription.dispose();
        self.counters.get_counter(names::SUBSCRIBERS_CURRENT).safe_decrement();

        let subscription = Arc::clone(&self.subscription);
        let topics: Vec<Arc<Topic>> = self.topics.lock().unwrap().drain().map(|(_, t)| t).collect();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                for topic in topics {
                    topic.remove_subscriber(subscription.identity()).await;
                }
            });
        }
        // With no runtime reachable (e.g. the handle is dropped during
        // process shutdown outside tokio), the subscription stays disposed
        // and simply lingers in its topics' lists: the pump observes
        // `disposed` at its next invocation and exits without re-enqueuing.
    }
}

impl Drop for UnsubscribeHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{CallbackError, DeliveryCallback, MessageResult};
    use std::sync::Mutex as StdMutex;

    struct FixedSubscriber {
        identity: String,
        keys: Vec<String>,
    }

    impl Subscriber for FixedSubscriber {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn event_keys(&self) -> Vec<String> {
            self.keys.clone()
        }
    }

    struct CollectingCallback {
        results: StdMutex<Vec<MessageResult>>,
    }

    impl CollectingCallback {
        fn new() -> Self {
            Self {
                results: StdMutex::new(Vec::new()),
            }
        }
    }

    impl DeliveryCallback for CollectingCallback {
        async fn deliver(&self, result: MessageResult) -> Result<bool, CallbackError> {
            self.results.lock().unwrap().push(result);
            Ok(true)
        }
    }

    fn small_bus() -> MessageBus {
        let mut config = BusConfig::default();
        config.store_config = msgbus_ring::StoreConfig::with_capacity(16);
        MessageBus::new(config)
    }

    #[tokio::test]
    async fn get_cursor_is_decimal_next_id() {
        let bus = small_bus();
        bus.publish(Message::new("t", "a")).await;
        bus.publish(Message::new("t", "b")).await;
        assert_eq!(bus.get_cursor("t"), "2");
        assert_eq!(bus.get_cursor("unknown"), "0");
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let bus = small_bus();
        let subscriber = Arc::new(FixedSubscriber {
            identity: "sub-3".to_string(),
            keys: vec!["t".to_string()],
        });
        let callback = Arc::new(CollectingCallback::new());
        let handle = bus
            .subscribe(subscriber, None, callback.clone(), 100)
            .await
            .unwrap();

        handle.unsubscribe();
        bus.publish(Message::new("t", "a")).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(callback.results.lock().unwrap().len(), 0);
    }
}
