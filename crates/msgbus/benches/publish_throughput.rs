use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgbus::{BusConfig, CallbackError, DeliveryCallback, Message, MessageBus, MessageResult, Subscriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;

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

struct CountingCallback {
    seen: Arc<AtomicUsize>,
}

impl DeliveryCallback for CountingCallback {
    async fn deliver(&self, result: MessageResult) -> Result<bool, CallbackError> {
        self.seen.fetch_add(result.items.len(), Ordering::Relaxed);
        Ok(true)
    }
}

/// Publish-only throughput: one topic, no subscribers, store writes alone.
fn bench_publish_no_subscribers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("publish");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("no_subscribers", |b| {
        b.to_async(&rt).iter(|| async {
            let bus = MessageBus::new(BusConfig::default());
            for i in 0..10_000u64 {
                bus.publish(Message::new("t", i.to_le_bytes().to_vec())).await;
            }
        });
    });

    group.finish();
}

/// Publish-to-fanout throughput as subscriber count grows, each scheduled
/// onto the adaptive worker pool per publish.
fn bench_publish_with_fanout(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("publish_fanout");

    for subscriber_count in [1usize, 16, 64] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            &subscriber_count,
            |b, &subscriber_count| {
                b.to_async(&rt).iter(|| async move {
                    let bus = MessageBus::new(BusConfig::default());
                    let seen = Arc::new(AtomicUsize::new(0));
                    let mut handles = Vec::new();
                    for i in 0..subscriber_count {
                        let subscriber = Arc::new(FixedSubscriber {
                            identity: format!("sub-{i}"),
                            keys: vec!["t".to_string()],
                        });
                        let callback = Arc::new(CountingCallback {
                            seen: Arc::clone(&seen),
                        });
                        handles.push(bus.subscribe(subscriber, None, callback, 100).await.unwrap());
                    }

                    for n in 0..1000u64 {
                        bus.publish(Message::new("t", n.to_le_bytes().to_vec())).await;
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_publish_no_subscribers, bench_publish_with_fanout);
criterion_main!(benches);
