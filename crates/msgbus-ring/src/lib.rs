//! `msgbus-ring` — cache-aligned, lock-free-read retained ring buffer.
//!
//! A per-topic message store: a fixed-capacity ring of slots indexed by a
//! monotonically increasing id, where reads are non-destructive random
//! access rather than a consuming cursor. Derived from a single-producer
//! single-consumer ring buffer, generalized so that any number of readers
//! can replay any still-retained range concurrently with writers.
//!
//! # Example
//!
//! ```
//! use msgbus_ring::{RetainedRing, StoreConfig};
//!
//! let store = RetainedRing::<&'static str>::new(StoreConfig::with_capacity(5000));
//! store.add("hello");
//! store.add("world");
//!
//! let (first_id, messages) = store.get_messages(0, 100);
//! assert_eq!(first_id, 0);
//! assert_eq!(messages, vec!["hello", "world"]);
//! ```

mod config;
mod invariants;
mod metrics;
mod store;

pub use config::{StoreConfig, DEFAULT_CAPACITY};
pub use metrics::{Metrics, MetricsSnapshot};
pub use store::RetainedRing;
