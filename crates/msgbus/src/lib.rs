//! `msgbus` — in-process message bus core for a real-time signaling
//! library.
//!
//! Publishers write messages keyed by a topic name; subscribers register
//! interest in one or more topic keys and receive ordered batches via an
//! async delivery callback. A bounded per-topic ring buffer
//! ([`msgbus_ring::RetainedRing`]) lets a briefly-disconnected subscriber
//! resume from an opaque cursor token, provided it reconnects before the
//! buffer wraps.
//!
//! Five pieces, leaves first: the [`msgbus_ring`] message store, the
//! [`cursor`] codec, the [`topic`] registry, the [`subscription`] state
//! machine and pump loop, and the [`engine`] worker-pool scheduler.
//! [`MessageBus`] wires them into the public facade.
//!
//! Out of scope here, as in the library this crate is part of: transport,
//! connection and HTTP handling, identity/auth/grouping, and DI plumbing —
//! all external collaborators the bus is consumed by, not the other way
//! around.

pub mod bus;
pub mod config;
pub mod counters;
pub mod cursor;
pub mod delivery;
pub mod engine;
pub mod message;
pub mod subscription;
pub mod topic;
pub mod trace;

pub use bus::{MessageBus, Subscriber, UnsubscribeHandle};
pub use config::{BusConfig, EngineConfig};
pub use counters::{names as counter_names, AtomicCounterSink, Counter, CounterSink};
pub use cursor::{decode, encode, CursorDecodeError, CursorEntry, DecodedCursor};
pub use delivery::{CallbackError, DeliveryCallback, DeliveryCallbackBoxed, MessageResult};
pub use message::Message;
pub use trace::{TraceSink, TracingSink};
