//! The delivery callback contract, and the batch handed to it.
//!
//! Generalizes the exporter trait pair used elsewhere in this workspace for
//! "give me an async sink for a batch of domain objects, and let me box it
//! for dynamic dispatch": a plain `async fn` trait for implementers, plus a
//! boxed-future, object-safe twin so a subscription can hold
//! `Arc<dyn DeliveryCallbackBoxed>` without knowing the concrete type.

use crate::message::Message;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// One delivery: a concatenated batch of messages plus the cursor string
/// that should be persisted to resume after it.
///
/// `next_cursor` is produced even when `items` is empty — a cursor must
/// round-trip past an overwritten range even when nothing new was
/// delivered, so the caller's position still advances.
#[derive(Debug, Clone)]
pub struct MessageResult {
    pub items: Vec<Message>,
    pub next_cursor: String,
    pub total_count: usize,
}

/// Opaque wrapper around whatever error a callback implementation raises.
///
/// The original specification treats a callback fault as an untyped
/// exception; this keeps that shape while still giving implementers a real
/// `std::error::Error` to report.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Implemented by delivery callbacks.
///
/// Returns `Ok(true)` to keep the subscription running, `Ok(false)` to stop
/// it (the subscription is disposed and one terminal cursor-only result is
/// delivered), or `Err` to fault the pump for this invocation.
pub trait DeliveryCallback: Send + Sync {
    fn deliver(
        &self,
        result: MessageResult,
    ) -> impl Future<Output = Result<bool, CallbackError>> + Send;
}

/// Object-safe twin of [`DeliveryCallback`], used internally so a
/// subscription can hold `Arc<dyn DeliveryCallbackBoxed>`.
pub trait DeliveryCallbackBoxed: Send + Sync {
    fn deliver_boxed(
        &self,
        result: MessageResult,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CallbackError>> + Send + '_>>;
}

impl<T: DeliveryCallback> DeliveryCallbackBoxed for T {
    fn deliver_boxed(
        &self,
        result: MessageResult,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CallbackError>> + Send + '_>> {
        Box::pin(self.deliver(result))
    }
}
