//! Leveled string-logger sink consumed by the core.
//!
//! The trace sink is an external collaborator consumed by the core — a
//! small leveled string logger; this module gives it a concrete default
//! backed by `tracing`, matching the rest of the workspace. Engine/pump/
//! registry code also emits structured `tracing` events directly in
//! addition to calling the sink, the same way the workspace's span
//! pipeline layers structured logging under an explicit metrics/trace
//! trait.

/// A small leveled string logger, consumed (not designed) by the core.
pub trait TraceSink: Send + Sync {
    fn trace(&self, msg: &str);
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Default [`TraceSink`] backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn trace(&self, msg: &str) {
        tracing::trace!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}
