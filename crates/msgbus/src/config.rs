//! Bus configuration.
//!
//! Two plain structs with `Default` impls, following the same
//! `Config`/`Default`/preset-constants shape the ring crate already uses
//! rather than introducing a builder or a separate configuration
//! mechanism.

use msgbus_ring::StoreConfig;
use std::time::Duration;

/// Worker-pool tunables, read once at engine construction.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// `3 * CPU count`.
    pub max_workers: usize,
    /// `CPU count`; idle workers beyond this many self-terminate.
    pub max_idle_workers: usize,
    /// Period of the safety-net timer that reschedules every subscription.
    pub idle_check_interval: Duration,
}

impl EngineConfig {
    /// Derives the tunables from the host's available parallelism, falling
    /// back to 4 if it can't be determined — matching how this workspace's
    /// own trace pipeline already sizes its worker count.
    #[must_use]
    pub fn from_available_parallelism() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);
        Self {
            max_workers: cpus * 3,
            max_idle_workers: cpus,
            idle_check_interval: Duration::from_secs(5),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_available_parallelism()
    }
}

/// Top-level bus configuration.
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Per-topic message store sizing.
    pub store_config: StoreConfig,
    /// `maxMessages` used by `Subscribe` callers that don't specify one.
    pub default_max_messages: usize,
    pub engine: EngineConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            store_config: StoreConfig::default(),
            default_max_messages: 100,
            engine: EngineConfig::default(),
        }
    }
}
