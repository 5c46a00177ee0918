/// Configuration for a [`crate::RetainedRing`].
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Fixed slot count. Not required to be a power of two — the store indexes
    /// by `id % capacity` rather than a bitmask, since the message-bus default
    /// (5000) is not one.
    pub capacity: usize,
    /// Enable message-count metrics (negligible overhead; on by default).
    pub enable_metrics: bool,
}

/// Default per-topic message store capacity, per the bus specification.
pub const DEFAULT_CAPACITY: usize = 5000;

impl StoreConfig {
    /// Creates a new configuration with a custom capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");
        Self {
            capacity,
            enable_metrics,
        }
    }

    /// Creates a configuration with the given capacity and default metrics
    /// setting (enabled).
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, true)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
