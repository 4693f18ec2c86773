/// Default number of items held before a batch is flushed
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;

/// Default capacity of the worker -> consumer channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for a [`ParseEngine`](super::ParseEngine)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A batch is flushed as soon as it holds more than this many items
    pub batch_threshold: usize,

    /// Capacity of the bounded channel between worker and consumer.
    /// The worker blocks once this many events are waiting.
    pub channel_capacity: usize,

    /// Terminate the process on a transport security-configuration error
    /// instead of reporting a failed run
    pub abort_on_security_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            abort_on_security_error: false,
        }
    }
}

impl EngineConfig {
    /// Set the batch threshold.
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    /// Abort the process on security-configuration errors.
    pub fn with_abort_on_security_error(mut self, abort: bool) -> Self {
        self.abort_on_security_error = abort;
        self
    }
}
