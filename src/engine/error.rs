use crate::stats::StatsError;
use crate::transport::TransportError;

/// Why a run ended in the failed state. Delivered to the consumer.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The fetch failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The worker thread died without reporting an outcome
    #[error("Parse worker panicked")]
    WorkerPanicked,

    /// The run finished but its statistic could not be written
    #[error("Statistics error: {0}")]
    Statistics(#[source] StatsError),
}

impl RunError {
    /// Whether this failure is the fatal security-configuration class.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_security())
    }
}

/// Errors from driving a [`ParseEngine`](super::ParseEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `start` was called while a run is still fetching or parsing
    #[error("A run is already in progress")]
    RunInProgress,

    /// `wait` or `poll` was called with no run in flight
    #[error("No run has been started")]
    NotStarted,

    /// The worker thread could not be spawned
    #[error("Failed to spawn parse worker: {0}")]
    WorkerSpawn(String),

}
