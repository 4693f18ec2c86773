/// Errors from the statistics store
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sample with a negative or non-finite duration
    #[error("Invalid statistic: {0}")]
    InvalidStatistic(String),

    /// A stored row references a backend id this build does not know
    #[error("Unknown backend id {0}")]
    UnknownBackend(i64),

    /// The store was already closed
    #[error("Statistics store is closed")]
    Closed,
}
