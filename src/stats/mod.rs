//! # Statistics store
//!
//! Append-only timing samples keyed by backend, persisted in SQLite.
//!
//! One row is written per completed run. The store answers four questions
//! per backend (how many runs, mean download / parse / total time) and can
//! be wiped with [`StatisticsStore::reset`]. Means over zero samples are
//! `0.0`.
//!
//! The store is owned by the consumer and used from one thread only; the
//! engine borrows it when a run completes.
//!
//! ```rust,no_run
//! use feedperf::model::{BackendKind, RunStatistic};
//! use feedperf::stats::StatisticsStore;
//!
//! let store = StatisticsStore::open("stats.sqlite")?;
//! store.record(&RunStatistic {
//!     backend: BackendKind::Push,
//!     download_duration: 0.40,
//!     parse_duration: 0.05,
//!     total_duration: 0.47,
//! })?;
//! println!("{}", store.summary(BackendKind::Push)?);
//! # Ok::<(), feedperf::stats::StatsError>(())
//! ```

use std::path::Path;

use rusqlite::{params, Connection};

use crate::model::{BackendKind, RunStatistic};

mod error;
mod summary;

pub use error::StatsError;
pub use summary::BackendSummary;

/// Default database file name
pub const DEFAULT_DATABASE: &str = "stats.sqlite";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS statistic (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parser_type INTEGER NOT NULL,
    download_duration REAL NOT NULL,
    parse_duration REAL NOT NULL,
    total_duration REAL NOT NULL
)";

/// SQLite-backed sample store.
pub struct StatisticsStore {
    conn: Option<Connection>,
}

impl StatisticsStore {
    /// Open (or create) the database at `path`, creating the schema if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        log::debug!("Opening statistics database {}", path.display());
        Self::bootstrap(Connection::open(path)?)
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Result<Self, StatsError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StatsError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> Result<&Connection, StatsError> {
        self.conn.as_ref().ok_or(StatsError::Closed)
    }

    /// Append one sample. Earlier samples are never touched.
    pub fn record(&self, statistic: &RunStatistic) -> Result<(), StatsError> {
        for (name, value) in [
            ("download_duration", statistic.download_duration),
            ("parse_duration", statistic.parse_duration),
            ("total_duration", statistic.total_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StatsError::InvalidStatistic(format!("{} = {}", name, value)));
            }
        }
        let mut stmt = self.conn()?.prepare_cached(
            "INSERT INTO statistic (parser_type, download_duration, parse_duration, total_duration) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![
            statistic.backend.id(),
            statistic.download_duration,
            statistic.parse_duration,
            statistic.total_duration,
        ])?;
        Ok(())
    }

    /// Number of samples for `backend`.
    pub fn count(&self, backend: BackendKind) -> Result<usize, StatsError> {
        let mut stmt = self
            .conn()?
            .prepare_cached("SELECT COUNT(*) FROM statistic WHERE parser_type = ?1")?;
        let count: i64 = stmt.query_row(params![backend.id()], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Mean download time in seconds.
    pub fn mean_download(&self, backend: BackendKind) -> Result<f64, StatsError> {
        self.mean("SELECT AVG(download_duration) FROM statistic WHERE parser_type = ?1", backend)
    }

    /// Mean parse time in seconds.
    pub fn mean_parse(&self, backend: BackendKind) -> Result<f64, StatsError> {
        self.mean("SELECT AVG(parse_duration) FROM statistic WHERE parser_type = ?1", backend)
    }

    /// Mean total time in seconds.
    pub fn mean_total(&self, backend: BackendKind) -> Result<f64, StatsError> {
        self.mean("SELECT AVG(total_duration) FROM statistic WHERE parser_type = ?1", backend)
    }

    fn mean(&self, sql: &str, backend: BackendKind) -> Result<f64, StatsError> {
        let mut stmt = self.conn()?.prepare_cached(sql)?;
        let mean: Option<f64> = stmt.query_row(params![backend.id()], |row| row.get(0))?;
        Ok(mean.unwrap_or(0.0))
    }

    /// Count and means for `backend`.
    pub fn summary(&self, backend: BackendKind) -> Result<BackendSummary, StatsError> {
        Ok(BackendSummary {
            backend,
            runs: self.count(backend)?,
            mean_download: self.mean_download(backend)?,
            mean_parse: self.mean_parse(backend)?,
            mean_total: self.mean_total(backend)?,
        })
    }

    /// All samples for `backend`, oldest first.
    pub fn samples(&self, backend: BackendKind) -> Result<Vec<RunStatistic>, StatsError> {
        let mut stmt = self.conn()?.prepare_cached(
            "SELECT parser_type, download_duration, parse_duration, total_duration \
             FROM statistic WHERE parser_type = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![backend.id()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (id, download_duration, parse_duration, total_duration) = row?;
            let backend = BackendKind::from_id(id).ok_or(StatsError::UnknownBackend(id))?;
            samples.push(RunStatistic {
                backend,
                download_duration,
                parse_duration,
                total_duration,
            });
        }
        Ok(samples)
    }

    /// Delete every sample for every backend.
    pub fn reset(&self) -> Result<(), StatsError> {
        let deleted = self.conn()?.execute("DELETE FROM statistic", [])?;
        log::info!("Deleted {} statistic samples", deleted);
        Ok(())
    }

    /// Close the database, reporting any error SQLite returns.
    pub fn close(mut self) -> Result<(), StatsError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StatsError::Sqlite(e)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for StatisticsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsStore")
            .field("open", &self.conn.is_some())
            .finish()
    }
}
