//! TOML configuration file support.
//!
//! Settings that would otherwise be repeated on every invocation can live in
//! a config file passed with `--config`:
//!
//! ```toml
//! # feedperf.toml
//! [feed]
//! url = "https://example.com/rss.xml"
//!
//! [engine]
//! batch_threshold = 10
//!
//! [transport]
//! chunk_size = 16384
//! connect_timeout_secs = 10
//! read_timeout_secs = 30
//! https_only = true
//!
//! [statistics]
//! database = "stats.sqlite"
//! ```
//!
//! Command-line flags override file values, which override the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use feedperf::engine::EngineConfig;
use feedperf::stats::DEFAULT_DATABASE;
use feedperf::transport::TransportConfig;

/// Feed the binary downloads when neither the command line nor the config names one.
pub const DEFAULT_FEED_URL: &str =
    "http://ax.phobos.apple.com.edgesuite.net/WebObjects/MZStore.woa/wpa/MRSS/newreleases/limit=300/rss.xml";

/// Root configuration structure for feedperf.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Feed location.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSection,

    /// Transport tuning.
    #[serde(default)]
    pub transport: TransportSection,

    /// Statistics database.
    #[serde(default)]
    pub statistics: StatisticsSection,
}

/// `[feed]`
#[derive(Debug, Default, Deserialize)]
pub struct FeedConfig {
    /// URL or path of the feed.
    pub url: Option<String>,
}

/// `[engine]`
#[derive(Debug, Default, Deserialize)]
pub struct EngineSection {
    /// Flush a batch once it holds more than this many items.
    pub batch_threshold: Option<usize>,
}

/// `[transport]`
#[derive(Debug, Default, Deserialize)]
pub struct TransportSection {
    /// Maximum chunk size handed to the push backend.
    pub chunk_size: Option<usize>,

    /// Connection timeout in seconds.
    pub connect_timeout_secs: Option<u64>,

    /// Read timeout in seconds.
    pub read_timeout_secs: Option<u64>,

    /// Refuse plain-HTTP URLs.
    pub https_only: Option<bool>,
}

/// `[statistics]`
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsSection {
    /// SQLite database file.
    pub database: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Feed URL, preferring `flag`.
    pub fn feed_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.feed.url.clone())
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string())
    }

    /// Database path, preferring `flag`.
    pub fn database(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.statistics.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    /// Engine settings, with `batch_threshold` overriding the file.
    pub fn engine_config(&self, batch_threshold: Option<usize>) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(threshold) = batch_threshold.or(self.engine.batch_threshold) {
            config = config.with_batch_threshold(threshold);
        }
        config
    }

    /// Transport settings, with the flags overriding the file.
    pub fn transport_config(&self, chunk_size: Option<usize>, https_only: bool) -> TransportConfig {
        let mut config = TransportConfig::default();
        if let Some(size) = chunk_size.or(self.transport.chunk_size) {
            config.chunk_size = size;
        }
        if let Some(secs) = self.transport.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.transport.read_timeout_secs {
            config.read_timeout = Duration::from_secs(secs);
        }
        config.https_only = https_only || self.transport.https_only.unwrap_or(false);
        config
    }
}
