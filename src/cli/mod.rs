use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use feedperf::model::BackendKind;

mod compare;
mod config;
mod run;
mod stats;

pub use config::Config;

/// feedperf - download an XML feed and compare parser backend timings
#[derive(Parser)]
#[command(name = "feedperf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Statistics database (defaults to stats.sqlite)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Verbosity count from `-v` flags
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

/// Parser backend selection.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum BackendArg {
    /// Whole payload parsed into a roxmltree document
    EventTree,
    /// Chunks pushed into a streaming quick-xml parser
    #[default]
    Push,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::EventTree => BackendKind::EventTree,
            BackendArg::Push => BackendKind::Push,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download and parse a feed once, then print the songs
    Run {
        /// Feed URL or path (defaults to the config file or the iTunes new releases feed)
        #[arg(value_name = "URL")]
        url: Option<String>,

        /// Parser backend
        #[arg(short = 'b', long, default_value = "push", value_enum)]
        backend: BackendArg,

        /// Number of songs to list after the run
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,

        /// Refuse plain-HTTP URLs
        #[arg(long)]
        https_only: bool,

        /// Abort the process on a transport security failure
        #[arg(long)]
        abort_on_security_error: bool,

        // === Advanced tuning flags (hidden from --help) ===
        /// Read size for chunked transports in bytes
        #[arg(long, hide = true)]
        chunk_size: Option<usize>,

        /// Flush a batch once it holds more than this many items
        #[arg(long, hide = true)]
        batch_threshold: Option<usize>,
    },

    /// Run every backend several times and print both summaries
    Compare {
        /// Feed URL or path
        #[arg(value_name = "URL")]
        url: Option<String>,

        /// Runs per backend
        #[arg(short = 'r', long, default_value_t = 3)]
        runs: usize,

        /// Refuse plain-HTTP URLs
        #[arg(long)]
        https_only: bool,

        /// Read size for chunked transports in bytes
        #[arg(long, hide = true)]
        chunk_size: Option<usize>,
    },

    /// Show per-backend run counts and mean durations
    Stats {
        /// Print the summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every recorded statistic
    Reset,
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let database = config.database(cli.database);

    match cli.command {
        Commands::Run {
            url,
            backend,
            top,
            https_only,
            abort_on_security_error,
            chunk_size,
            batch_threshold,
        } => run::run(run::RunArgs {
            url: config.feed_url(url),
            backend: BackendKind::from(backend),
            top,
            database,
            transport: config.transport_config(chunk_size, https_only),
            engine: config
                .engine_config(batch_threshold)
                .with_abort_on_security_error(abort_on_security_error),
        }),
        Commands::Compare {
            url,
            runs,
            https_only,
            chunk_size,
        } => compare::run(
            config.feed_url(url),
            runs,
            database,
            config.transport_config(chunk_size, https_only),
            config.engine_config(None),
        ),
        Commands::Stats { json } => stats::run(database, json),
        Commands::Reset => stats::reset(database),
    }
}
