//! # feedperf
//!
//! Command-line front end: download a feed with either parser backend,
//! list the parsed songs, and inspect the recorded timing statistics.
//!
//! ## Usage
//!
//! ```bash
//! # Parse the default feed with the push backend
//! feedperf run
//!
//! # Parse a local file with the event-tree backend
//! feedperf run feeds/top.xml --backend event-tree
//!
//! # Three runs per backend, then both summaries
//! feedperf compare --runs 3
//!
//! # Show or clear the statistics
//! feedperf stats
//! feedperf reset
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    cli::init_logging(cli.verbosity());

    cli::dispatch(cli)
}
