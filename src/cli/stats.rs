use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "colorized_output")]
use console::style;

use feedperf::model::BackendKind;
use feedperf::stats::{BackendSummary, StatisticsStore};

fn open(database: &Path) -> Result<StatisticsStore> {
    StatisticsStore::open(database)
        .with_context(|| format!("Failed to open statistics database: {}", database.display()))
}

fn summaries(store: &StatisticsStore) -> Result<Vec<BackendSummary>> {
    BackendKind::ALL
        .into_iter()
        .map(|kind| store.summary(kind).context("Failed to query statistics"))
        .collect()
}

/// Print run counts and mean durations for every backend
pub fn run(database: PathBuf, json: bool) -> Result<()> {
    let store = open(&database)?;
    let summaries = summaries(&store)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialize statistics")?
        );
        return Ok(());
    }

    println!("Parser Statistics");
    println!("=================");
    println!("Database: {}", database.display());
    println!();
    for summary in &summaries {
        println!("{}", summary);
        println!();
    }
    Ok(())
}

/// Delete every recorded sample
pub fn reset(database: PathBuf) -> Result<()> {
    let store = open(&database)?;
    let before: usize = BackendKind::ALL
        .into_iter()
        .map(|kind| store.count(kind))
        .sum::<Result<usize, _>>()
        .context("Failed to query statistics")?;
    store.reset().context("Failed to reset statistics")?;
    store.close().context("Failed to close statistics database")?;

    #[cfg(feature = "colorized_output")]
    println!("{} {} samples", style("Reset:").bold().green(), before);
    #[cfg(not(feature = "colorized_output"))]
    println!("Reset: {} samples", before);
    Ok(())
}
