use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use feedperf::backend::backend_for;
use feedperf::engine::{CollectingDelegate, EngineConfig, ParseEngine, RunOutcome};
use feedperf::model::BackendKind;
use feedperf::stats::StatisticsStore;
use feedperf::transport::{transport_for_url, TransportConfig};

/// Run each backend `runs` times in sequence, then print both summaries
pub fn run(
    url: String,
    runs: usize,
    database: PathBuf,
    transport_config: TransportConfig,
    engine_config: EngineConfig,
) -> Result<()> {
    if runs == 0 {
        anyhow::bail!("--runs must be at least 1");
    }

    let store = StatisticsStore::open(&database).with_context(|| {
        format!("Failed to open statistics database: {}", database.display())
    })?;
    let transport = transport_for_url(&url, &transport_config)
        .with_context(|| format!("No transport for {}", url))?;

    println!("Comparing parser backends");
    println!("=========================");
    println!("Feed: {}", url);
    println!("Runs per backend: {}", runs);
    println!();

    let mut failures = 0usize;
    for kind in BackendKind::ALL {
        let mut engine =
            ParseEngine::with_config(backend_for(kind), transport.clone(), engine_config.clone());
        for attempt in 1..=runs {
            let mut delegate = CollectingDelegate::default();
            let outcome = engine
                .run(&url, &mut delegate, &store)
                .with_context(|| format!("{} run {} did not finish", kind, attempt))?;
            match outcome {
                RunOutcome::Completed { statistic, item_count, .. } => {
                    info!(
                        "{} run {}/{}: {} items in {:.4}s",
                        kind,
                        attempt,
                        runs,
                        item_count,
                        statistic.total_duration
                    );
                    eprint!(".");
                }
                RunOutcome::Failed(error) => {
                    warn!("{} run {}/{} failed: {}", kind, attempt, runs, error);
                    failures += 1;
                    eprint!("x");
                }
            }
        }
    }
    eprintln!();

    for kind in BackendKind::ALL {
        println!("{}", store.summary(kind)?);
        println!();
    }

    store.close().context("Failed to close statistics database")?;
    if failures > 0 {
        anyhow::bail!("{} of {} runs failed", failures, runs * BackendKind::ALL.len());
    }
    Ok(())
}
