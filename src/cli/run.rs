use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

#[cfg(feature = "colorized_output")]
use console::style;

use feedperf::backend::{backend_for, XmlSyntaxError};
use feedperf::engine::{EngineConfig, FeedDelegate, ParseEngine, RunError, RunOutcome};
use feedperf::model::{BackendKind, Item, RunStatistic};
use feedperf::stats::StatisticsStore;
use feedperf::transport::{transport_for_url, TransportConfig};

/// Settings for one `feedperf run`.
pub struct RunArgs {
    pub url: String,
    pub backend: BackendKind,
    pub top: usize,
    pub database: PathBuf,
    pub transport: TransportConfig,
    pub engine: EngineConfig,
}

/// Prints progress as batches arrive and keeps the songs for the listing.
#[derive(Default)]
pub struct ProgressDelegate {
    songs: Vec<Item>,
    downloading: bool,
}

impl ProgressDelegate {
    fn into_songs(self) -> Vec<Item> {
        self.songs
    }
}

impl FeedDelegate for ProgressDelegate {
    fn on_records(&mut self, batch: Vec<Item>) {
        self.songs.extend(batch);
        eprintln!("Getting Top Songs... {}", self.songs.len());
    }

    fn on_run_complete(&mut self, statistic: &RunStatistic) {
        info!(
            "Recorded {} run: total {:.4}s",
            statistic.backend, statistic.total_duration
        );
    }

    fn on_run_failed(&mut self, error: &RunError) {
        eprintln!("{}", failure_line(&error.to_string()));
    }

    fn on_download_started(&mut self) {
        if !self.downloading {
            log::debug!("Network activity on");
        }
        self.downloading = true;
    }

    fn on_download_ended(&mut self) {
        if self.downloading {
            log::debug!("Network activity off");
        }
        self.downloading = false;
    }

    fn on_syntax_error(&mut self, error: &XmlSyntaxError) {
        eprintln!("{}", warning_line(&error.to_string()));
    }
}

/// Download and parse the feed once, then print the songs and the timing sample
pub fn run(args: RunArgs) -> Result<()> {
    info!("Parsing {} with the {} backend", args.url, args.backend);

    let store = StatisticsStore::open(&args.database).with_context(|| {
        format!(
            "Failed to open statistics database: {}",
            args.database.display()
        )
    })?;
    let transport = transport_for_url(&args.url, &args.transport)
        .with_context(|| format!("No transport for {}", args.url))?;
    let mut engine = ParseEngine::with_config(backend_for(args.backend), transport, args.engine);

    let mut delegate = ProgressDelegate::default();
    let outcome = engine
        .run(&args.url, &mut delegate, &store)
        .context("Parse run did not finish")?;

    match outcome {
        RunOutcome::Completed {
            statistic,
            syntax_errors,
            ..
        } => {
            let songs = delegate.into_songs();
            print!("{}", render_songs(&songs, args.top));
            println!();
            print!("{}", render_statistic(&statistic));
            if !syntax_errors.is_empty() {
                println!("  Recovered XML errors: {}", syntax_errors.len());
            }
            store.close().context("Failed to close statistics database")?;
            Ok(())
        }
        RunOutcome::Failed(error) => Err(error).context("Feed run failed"),
    }
}

/// Title line plus the first `top` songs with their details.
pub fn render_songs(songs: &[Item], top: usize) -> String {
    let mut output = String::new();
    let title = format!("Top {} Songs", songs.len());
    output.push_str(&format!("{}\n", heading(&title)));
    output.push_str(&format!("{}\n", "=".repeat(title.len())));

    for (rank, song) in songs.iter().take(top).enumerate() {
        output.push_str(&format!(
            "{:3}. {}\n",
            rank + 1,
            song.title.as_deref().unwrap_or("<untitled>")
        ));
        for line in song.details().to_string().lines() {
            output.push_str(&format!("       {}\n", line));
        }
    }
    if songs.len() > top {
        output.push_str(&format!("     ... and {} more\n", songs.len() - top));
    }
    output
}

fn render_statistic(statistic: &RunStatistic) -> String {
    format!(
        "{} ({})\n  Download Time  {:.4}s\n  Parse Time     {:.4}s\n  Total Time     {:.4}s\n",
        heading("Run Timing"),
        statistic.backend,
        statistic.download_duration,
        statistic.parse_duration,
        statistic.total_duration
    )
}

#[cfg(feature = "colorized_output")]
fn heading(text: &str) -> String {
    style(text).bold().cyan().to_string()
}

#[cfg(not(feature = "colorized_output"))]
fn heading(text: &str) -> String {
    text.to_string()
}

#[cfg(feature = "colorized_output")]
fn warning_line(text: &str) -> String {
    format!("{}: {}", style("WARNING").yellow().bold(), text)
}

#[cfg(not(feature = "colorized_output"))]
fn warning_line(text: &str) -> String {
    format!("WARNING: {}", text)
}

#[cfg(feature = "colorized_output")]
fn failure_line(text: &str) -> String {
    format!("{}: {}", style("FAILED").red().bold(), text)
}

#[cfg(not(feature = "colorized_output"))]
fn failure_line(text: &str) -> String {
    format!("FAILED: {}", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn song(title: &str) -> Item {
        Item {
            title: Some(title.to_string()),
            artist: Some("Artist".to_string()),
            album: Some("Album".to_string()),
            category: Some("Pop".to_string()),
            release_date: NaiveDate::from_ymd_opt(2024, 3, 19),
        }
    }

    fn plain(text: String) -> String {
        #[cfg(feature = "colorized_output")]
        {
            console::strip_ansi_codes(&text).to_string()
        }
        #[cfg(not(feature = "colorized_output"))]
        {
            text
        }
    }

    #[test]
    fn test_render_songs_limits_listing() {
        let songs = vec![song("One"), song("Two"), song("Three")];
        let text = plain(render_songs(&songs, 2));
        assert!(text.contains("Top 3 Songs"));
        assert!(text.contains("  1. One"));
        assert!(text.contains("  2. Two"));
        assert!(!text.contains("3. Three"));
        assert!(text.contains("released: Mar 19, 2024"));
        assert!(text.contains("... and 1 more"));
    }

    #[test]
    fn test_render_empty() {
        let text = plain(render_songs(&[], 10));
        assert!(text.starts_with("Top 0 Songs"));
    }
}
