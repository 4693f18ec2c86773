use std::fmt;

use serde::Serialize;

use crate::model::BackendKind;

/// Aggregated timings for one backend, as shown by `feedperf stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackendSummary {
    /// Backend the samples belong to
    pub backend: BackendKind,
    /// Number of recorded runs
    pub runs: usize,
    /// Mean download time in seconds, 0.0 without samples
    pub mean_download: f64,
    /// Mean parse time in seconds, 0.0 without samples
    pub mean_parse: f64,
    /// Mean total time in seconds, 0.0 without samples
    pub mean_total: f64,
}

impl BackendSummary {
    /// Heading line: `roxmltree (1 run):` or `roxmltree (3 runs):`.
    pub fn heading(&self) -> String {
        let noun = if self.runs == 1 { "run" } else { "runs" };
        format!("{} ({} {}):", self.backend.parser_name(), self.runs, noun)
    }
}

impl fmt::Display for BackendSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading())?;
        writeln!(f, "  Mean Download Time  {:.4}s", self.mean_download)?;
        writeln!(f, "  Mean Parse Time     {:.4}s", self.mean_parse)?;
        write!(f, "  Mean Total Time     {:.4}s", self.mean_total)
    }
}
