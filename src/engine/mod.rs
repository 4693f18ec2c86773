//! # Parse engine
//!
//! Drives one run at a time: fetch and parse on a dedicated worker thread,
//! deliver batches and lifecycle callbacks on the consumer's thread, and
//! record one [`RunStatistic`] per completed run.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐   bounded channel   ┌──────────────────────────┐
//! │ worker thread      │ ──WorkerEvent────▶  │ consumer (wait / poll)   │
//! │ backend +          │                     │ timing, FeedDelegate,    │
//! │ RunEvents (batch)  │                     │ StatisticsStore          │
//! └────────────────────┘                     └──────────────────────────┘
//! ```
//!
//! The worker owns the parse state and the pending batch; a batch crosses
//! the channel as an owned `Vec<Item>`. Every callback runs inside
//! [`ParseEngine::wait`] or [`ParseEngine::poll`], on the caller's thread.
//!
//! ## Lifecycle
//!
//! `Idle → Fetching → Parsing → Completed`, or `Fetching → Failed`. For the
//! push backend fetching and parsing overlap; the state moves to `Parsing`
//! with the first parse slice. A run only reaches `Completed` once its
//! statistic is stored; a store failure ends it as `Failed` with
//! [`RunError::Statistics`].
//!
//! ## Timing
//!
//! - download: sum of the transport waits reported by the backend
//! - parse: sum of the parser slices reported by the backend
//! - total: from [`ParseEngine::start`] to the worker's completion
//!
//! Waits and slices never overlap, so `download + parse <= total`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feedperf::prelude::*;
//!
//! struct Printer;
//!
//! impl FeedDelegate for Printer {
//!     fn on_records(&mut self, batch: Vec<Item>) {
//!         for item in batch {
//!             println!("{}", item.title.unwrap_or_default());
//!         }
//!     }
//! }
//!
//! let transport = MemoryTransport::new("<rss><item><title>Thriller</title></item></rss>");
//! let store = StatisticsStore::in_memory()?;
//! let mut engine = ParseEngine::new(backend_for(BackendKind::Push), Arc::new(transport));
//! let outcome = engine.run("memory:", &mut Printer, &store)?;
//! println!("{:?}", outcome.statistic());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::backend::{backend_for, FeedBackend, XmlSyntaxError};
use crate::model::{BackendKind, Item, RunStatistic};
use crate::stats::StatisticsStore;
use crate::transport::Transport;

mod config;
mod error;
mod events;

pub use config::{EngineConfig, DEFAULT_BATCH_THRESHOLD, DEFAULT_CHANNEL_CAPACITY};
pub use error::{EngineError, RunError};
pub use events::{RunEvents, WorkerEvent};

/// Lifecycle state of a [`ParseEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run started yet
    Idle,
    /// Waiting on the transport, nothing parsed yet
    Fetching,
    /// At least one parse slice ran
    Parsing,
    /// The last run finished and its statistic was recorded
    Completed,
    /// The last run failed
    Failed,
}

impl RunState {
    /// Whether a run is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Fetching | Self::Parsing)
    }
}

/// Receives run callbacks on the consumer thread.
pub trait FeedDelegate {
    /// A batch of items, in parse order. Never empty.
    fn on_records(&mut self, batch: Vec<Item>);

    /// The run completed; `statistic` has been recorded.
    fn on_run_complete(&mut self, _statistic: &RunStatistic) {}

    /// The run failed. No statistic was recorded.
    fn on_run_failed(&mut self, _error: &RunError) {}

    /// The backend started waiting on the transport.
    fn on_download_started(&mut self) {}

    /// The backend stopped waiting on the transport.
    fn on_download_ended(&mut self) {}

    /// The backend hit a recovered XML error.
    fn on_syntax_error(&mut self, _error: &XmlSyntaxError) {}
}

/// Delegate that keeps every delivered batch.
#[derive(Debug, Default)]
pub struct CollectingDelegate {
    /// Batches in delivery order
    pub batches: Vec<Vec<Item>>,
    /// Statistic of the completed run
    pub completed: Option<RunStatistic>,
    /// Failure message of the failed run
    pub failed: Option<String>,
    /// Download notifications seen (started, ended)
    pub downloads: (usize, usize),
}

impl CollectingDelegate {
    /// All delivered items, in order.
    pub fn items(&self) -> Vec<Item> {
        self.batches.iter().flatten().cloned().collect()
    }
}

impl FeedDelegate for CollectingDelegate {
    fn on_records(&mut self, batch: Vec<Item>) {
        self.batches.push(batch);
    }

    fn on_run_complete(&mut self, statistic: &RunStatistic) {
        self.completed = Some(*statistic);
    }

    fn on_run_failed(&mut self, error: &RunError) {
        self.failed = Some(error.to_string());
    }

    fn on_download_started(&mut self) {
        self.downloads.0 += 1;
    }

    fn on_download_ended(&mut self) {
        self.downloads.1 += 1;
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed and its statistic was recorded
    Completed {
        /// Recorded timing sample
        statistic: RunStatistic,
        /// Number of items delivered to the delegate
        item_count: usize,
        /// Recovered XML errors
        syntax_errors: Vec<XmlSyntaxError>,
    },
    /// The run failed; nothing was recorded
    Failed(RunError),
}

impl RunOutcome {
    /// The statistic of a completed run.
    pub fn statistic(&self) -> Option<&RunStatistic> {
        match self {
            Self::Completed { statistic, .. } => Some(statistic),
            Self::Failed(_) => None,
        }
    }

    /// Items delivered by a completed run; zero for a failed one.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Completed { item_count, .. } => *item_count,
            Self::Failed(_) => 0,
        }
    }
}

/// Consumer-side bookkeeping for the run in flight.
struct ActiveRun {
    receiver: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
    started_at: Instant,
    download_started_at: Option<Instant>,
    download: Duration,
    parse: Duration,
    delivered: usize,
    syntax_errors: Vec<XmlSyntaxError>,
}

impl ActiveRun {
    fn join_worker(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

/// Runs feeds through one backend and times them.
pub struct ParseEngine {
    backend: Arc<dyn FeedBackend>,
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    state: RunState,
    run: Option<ActiveRun>,
}

impl ParseEngine {
    /// Create an engine with the default configuration.
    pub fn new(backend: Arc<dyn FeedBackend>, transport: Arc<dyn Transport>) -> Self {
        Self::with_config(backend, transport, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        backend: Arc<dyn FeedBackend>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> Self {
        Self {
            backend,
            transport,
            config,
            state: RunState::Idle,
            run: None,
        }
    }

    /// Create an engine for the built-in backend `kind`.
    pub fn for_kind(kind: BackendKind, transport: Arc<dyn Transport>) -> Self {
        Self::new(backend_for(kind), transport)
    }

    /// Backend identity.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a run on a worker thread and return immediately.
    ///
    /// Fails with [`EngineError::RunInProgress`] while a run is in flight.
    /// A finished run that was never waited on is discarded.
    pub fn start(&mut self, url: &str) -> Result<(), EngineError> {
        if self.state.is_active() {
            return Err(EngineError::RunInProgress);
        }
        if let Some(mut previous) = self.run.take() {
            previous.join_worker();
        }

        let started_at = Instant::now();
        let (mut events, receiver) =
            RunEvents::channel(self.config.batch_threshold, self.config.channel_capacity);
        let backend = Arc::clone(&self.backend);
        let transport = Arc::clone(&self.transport);
        let url = url.to_string();
        let kind = backend.kind();

        log::debug!("Starting {} run for {}", kind, url);
        let handle = thread::Builder::new()
            .name(format!("feedperf-{}", kind.id()))
            .spawn(move || match backend.download_and_parse(&url, &*transport, &mut events) {
                Ok(()) => events.parse_ended(),
                Err(e) => {
                    log::error!("{} run for {} failed: {}", kind, url, e);
                    events.parse_failed(RunError::Transport(e));
                }
            })
            .map_err(|e| EngineError::WorkerSpawn(e.to_string()))?;

        self.run = Some(ActiveRun {
            receiver,
            handle: Some(handle),
            started_at,
            download_started_at: None,
            download: Duration::ZERO,
            parse: Duration::ZERO,
            delivered: 0,
            syntax_errors: Vec::new(),
        });
        self.state = RunState::Fetching;
        Ok(())
    }

    /// Block until the run in flight ends, dispatching every callback.
    pub fn wait(
        &mut self,
        delegate: &mut dyn FeedDelegate,
        store: &StatisticsStore,
    ) -> Result<RunOutcome, EngineError> {
        loop {
            let event = {
                let run = self.active_run()?;
                run.receiver.recv()
            };
            let outcome = match event {
                Ok(event) => self.dispatch(event, delegate, store)?,
                Err(_) => Some(self.worker_vanished(delegate)?),
            };
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }
    }

    /// Dispatch whatever the worker has sent so far without blocking.
    ///
    /// Returns the outcome once the run has ended.
    pub fn poll(
        &mut self,
        delegate: &mut dyn FeedDelegate,
        store: &StatisticsStore,
    ) -> Result<Option<RunOutcome>, EngineError> {
        loop {
            let event = {
                let run = self.active_run()?;
                run.receiver.try_recv()
            };
            match event {
                Ok(event) => {
                    if let Some(outcome) = self.dispatch(event, delegate, store)? {
                        return Ok(Some(outcome));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return self.worker_vanished(delegate).map(Some);
                }
            }
        }
    }

    /// Start a run and wait for it.
    pub fn run(
        &mut self,
        url: &str,
        delegate: &mut dyn FeedDelegate,
        store: &StatisticsStore,
    ) -> Result<RunOutcome, EngineError> {
        self.start(url)?;
        self.wait(delegate, store)
    }

    fn active_run(&mut self) -> Result<&mut ActiveRun, EngineError> {
        match self.run.as_mut() {
            Some(run) if self.state.is_active() => Ok(run),
            _ => Err(EngineError::NotStarted),
        }
    }

    fn dispatch(
        &mut self,
        event: WorkerEvent,
        delegate: &mut dyn FeedDelegate,
        store: &StatisticsStore,
    ) -> Result<Option<RunOutcome>, EngineError> {
        if !self.state.is_active() {
            return Err(EngineError::NotStarted);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(EngineError::NotStarted);
        };
        match event {
            WorkerEvent::DownloadStarted(at) => {
                run.download_started_at = Some(at);
                delegate.on_download_started();
            }
            WorkerEvent::DownloadEnded(at) => {
                if let Some(started) = run.download_started_at.take() {
                    run.download += at.saturating_duration_since(started);
                }
                delegate.on_download_ended();
            }
            WorkerEvent::Records(batch) => {
                self.state = RunState::Parsing;
                run.delivered += batch.len();
                delegate.on_records(batch);
            }
            WorkerEvent::ParseDuration(elapsed) => {
                self.state = RunState::Parsing;
                run.parse += elapsed;
            }
            WorkerEvent::SyntaxError(error) => {
                delegate.on_syntax_error(&error);
                run.syntax_errors.push(error);
            }
            WorkerEvent::ParseEnded(at) => return self.complete(at, delegate, store).map(Some),
            WorkerEvent::ParseFailed(error) => return Ok(Some(self.fail(error, delegate))),
        }
        Ok(None)
    }

    fn complete(
        &mut self,
        ended_at: Instant,
        delegate: &mut dyn FeedDelegate,
        store: &StatisticsStore,
    ) -> Result<RunOutcome, EngineError> {
        let kind = self.kind();
        let mut run = self.run.take().ok_or(EngineError::NotStarted)?;
        run.join_worker();

        let statistic = RunStatistic {
            backend: kind,
            download_duration: run.download.as_secs_f64(),
            parse_duration: run.parse.as_secs_f64(),
            total_duration: ended_at.saturating_duration_since(run.started_at).as_secs_f64(),
        };
        if let Err(e) = store.record(&statistic) {
            log::error!("{} run could not be recorded: {}", kind, e);
            return Ok(self.fail(RunError::Statistics(e), delegate));
        }
        self.state = RunState::Completed;
        log::info!(
            "{} run complete: {} items, download {:.4}s, parse {:.4}s, total {:.4}s",
            kind,
            run.delivered,
            statistic.download_duration,
            statistic.parse_duration,
            statistic.total_duration
        );
        delegate.on_run_complete(&statistic);

        Ok(RunOutcome::Completed {
            statistic,
            item_count: run.delivered,
            syntax_errors: run.syntax_errors,
        })
    }

    fn fail(&mut self, error: RunError, delegate: &mut dyn FeedDelegate) -> RunOutcome {
        if let Some(mut run) = self.run.take() {
            run.join_worker();
            if run.delivered > 0 {
                log::debug!("Failed run had delivered {} items", run.delivered);
            }
        }
        self.state = RunState::Failed;

        if error.is_security() && self.config.abort_on_security_error {
            log::error!("Transport security misconfiguration, aborting: {}", error);
            std::process::abort();
        }
        delegate.on_run_failed(&error);
        RunOutcome::Failed(error)
    }

    /// The channel closed without a terminal event: the worker panicked.
    fn worker_vanished(
        &mut self,
        delegate: &mut dyn FeedDelegate,
    ) -> Result<RunOutcome, EngineError> {
        let run = self.run.as_mut().ok_or(EngineError::NotStarted)?;
        if run.join_worker() {
            log::warn!("Parse worker exited without reporting an outcome");
        } else {
            log::error!("Parse worker panicked");
        }
        Ok(self.fail(RunError::WorkerPanicked, delegate))
    }
}

impl Drop for ParseEngine {
    fn drop(&mut self) {
        if let Some(ActiveRun {
            receiver, handle, ..
        }) = self.run.take()
        {
            if self.state.is_active() {
                log::warn!("ParseEngine dropped with a run in flight, waiting for the worker");
            }
            // a worker blocked on a full channel fails its next send and exits
            drop(receiver);
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for ParseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseEngine")
            .field("backend", &self.kind())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests;
