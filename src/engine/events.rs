//! Worker half of a run: the hooks backends call while fetching and parsing.
//!
//! Everything a backend reports is turned into a [`WorkerEvent`] and sent to
//! the consumer over a channel. The pending batch lives here, on the worker,
//! and crosses the channel as an owned `Vec<Item>` once it grows past the
//! threshold or the run ends.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::backend::XmlSyntaxError;
use crate::model::Item;

use super::error::RunError;

/// Message from the worker to the consumer.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The backend began waiting on the transport
    DownloadStarted(Instant),
    /// The backend stopped waiting on the transport
    DownloadEnded(Instant),
    /// A flushed batch, in parse order. Never empty.
    Records(Vec<Item>),
    /// Time spent inside one parser call
    ParseDuration(Duration),
    /// Recovered XML error; the run goes on
    SyntaxError(XmlSyntaxError),
    /// Terminal: the run completed at this instant
    ParseEnded(Instant),
    /// Terminal: the run failed
    ParseFailed(RunError),
}

impl WorkerEvent {
    /// Whether this is the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ParseEnded(_) | Self::ParseFailed(_))
    }
}

/// Sender side of a run, handed to [`FeedBackend::download_and_parse`].
///
/// Sends never fail from the backend's point of view: if the consumer went
/// away the events are dropped.
///
/// [`FeedBackend::download_and_parse`]: crate::backend::FeedBackend::download_and_parse
pub struct RunEvents {
    sender: Sender<WorkerEvent>,
    batch: Vec<Item>,
    batch_threshold: usize,
    items_parsed: usize,
}

impl RunEvents {
    /// Wrap a sender. Batches are flushed once they hold more than `batch_threshold` items.
    pub fn new(sender: Sender<WorkerEvent>, batch_threshold: usize) -> Self {
        Self {
            sender,
            batch: Vec::with_capacity(batch_threshold + 1),
            batch_threshold,
            items_parsed: 0,
        }
    }

    /// Create a connected pair with a channel of `capacity` messages.
    pub fn channel(batch_threshold: usize, capacity: usize) -> (Self, Receiver<WorkerEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self::new(sender, batch_threshold), receiver)
    }

    /// Mark the start of a transport wait.
    pub fn download_started(&mut self) {
        self.send(WorkerEvent::DownloadStarted(Instant::now()));
    }

    /// Mark the end of a transport wait.
    pub fn download_ended(&mut self) {
        self.send(WorkerEvent::DownloadEnded(Instant::now()));
    }

    /// Append a finished item to the pending batch, flushing when it exceeds the threshold.
    pub fn item_parsed(&mut self, item: Item) {
        self.batch.push(item);
        self.items_parsed += 1;
        if self.batch.len() > self.batch_threshold {
            self.flush();
        }
    }

    /// Add time spent strictly inside a parser call.
    pub fn add_parse_duration(&mut self, elapsed: Duration) {
        self.send(WorkerEvent::ParseDuration(elapsed));
    }

    /// Report a recovered syntax error.
    pub fn syntax_error(&mut self, error: XmlSyntaxError) {
        log::warn!("{}", error);
        self.send(WorkerEvent::SyntaxError(error));
    }

    /// Number of items parsed so far in this run.
    pub fn items_parsed(&self) -> usize {
        self.items_parsed
    }

    /// Flush what is left and send the completion marker.
    pub(crate) fn parse_ended(mut self) {
        self.flush();
        self.send(WorkerEvent::ParseEnded(Instant::now()));
    }

    /// Drop the unflushed batch and send the failure.
    pub(crate) fn parse_failed(mut self, error: RunError) {
        if !self.batch.is_empty() {
            log::debug!("Dropping {} unflushed items of a failed run", self.batch.len());
            self.batch.clear();
        }
        self.send(WorkerEvent::ParseFailed(error));
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_threshold + 1));
        log::debug!("Flushing batch of {} items", batch.len());
        self.send(WorkerEvent::Records(batch));
    }

    fn send(&self, event: WorkerEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Run consumer is gone, dropping event");
        }
    }
}
