use std::thread;
use std::time::Duration;

use bytes::Bytes;

use super::{ChunkStream, Transport, TransportError};

/// Scripted failure for [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Fail with [`TransportError::Network`]
    Network(String),
    /// Fail with [`TransportError::SecurityConfiguration`]
    Security(String),
    /// Fail with [`TransportError::Status`]
    Status(u16),
}

impl ScriptedFailure {
    fn to_error(&self) -> TransportError {
        match self {
            Self::Network(message) => TransportError::Network(message.clone()),
            Self::Security(message) => TransportError::SecurityConfiguration(message.clone()),
            Self::Status(code) => TransportError::Status(*code),
        }
    }
}

/// Serves a fixed payload from memory.
///
/// The payload is split into chunks at the configured boundaries, optionally
/// with a delay before each chunk and a failure at open time or after a given
/// number of chunks. The URL passed to [`Transport::open`] is ignored.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    chunks: Vec<Bytes>,
    delay: Duration,
    fail_on_open: Option<ScriptedFailure>,
    fail_after: Option<(usize, ScriptedFailure)>,
}

impl MemoryTransport {
    /// Serve `payload` as a single chunk.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let chunks = if payload.is_empty() {
            Vec::new()
        } else {
            vec![payload]
        };
        Self::from_chunks(chunks)
    }

    /// Serve exactly these chunks, in order.
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
            fail_on_open: None,
            fail_after: None,
        }
    }

    /// A transport whose `open` always fails.
    pub fn failing(failure: ScriptedFailure) -> Self {
        Self::from_chunks(Vec::<Bytes>::new()).fail_on_open(failure)
    }

    /// Re-split the payload into chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let payload: Vec<u8> = self.chunks.iter().flat_map(|c| c.iter().copied()).collect();
        let payload = Bytes::from(payload);
        self.chunks = (0..payload.len())
            .step_by(chunk_size)
            .map(|start| payload.slice(start..(start + chunk_size).min(payload.len())))
            .collect();
        self
    }

    /// Sleep for `delay` before delivering each chunk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail when the stream is opened.
    pub fn fail_on_open(mut self, failure: ScriptedFailure) -> Self {
        self.fail_on_open = Some(failure);
        self
    }

    /// Fail after `chunks` chunks have been delivered.
    pub fn fail_after(mut self, chunks: usize, failure: ScriptedFailure) -> Self {
        self.fail_after = Some((chunks, failure));
        self
    }

    /// Number of chunks that will be served.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, _url: &str) -> Result<ChunkStream, TransportError> {
        if let Some(failure) = &self.fail_on_open {
            return Err(failure.to_error());
        }
        Ok(Box::new(MemoryChunks {
            chunks: self.chunks.clone().into_iter(),
            delay: self.delay,
            delivered: 0,
            fail_after: self.fail_after.clone(),
        }))
    }
}

struct MemoryChunks {
    chunks: std::vec::IntoIter<Bytes>,
    delay: Duration,
    delivered: usize,
    fail_after: Option<(usize, ScriptedFailure)>,
}

impl Iterator for MemoryChunks {
    type Item = Result<Bytes, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Some((after, failure)) = &self.fail_after {
            if self.delivered >= *after {
                let error = failure.to_error();
                self.fail_after = None;
                self.chunks = Vec::new().into_iter();
                return Some(Err(error));
            }
        }
        let chunk = self.chunks.next()?;
        self.delivered += 1;
        Some(Ok(chunk))
    }
}
