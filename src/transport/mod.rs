//! # Feed transport
//!
//! The engine never talks to the network directly. A [`Transport`] turns a
//! URL into a [`ChunkStream`]: an iterator of owned byte chunks that ends
//! with `None` on success or yields an `Err` on failure. Opening may also
//! fail immediately.
//!
//! Backends decide how to consume the stream: the event-tree backend
//! collects it into one buffer with [`Transport::fetch_all`], the push
//! backend parses each chunk as it arrives.
//!
//! ## Implementations
//!
//! - [`FileTransport`]: `file://` URLs and bare paths, read in chunks
//! - [`MemoryTransport`]: in-memory payloads with scripted failures, for
//!   tests and embedding
//! - [`HttpTransport`]: `http://` and `https://` via `ureq` (feature `http`)

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

pub use error::TransportError;
pub use file::FileTransport;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use memory::{MemoryTransport, ScriptedFailure};

mod error;
mod file;
#[cfg(feature = "http")]
mod http;
mod memory;

/// Default read size for chunked transports (16 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Stream of payload chunks. `None` marks successful completion.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Bytes, TransportError>> + Send>;

/// Fetch collaborator used by the backends.
pub trait Transport: Send + Sync {
    /// Start fetching `url`.
    fn open(&self, url: &str) -> Result<ChunkStream, TransportError>;

    /// Fetch the whole payload into one buffer.
    fn fetch_all(&self, url: &str) -> Result<Bytes, TransportError> {
        let mut body = BytesMut::new();
        for chunk in self.open(url)? {
            body.extend_from_slice(&chunk?);
        }
        Ok(body.freeze())
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open(&self, url: &str) -> Result<ChunkStream, TransportError> {
        (**self).open(url)
    }

    fn fetch_all(&self, url: &str) -> Result<Bytes, TransportError> {
        (**self).fetch_all(url)
    }
}

/// Settings shared by the concrete transports
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum size of one chunk handed to the push backend
    pub chunk_size: usize,
    /// Connection timeout for network transports
    pub connect_timeout: Duration,
    /// Read timeout for network transports
    pub read_timeout: Duration,
    /// Refuse plain-HTTP URLs
    pub https_only: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            https_only: false,
        }
    }
}

/// Pick a transport for `url` based on its scheme.
///
/// `http://` and `https://` go to [`HttpTransport`]; `file://` URLs and
/// anything without a scheme go to [`FileTransport`].
pub fn transport_for_url(
    url: &str,
    config: &TransportConfig,
) -> Result<Arc<dyn Transport>, TransportError> {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        #[cfg(feature = "http")]
        {
            return Ok(Arc::new(HttpTransport::new(config.clone())));
        }
        #[cfg(not(feature = "http"))]
        {
            return Err(TransportError::UnsupportedUrl(format!(
                "{} (built without the http feature)",
                url
            )));
        }
    }
    if lower.starts_with("file://") || !lower.contains("://") {
        return Ok(Arc::new(FileTransport::new(config.chunk_size)));
    }
    Err(TransportError::UnsupportedUrl(url.to_string()))
}

/// Adapts any [`Read`] into a [`ChunkStream`] of at most `chunk_size` bytes per item.
pub struct ReadChunks<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReadChunks<R> {
    /// Wrap `reader`. A `chunk_size` of zero is treated as one byte.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = Result<Bytes, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(Bytes::from(buf)));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(TransportError::Io(e)));
                }
            }
        }
    }
}
