use std::fs::File;
use std::path::PathBuf;

use super::{ChunkStream, ReadChunks, Transport, TransportError};

/// Reads feeds from the local filesystem in fixed-size chunks.
///
/// Accepts `file://` URLs and bare paths.
#[derive(Debug, Clone)]
pub struct FileTransport {
    chunk_size: usize,
}

impl FileTransport {
    /// Create a file transport producing chunks of at most `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    fn path_for(url: &str) -> PathBuf {
        let path = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("FILE://"))
            .unwrap_or(url);
        PathBuf::from(path)
    }
}

impl Transport for FileTransport {
    fn open(&self, url: &str) -> Result<ChunkStream, TransportError> {
        let path = Self::path_for(url);
        log::debug!("Opening feed file {}", path.display());
        let file = File::open(&path)?;
        Ok(Box::new(ReadChunks::new(file, self.chunk_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_file_in_chunks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<rss><channel/></rss>").unwrap();
        let url = format!("file://{}", file.path().display());

        let transport = FileTransport::new(5);
        let chunks: Vec<_> = transport
            .open(&url)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(
            transport.fetch_all(&file.path().display().to_string()).unwrap().len(),
            21
        );
    }

    #[test]
    fn test_missing_file_fails_on_open() {
        let transport = FileTransport::new(1024);
        assert!(matches!(
            transport.open("/definitely/not/here.xml"),
            Err(TransportError::Io(_))
        ));
    }
}
