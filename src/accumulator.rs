//! Character data accumulation.
//!
//! Character data for one element can arrive in several pieces (the push
//! backend may even split a multi-byte UTF-8 sequence across two chunks), so
//! raw bytes are collected and only decoded when the element closes.

/// Growable byte buffer for the text of the currently open field.
#[derive(Debug, Default)]
pub struct CharacterBuffer {
    bytes: Vec<u8>,
}

impl CharacterBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Append bytes in arrival order.
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Decode the accumulated bytes as UTF-8 and empty the buffer.
    ///
    /// Invalid sequences are replaced with U+FFFD. The allocation is kept for
    /// the next element.
    pub fn drain_as_text(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        self.bytes.clear();
        text
    }

    /// Discard accumulated bytes without decoding them.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
