/// Errors produced while fetching a feed
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection-level failure (DNS, refused, reset, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The transport's trust policy forbids this request
    ///
    /// This is a misconfiguration rather than a transient failure: retrying
    /// will never succeed.
    #[error("Transport security configuration error: {0}")]
    SecurityConfiguration(String),

    /// The server answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// I/O error while reading the payload
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No transport handles this URL
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
}

impl TransportError {
    /// Whether this is the fatal security-configuration class.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::SecurityConfiguration(_))
    }
}
