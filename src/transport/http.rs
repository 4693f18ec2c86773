use super::{ChunkStream, ReadChunks, Transport, TransportConfig, TransportError};

/// HTTP(S) transport backed by a shared `ureq` agent.
///
/// With `https_only` set, plain-HTTP URLs are refused up front with
/// [`TransportError::SecurityConfiguration`].
pub struct HttpTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl HttpTransport {
    /// Build the agent from `config`.
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .build();
        Self { agent, config }
    }

    fn check_policy(&self, url: &str) -> Result<(), TransportError> {
        if self.config.https_only && !url.to_ascii_lowercase().starts_with("https://") {
            return Err(TransportError::SecurityConfiguration(format!(
                "plain HTTP is not allowed: {}",
                url
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn map_ureq_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Status(code, _) => TransportError::Status(code),
        ureq::Error::Transport(transport) => match transport.kind() {
            ureq::ErrorKind::InsecureRequestHttpsOnly => {
                TransportError::SecurityConfiguration(transport.to_string())
            }
            _ => TransportError::Network(transport.to_string()),
        },
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<ChunkStream, TransportError> {
        self.check_policy(url)?;
        log::debug!("GET {}", url);
        let response = self.agent.get(url).call().map_err(map_ureq_error)?;
        log::debug!(
            "{} answered {} ({})",
            url,
            response.status(),
            response.content_type()
        );
        Ok(Box::new(ReadChunks::new(
            response.into_reader(),
            self.config.chunk_size,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_only_refuses_plain_http() {
        let transport = HttpTransport::new(TransportConfig {
            https_only: true,
            ..TransportConfig::default()
        });
        match transport.open("http://example.com/rss.xml") {
            Err(e) => assert!(e.is_security()),
            Ok(_) => panic!("plain HTTP must be refused"),
        }
    }

    #[test]
    fn test_plain_http_allowed_by_default() {
        let transport = HttpTransport::new(TransportConfig::default());
        assert!(transport.check_policy("http://example.com/rss.xml").is_ok());
    }
}
