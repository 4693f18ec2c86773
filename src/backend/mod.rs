//! # Parser backends
//!
//! Two interchangeable strategies turn a feed into [`Item`]s:
//!
//! | Backend | Input | Parser | Parse timing |
//! |---|---|---|---|
//! | [`EventTreeBackend`] | whole payload | `roxmltree` document walked as open/close/text edges | one slice |
//! | [`PushBackend`] | chunk by chunk | [`PushParser`] over `quick-xml` | one slice per chunk plus the final call |
//!
//! Both classify elements with [`crate::matcher`] and assemble items with
//! [`crate::assembler::ItemAssembler`], so for a well-formed feed they extract
//! the same items. They differ only in mechanics and timing.
//!
//! A backend reports through [`RunEvents`] and returns the transport outcome.
//! XML syntax errors are not run failures: they are reported with
//! [`RunEvents::syntax_error`] and the run completes with what was parsed.
//!
//! [`Item`]: crate::model::Item

use std::sync::Arc;

use crate::engine::RunEvents;
use crate::model::BackendKind;
use crate::transport::{Transport, TransportError};

pub mod event_tree;
pub mod push;

#[cfg(test)]
pub(crate) mod fixtures;

pub use event_tree::EventTreeBackend;
pub use push::{PushBackend, PushParser};

/// Recovered XML error reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{backend} syntax error{}: {message}", byte_offset(.position))]
pub struct XmlSyntaxError {
    /// Backend that hit the error
    pub backend: BackendKind,
    /// Parser message
    pub message: String,
    /// Byte offset into the payload, when the parser reports one
    pub position: Option<u64>,
}

impl XmlSyntaxError {
    /// Create an error without a byte position.
    pub fn new(backend: BackendKind, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
            position: None,
        }
    }

    /// Attach a byte offset.
    pub fn at(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

fn byte_offset(position: &Option<u64>) -> String {
    position
        .map(|p| format!(" at byte {}", p))
        .unwrap_or_default()
}

/// A parsing strategy.
///
/// Implementations run on the engine's worker thread. They must call
/// [`RunEvents::download_started`] / [`RunEvents::download_ended`] around
/// every transport wait, [`RunEvents::item_parsed`] for each finished item
/// and [`RunEvents::add_parse_duration`] for the time spent inside parser
/// calls, keeping download waits and parse slices disjoint.
pub trait FeedBackend: Send + Sync {
    /// Identity recorded with the run statistics.
    fn kind(&self) -> BackendKind;

    /// Display name.
    fn name(&self) -> &'static str {
        self.kind().parser_name()
    }

    /// Fetch `url` through `transport` and parse it.
    ///
    /// Returns `Err` only for transport failures.
    fn download_and_parse(
        &self,
        url: &str,
        transport: &dyn Transport,
        events: &mut RunEvents,
    ) -> Result<(), TransportError>;
}

/// The backend implementing `kind`.
pub fn backend_for(kind: BackendKind) -> Arc<dyn FeedBackend> {
    match kind {
        BackendKind::EventTree => Arc::new(EventTreeBackend),
        BackendKind::Push => Arc::new(PushBackend),
    }
}
