//! Backend A: download everything, then parse it into a `roxmltree`
//! document and walk it as a stream of element and text events.

use std::time::Instant;

use roxmltree::{Document, Node, ParsingOptions};

use crate::assembler::ItemAssembler;
use crate::engine::RunEvents;
use crate::model::{BackendKind, Item};
use crate::transport::{Transport, TransportError};

use super::{FeedBackend, XmlSyntaxError};

const KIND: BackendKind = BackendKind::EventTree;

/// Whole-document backend built on `roxmltree`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTreeBackend;

impl FeedBackend for EventTreeBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn download_and_parse(
        &self,
        url: &str,
        transport: &dyn Transport,
        events: &mut RunEvents,
    ) -> Result<(), TransportError> {
        events.download_started();
        let body = transport.fetch_all(url);
        events.download_ended();
        let body = body?;
        log::debug!("Downloaded {} bytes from {}", body.len(), url);

        let started = Instant::now();
        let result = parse_document(&body, |item| events.item_parsed(item));
        events.add_parse_duration(started.elapsed());

        match result {
            Ok(count) => log::debug!("Parsed {} items", count),
            Err(e) => events.syntax_error(e),
        }
        Ok(())
    }
}

/// Parse a complete document, handing each finished item to `on_item`.
///
/// Returns the number of items. On a syntax error nothing has been emitted,
/// since the tree is only walked once the whole document parsed.
pub fn parse_document<F>(data: &[u8], mut on_item: F) -> Result<usize, XmlSyntaxError>
where
    F: FnMut(Item),
{
    let text = std::str::from_utf8(data).map_err(|e| {
        XmlSyntaxError::new(KIND, format!("payload is not valid UTF-8: {}", e))
            .at(e.valid_up_to() as u64)
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let document = Document::parse_with_options(text, options)
        .map_err(|e| XmlSyntaxError::new(KIND, e.to_string()))?;

    let mut assembler = ItemAssembler::new();
    let mut count = 0;
    let mut stack = vec![Visit::Open(document.root())];
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Open(node) => {
                if node.is_element() {
                    assembler.start_element(prefix_of(&node), node.tag_name().name());
                    stack.push(Visit::Close(node));
                } else if node.is_text() {
                    if let Some(text) = node.text() {
                        assembler.characters(text.as_bytes());
                    }
                }
                // Reversed so the first child is popped first
                stack.extend(node.children().rev().map(Visit::Open));
            }
            Visit::Close(node) => {
                if let Some(item) = assembler.end_element(prefix_of(&node), node.tag_name().name())
                {
                    count += 1;
                    on_item(item);
                }
            }
        }
    }
    Ok(count)
}

/// Pending step of the depth-first walk.
enum Visit<'a, 'input> {
    Open(Node<'a, 'input>),
    Close(Node<'a, 'input>),
}

/// The prefix the document binds to the element's namespace, if any.
fn prefix_of<'a, 'input: 'a>(node: &Node<'a, 'input>) -> Option<&'a str> {
    node.tag_name()
        .namespace()
        .and_then(|uri| node.lookup_prefix(uri))
}
