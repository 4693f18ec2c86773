//! Backend B: parse chunks as they arrive, without building a tree.
//!
//! [`PushParser`] is the incremental front-end. Each call to
//! [`PushParser::feed`] appends a chunk to a pending buffer and runs a
//! `quick-xml` reader over the part of it that ends in a complete markup
//! boundary (the last `>`). Whatever cannot be parsed yet is kept for the
//! next chunk:
//!
//! ```text
//!   pending: <item><title>Thri
//!            |---- parsed ----|        "Thri" is plain text: handed to the
//!                                      assembler right away, nothing kept
//!
//!   pending: <item><title>Rock &am
//!            |---- parsed ----|kept    partial entity: kept until "p;" arrives
//!
//!   pending: ...</title><itms:art
//!            |-parsed-|kept            partial tag: kept
//! ```
//!
//! Element names are matched on their raw prefix and local name, since the
//! reader does not resolve namespaces. Whether an item is open is tracked
//! by the assembler, not by nesting depth.
//!
//! Line endings are normalized the way an XML processor must: `\r\n` and
//! a lone `\r` both become `\n`. A `\r` at the very end of the pending
//! buffer is held back until the next byte shows which of the two it is.
//!
//! Finishing (an empty final chunk) parses everything that is left and
//! reports unclosed elements. After the first syntax error the parser is
//! poisoned and ignores further input.

use std::borrow::Cow;
use std::time::Instant;

use quick_xml::errors::{Error as XmlError, SyntaxError};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::assembler::ItemAssembler;
use crate::engine::RunEvents;
use crate::matcher::{match_raw, ElementMatch};
use crate::model::{BackendKind, Item};
use crate::transport::{Transport, TransportError};

use super::{FeedBackend, XmlSyntaxError};

const KIND: BackendKind = BackendKind::Push;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Incremental feed parser.
///
/// Chunk boundaries may fall anywhere, including inside a tag, an entity
/// or a multi-byte character; the items produced do not depend on them.
#[derive(Debug, Default)]
pub struct PushParser {
    /// Bytes received but not yet consumed
    pending: Vec<u8>,
    /// Stream offset of `pending[0]`
    offset: u64,
    assembler: ItemAssembler,
    depth: usize,
    seen_root: bool,
    started: bool,
    poisoned: bool,
    finished: bool,
}

impl PushParser {
    /// Create a parser at the start of a document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one chunk. `terminate` marks the end of input.
    ///
    /// Finished items are handed to `on_item` in document order.
    pub fn feed<F>(
        &mut self,
        chunk: &[u8],
        terminate: bool,
        mut on_item: F,
    ) -> Result<(), XmlSyntaxError>
    where
        F: FnMut(Item),
    {
        if self.poisoned || self.finished {
            return Ok(());
        }
        self.pending.extend_from_slice(chunk);
        let result = self.process(terminate, &mut on_item);
        if terminate {
            self.finished = true;
        }
        if result.is_err() {
            self.poisoned = true;
            self.pending.clear();
            if self.assembler.abandon() {
                log::warn!("Dropping the partial item after a syntax error");
            }
        }
        result
    }

    /// Signal end of input. Equivalent to feeding an empty terminating chunk.
    pub fn finish<F>(&mut self, on_item: F) -> Result<(), XmlSyntaxError>
    where
        F: FnMut(Item),
    {
        self.feed(&[], true, on_item)
    }

    /// Whether a syntax error stopped the parser.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Bytes waiting for the rest of their markup.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn process<F>(&mut self, terminate: bool, on_item: &mut F) -> Result<(), XmlSyntaxError>
    where
        F: FnMut(Item),
    {
        if !self.started {
            let partial_bom =
                self.pending.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.pending);
            if partial_bom && !terminate {
                return Ok(());
            }
            if self.pending.starts_with(UTF8_BOM) {
                self.pending.drain(..UTF8_BOM.len());
                self.offset += UTF8_BOM.len() as u64;
            }
            self.started = true;
        }

        let boundary = if terminate {
            self.pending.len()
        } else {
            self.pending
                .iter()
                .rposition(|&b| b == b'>')
                .map_or(0, |i| i + 1)
        };

        let mut consumed = if boundary > 0 {
            let pending = std::mem::take(&mut self.pending);
            let result = self.parse_slice(&pending[..boundary], terminate, on_item);
            self.pending = pending;
            result?
        } else {
            0
        };

        if consumed == boundary && !terminate && self.depth > 0 {
            consumed += self.emit_plain_tail(boundary);
        }

        self.pending.drain(..consumed);
        self.offset += consumed as u64;

        if terminate {
            self.check_complete()?;
        }
        Ok(())
    }

    /// Hand unfinished character data after `boundary` to the assembler when it
    /// holds no markup or entity. Stops before a truncated UTF-8 sequence and
    /// before a trailing `\r` that may be the first half of `\r\n`.
    fn emit_plain_tail(&mut self, boundary: usize) -> usize {
        let tail = &self.pending[boundary..];
        if tail.is_empty() || tail.iter().any(|&b| b == b'<' || b == b'&') {
            return 0;
        }
        let mut complete = match std::str::from_utf8(tail) {
            Ok(_) => tail.len(),
            Err(e) => e.valid_up_to(),
        };
        if tail[..complete].ends_with(b"\r") {
            complete -= 1;
        }
        if complete > 0 {
            self.assembler.characters(&normalize_line_endings(&tail[..complete]));
        }
        complete
    }

    /// Parse `input`, returning how many bytes were consumed.
    fn parse_slice<F>(
        &mut self,
        input: &[u8],
        terminate: bool,
        on_item: &mut F,
    ) -> Result<usize, XmlSyntaxError>
    where
        F: FnMut(Item),
    {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        // each slice gets a fresh reader, so ends may close starts it never saw
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.expand_empty_elements = true;

        loop {
            let event_start = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.depth += 1;
                    self.seen_root = true;
                    self.assembler.start_matched(classify(e.name()));
                }
                Ok(Event::End(e)) => {
                    self.depth = self.depth.saturating_sub(1);
                    if let Some(item) = self.assembler.end_matched(classify(e.name())) {
                        on_item(item);
                    }
                }
                Ok(Event::Text(text)) => {
                    if self.assembler.is_capturing() {
                        let position = self.offset + event_start as u64;
                        let syntax =
                            |message: String| XmlSyntaxError::new(KIND, message).at(position);
                        // before unescaping, so `&#13;` still yields a literal `\r`
                        let raw = normalize_line_endings(&text);
                        let raw = std::str::from_utf8(&raw).map_err(|e| syntax(e.to_string()))?;
                        let unescaped = unescape(raw).map_err(|e| syntax(e.to_string()))?;
                        self.assembler.characters(unescaped.as_bytes());
                    }
                }
                Ok(Event::CData(data)) => {
                    self.assembler.characters(&normalize_line_endings(&data));
                }
                Ok(Event::Eof) => return Ok(input.len()),
                Ok(_) => {}
                Err(XmlError::Syntax(e))
                    if !terminate && !matches!(e, SyntaxError::InvalidBangMarkup) =>
                {
                    // markup continues in a later chunk
                    return Ok(event_start);
                }
                Err(e) => {
                    let position = self.offset + reader.error_position() as u64;
                    return Err(XmlSyntaxError::new(KIND, e.to_string()).at(position));
                }
            }
        }
    }

    fn check_complete(&self) -> Result<(), XmlSyntaxError> {
        if !self.seen_root {
            return Err(XmlSyntaxError::new(KIND, "no root element").at(self.offset));
        }
        if self.depth > 0 {
            return Err(XmlSyntaxError::new(
                KIND,
                format!("unexpected end of input with {} unclosed element(s)", self.depth),
            )
            .at(self.offset));
        }
        Ok(())
    }
}

/// Replace `\r\n` and lone `\r` with `\n`.
fn normalize_line_endings(raw: &[u8]) -> Cow<'_, [u8]> {
    if !raw.contains(&b'\r') {
        return Cow::Borrowed(raw);
    }
    let mut normalized = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b == b'\r' {
            normalized.push(b'\n');
            bytes.next_if_eq(&b'\n');
        } else {
            normalized.push(b);
        }
    }
    Cow::Owned(normalized)
}

fn classify(name: QName<'_>) -> ElementMatch {
    let prefix = name.prefix();
    let local = name.local_name();
    match_raw(prefix.as_ref().map(|p| p.as_ref()), local.as_ref())
}

/// Streaming backend: one [`PushParser`] fed from the transport's chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushBackend;

impl PushBackend {
    fn parse_chunk(parser: &mut PushParser, chunk: &[u8], terminate: bool, events: &mut RunEvents) {
        let started = Instant::now();
        let result = parser.feed(chunk, terminate, |item| events.item_parsed(item));
        events.add_parse_duration(started.elapsed());
        if let Err(e) = result {
            events.syntax_error(e);
        }
    }
}

impl FeedBackend for PushBackend {
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
        let stream = transport.open(url);
        events.download_ended();
        let mut stream = stream?;

        let mut parser = PushParser::new();
        let mut chunks = 0usize;
        let mut bytes = 0usize;
        loop {
            events.download_started();
            let next = stream.next();
            events.download_ended();
            match next {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    bytes += chunk.len();
                    Self::parse_chunk(&mut parser, &chunk, false, events);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Self::parse_chunk(&mut parser, &[], true, events);
        log::debug!(
            "Parsed {} items from {} bytes in {} chunks",
            events.items_parsed(),
            bytes,
            chunks
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::event_tree::parse_document;
    use crate::backend::fixtures::{feed_with_items, SAMPLE_FEED};
    use crate::engine::WorkerEvent;
    use crate::transport::ScriptedFailure;
    use crate::transport::MemoryTransport;

    fn parse_chunks(chunks: &[&[u8]]) -> (Vec<Item>, Result<(), XmlSyntaxError>) {
        let mut parser = PushParser::new();
        let mut items = Vec::new();
        for chunk in chunks {
            if let Err(e) = parser.feed(chunk, false, |item| items.push(item)) {
                return (items, Err(e));
            }
        }
        let result = parser.finish(|item| items.push(item));
        (items, result)
    }

    fn parse_split(feed: &[u8], chunk_size: usize) -> Vec<Item> {
        let chunks: Vec<&[u8]> = feed.chunks(chunk_size).collect();
        let (items, result) = parse_chunks(&chunks);
        result.unwrap();
        items
    }

    fn parse_whole(feed: &str) -> Vec<Item> {
        let mut items = Vec::new();
        parse_document(feed.as_bytes(), |item| items.push(item)).unwrap();
        items
    }

    #[test]
    fn test_sample_feed_matches_tree_backend() {
        let expected = parse_whole(SAMPLE_FEED);
        assert_eq!(expected.len(), 3);
        assert_eq!(parse_split(SAMPLE_FEED.as_bytes(), SAMPLE_FEED.len()), expected);
    }

    #[test]
    fn test_every_chunk_size_gives_same_items() {
        let feed = SAMPLE_FEED.as_bytes();
        let expected = parse_whole(SAMPLE_FEED);
        for size in 1..=64 {
            assert_eq!(parse_split(feed, size), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_text_split_across_chunks() {
        let (items, result) = parse_chunks(&[
            b"<rss><item><title>Thri",
            b"ller</title></item></rss>",
        ]);
        result.unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Thriller"));
    }

    #[test]
    fn test_plain_tail_text_is_not_buffered() {
        let mut parser = PushParser::new();
        parser.feed(b"<rss><item><title>Thri", false, |_| {}).unwrap();
        assert_eq!(parser.buffered(), 0);
        parser.feed(b"<itms:al", false, |_| {}).unwrap();
        assert_eq!(parser.buffered(), 8);
        parser.feed(b"&am", false, |_| {}).unwrap();
        assert_eq!(parser.buffered(), 11);
    }

    #[test]
    fn test_entity_and_multibyte_split() {
        let feed = "<rss><item><title>Caf\u{e9} &amp; Bar</title></item></rss>".as_bytes();
        let expected = Some("Caf\u{e9} & Bar");
        for size in 1..feed.len() {
            let items = parse_split(feed, size);
            assert_eq!(items[0].title.as_deref(), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_line_endings_match_tree_backend_at_every_split() {
        let feed = "<rss>\r\n<item>\r\n<title>A\r\nB\rC</title>\r\n\
                    <category><![CDATA[x\r\ny]]></category></item>\r\n</rss>\r\n";
        let expected = parse_whole(feed);
        assert_eq!(expected[0].title.as_deref(), Some("A\nB\nC"));
        assert_eq!(expected[0].category.as_deref(), Some("x\ny"));
        for size in 1..=feed.len() {
            assert_eq!(parse_split(feed.as_bytes(), size), expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_trailing_carriage_return_is_held_back() {
        let mut parser = PushParser::new();
        parser.feed(b"<rss><item><title>A\r", false, |_| {}).unwrap();
        assert_eq!(parser.buffered(), 1);
        let mut items = Vec::new();
        parser
            .feed(b"\nB</title></item></rss>", false, |i| items.push(i))
            .unwrap();
        parser.finish(|i| items.push(i)).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("A\nB"));
    }

    #[test]
    fn test_character_reference_keeps_carriage_return() {
        let feed = "<rss><item><title>A&#13;\r\nB</title></item></rss>";
        let items = parse_split(feed.as_bytes(), feed.len());
        assert_eq!(items, parse_whole(feed));
        assert_eq!(items[0].title.as_deref(), Some("A\r\nB"));
    }

    #[test]
    fn test_bom_split_across_chunks() {
        let (items, result) = parse_chunks(&[b"\xEF\xBB", b"\xBF<rss><item><title>T</title></item></rss>"]);
        result.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_items_emitted_before_input_ends() {
        let mut parser = PushParser::new();
        let mut items = Vec::new();
        parser
            .feed(b"<rss><item><title>A</title></item><item>", false, |i| items.push(i))
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unclosed_document_is_error() {
        let (items, result) = parse_chunks(&[b"<rss><item><title>T</title></item><item>"]);
        assert_eq!(items.len(), 1);
        let err = result.unwrap_err();
        assert!(err.message.contains("unclosed"));
        assert_eq!(err.backend, BackendKind::Push);
    }

    #[test]
    fn test_empty_input_is_error() {
        let (items, result) = parse_chunks(&[]);
        assert!(items.is_empty());
        assert!(result.is_err());
    }

    #[test]
    fn test_poisoned_after_error() {
        let mut parser = PushParser::new();
        let mut items = Vec::new();
        let err = parser.feed(b"<rss><item><title>&bogus;</title>", false, |i| items.push(i));
        assert!(err.is_err());
        assert!(parser.is_poisoned());
        assert!(parser
            .feed(b"<item><title>B</title></item></rss>", false, |i| items.push(i))
            .is_ok());
        assert!(parser.finish(|i| items.push(i)).is_ok());
        assert!(items.is_empty());
    }

    #[test]
    fn test_backend_times_every_chunk() {
        let feed = feed_with_items(3);
        let transport = MemoryTransport::new(feed.clone()).with_chunk_size(16);
        let chunk_count = transport.chunk_count();
        let (mut events, receiver) = RunEvents::channel(10, 4096);
        PushBackend
            .download_and_parse("memory:", &transport, &mut events)
            .unwrap();
        drop(events);

        let all: Vec<WorkerEvent> = receiver.try_iter().collect();
        let slices = all
            .iter()
            .filter(|e| matches!(e, WorkerEvent::ParseDuration(_)))
            .count();
        assert_eq!(slices, chunk_count + 1);
        assert!(!all.iter().any(|e| matches!(e, WorkerEvent::SyntaxError(_))));
    }

    #[test]
    fn test_backend_keeps_draining_after_syntax_error() {
        let feed = "<rss><item><title>&bogus;</title></item><item><title>B</title></item></rss>";
        let transport = MemoryTransport::new(feed).with_chunk_size(4);
        let chunk_count = transport.chunk_count();
        let (mut events, receiver) = RunEvents::channel(10, 4096);
        assert!(PushBackend
            .download_and_parse("memory:", &transport, &mut events)
            .is_ok());
        assert_eq!(events.items_parsed(), 0);
        drop(events);

        let all: Vec<WorkerEvent> = receiver.try_iter().collect();
        let errors = all
            .iter()
            .filter(|e| matches!(e, WorkerEvent::SyntaxError(_)))
            .count();
        assert_eq!(errors, 1);
        let slices = all
            .iter()
            .filter(|e| matches!(e, WorkerEvent::ParseDuration(_)))
            .count();
        assert_eq!(slices, chunk_count + 1);
    }

    #[test]
    fn test_backend_transport_failure() {
        let transport = MemoryTransport::new(feed_with_items(2))
            .with_chunk_size(8)
            .fail_after(3, ScriptedFailure::Network("reset".into()));
        let (mut events, _receiver) = RunEvents::channel(10, 4096);
        let result = PushBackend.download_and_parse("memory:", &transport, &mut events);
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
