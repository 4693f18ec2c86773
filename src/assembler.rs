//! Per-run record assembly shared by both backends.
//!
//! [`ItemAssembler`] is the state machine behind the element callbacks: the
//! backends translate their parser's events into calls on it and forward the
//! finished items to the engine. It owns the character buffer, the capture
//! flags and the in-progress [`Item`].
//!
//! Invariants:
//! - `capturing` is only true while a recognized field element is open inside an item.
//! - The buffer is drained exactly once, when the open field's element closes.
//! - An item is in progress iff an item start has been seen without its end.

use crate::accumulator::CharacterBuffer;
use crate::date::parse_release_date;
use crate::matcher::{match_element, ElementMatch, FieldRole};
use crate::model::Item;

const FIELD_BUFFER_CAPACITY: usize = 256;

/// Builds [`Item`]s from element and character events.
#[derive(Debug)]
pub struct ItemAssembler {
    buffer: CharacterBuffer,
    in_item: bool,
    capturing: bool,
    current_field: FieldRole,
    current: Option<Item>,
}

impl Default for ItemAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemAssembler {
    /// Create an assembler with no item in progress.
    pub fn new() -> Self {
        Self {
            buffer: CharacterBuffer::with_capacity(FIELD_BUFFER_CAPACITY),
            in_item: false,
            capturing: false,
            current_field: FieldRole::None,
            current: None,
        }
    }

    /// Handle an element start.
    pub fn start_element(&mut self, prefix: Option<&str>, local_name: &str) {
        self.start_matched(match_element(prefix, local_name));
    }

    /// Handle an element start that was already classified.
    pub fn start_matched(&mut self, matched: ElementMatch) {
        match matched {
            ElementMatch::ItemBoundary => {
                if self.in_item {
                    log::debug!("Nested <item> start, discarding the unfinished item");
                }
                self.current = Some(Item::default());
                self.in_item = true;
                self.capturing = false;
                self.current_field = FieldRole::None;
                self.buffer.clear();
            }
            ElementMatch::Field(role) if self.in_item => {
                self.buffer.clear();
                self.capturing = true;
                self.current_field = role;
            }
            ElementMatch::Field(_) | ElementMatch::Ignored => {}
        }
    }

    /// Handle character data. Ignored unless a field is being captured.
    pub fn characters(&mut self, data: &[u8]) {
        if self.capturing {
            self.buffer.append(data);
        }
    }

    /// Handle an element end.
    ///
    /// Returns the finished item when an `<item>` element closes.
    pub fn end_element(&mut self, prefix: Option<&str>, local_name: &str) -> Option<Item> {
        self.end_matched(match_element(prefix, local_name))
    }

    /// Handle an element end that was already classified.
    pub fn end_matched(&mut self, matched: ElementMatch) -> Option<Item> {
        if !self.in_item {
            self.capturing = false;
            return None;
        }

        let finished = match matched {
            ElementMatch::ItemBoundary => {
                self.in_item = false;
                self.current_field = FieldRole::None;
                self.buffer.clear();
                self.current.take()
            }
            ElementMatch::Field(role) if role == self.current_field => {
                let text = self.buffer.drain_as_text();
                self.assign(role, text);
                self.current_field = FieldRole::None;
                None
            }
            ElementMatch::Field(_) | ElementMatch::Ignored => None,
        };
        self.capturing = false;
        finished
    }

    /// Whether an `<item>` is currently open.
    pub fn in_item(&self) -> bool {
        self.in_item
    }

    /// Whether character data is currently being captured.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Drop any partial state, returning whether an item was in progress.
    pub fn abandon(&mut self) -> bool {
        let had_item = self.current.take().is_some();
        self.in_item = false;
        self.capturing = false;
        self.current_field = FieldRole::None;
        self.buffer.clear();
        had_item
    }

    fn assign(&mut self, role: FieldRole, text: String) {
        let Some(item) = self.current.as_mut() else {
            return;
        };
        match role {
            FieldRole::Title => item.title = Some(text),
            FieldRole::Category => item.category = Some(text),
            FieldRole::Artist => item.artist = Some(text),
            FieldRole::Album => item.album = Some(text),
            FieldRole::ReleaseDate => item.release_date = parse_release_date(&text),
            FieldRole::None => {}
        }
    }
}
