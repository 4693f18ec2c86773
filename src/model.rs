//! Record model: parsed feed items, backend identity and per-run timing samples.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::format_medium;

/// One parsed unit of feed content.
///
/// An item is filled in while its `<item>` element is open and handed to the
/// engine when the element closes. After that it is never mutated again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Song title (`<title>`)
    pub title: Option<String>,
    /// Performing artist (`<itms:artist>`)
    pub artist: Option<String>,
    /// Album name (`<itms:album>`)
    pub album: Option<String>,
    /// Genre / category (`<category>`)
    pub category: Option<String>,
    /// Release date (`<itms:releasedate>`), `None` when absent or unparseable
    pub release_date: Option<NaiveDate>,
}

impl Item {
    /// Render the detail view of a record: album, artist, category and release date.
    ///
    /// Missing fields render as empty strings; the date uses the medium style
    /// (`Mar 19, 2024`).
    pub fn details(&self) -> ItemDetails<'_> {
        ItemDetails { item: self }
    }
}

/// Borrowed detail rendering of an [`Item`], see [`Item::details`].
pub struct ItemDetails<'a> {
    item: &'a Item,
}

impl fmt::Display for ItemDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.item;
        writeln!(f, "album: {}", item.album.as_deref().unwrap_or(""))?;
        writeln!(f, "artist: {}", item.artist.as_deref().unwrap_or(""))?;
        writeln!(f, "category: {}", item.category.as_deref().unwrap_or(""))?;
        let released = item.release_date.map(format_medium).unwrap_or_default();
        write!(f, "released: {}", released)
    }
}

/// Identity of a parsing strategy.
///
/// The discriminants are persisted in the statistics store and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Backend A: whole document parsed into a tree, walked as element events
    EventTree = 0,
    /// Backend B: chunks pushed into a streaming parser as they arrive
    Push = 1,
}

impl BackendKind {
    /// All backends, in persisted-id order.
    pub const ALL: [BackendKind; 2] = [BackendKind::EventTree, BackendKind::Push];

    /// Stable integer id used as the store key.
    pub fn id(self) -> i64 {
        self as i64
    }

    /// Inverse of [`BackendKind::id`].
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::EventTree),
            1 => Some(Self::Push),
            _ => None,
        }
    }

    /// Human-readable name of the underlying parser.
    pub fn parser_name(self) -> &'static str {
        match self {
            Self::EventTree => "roxmltree",
            Self::Push => "quick-xml push",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parser_name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "event-tree" | "tree" | "a" | "0" => Ok(Self::EventTree),
            "push" | "chunk" | "b" | "1" => Ok(Self::Push),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Timing sample for one completed run.
///
/// All durations are non-negative seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStatistic {
    /// Which backend produced the run
    pub backend: BackendKind,
    /// Time spent waiting on the transport
    pub download_duration: f64,
    /// Time spent strictly inside parser calls
    pub parse_duration: f64,
    /// Time from `start()` until the parse ended
    pub total_duration: f64,
}

impl fmt::Display for RunStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: download {:.4}s, parse {:.4}s, total {:.4}s",
            self.backend, self.download_duration, self.parse_duration, self.total_duration
        )
    }
}
