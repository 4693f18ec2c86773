//! Element matching shared by both backends.
//!
//! The recognized vocabulary is fixed and case-sensitive:
//!
//! ```text
//! item                  record boundary
//! title, category       unprefixed fields
//! itms:artist           \
//! itms:album             > fields under the itms prefix
//! itms:releasedate      /
//! ```
//!
//! Both backends route every element through [`match_element`], so the
//! extracted fields are identical whichever parser produced the events.

/// Namespace prefix of the iTunes store extension elements.
pub const ITMS_PREFIX: &str = "itms";

const ITEM: &str = "item";
const TITLE: &str = "title";
const CATEGORY: &str = "category";
const ARTIST: &str = "artist";
const ALBUM: &str = "album";
const RELEASE_DATE: &str = "releasedate";

/// The record field an element maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldRole {
    /// No field
    #[default]
    None,
    /// `<title>`
    Title,
    /// `<category>`
    Category,
    /// `<itms:artist>`
    Artist,
    /// `<itms:album>`
    Album,
    /// `<itms:releasedate>`
    ReleaseDate,
}

/// Classification of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMatch {
    /// `<item>`: starts or ends one record
    ItemBoundary,
    /// A field of the record currently being built
    Field(FieldRole),
    /// Anything else
    Ignored,
}

/// Classify an element by its namespace prefix and local name.
///
/// Total and pure: every input maps to exactly one [`ElementMatch`].
pub fn match_element(prefix: Option<&str>, local_name: &str) -> ElementMatch {
    match prefix {
        None => match local_name {
            ITEM => ElementMatch::ItemBoundary,
            TITLE => ElementMatch::Field(FieldRole::Title),
            CATEGORY => ElementMatch::Field(FieldRole::Category),
            _ => ElementMatch::Ignored,
        },
        Some(ITMS_PREFIX) => match local_name {
            ARTIST => ElementMatch::Field(FieldRole::Artist),
            ALBUM => ElementMatch::Field(FieldRole::Album),
            RELEASE_DATE => ElementMatch::Field(FieldRole::ReleaseDate),
            _ => ElementMatch::Ignored,
        },
        Some(_) => ElementMatch::Ignored,
    }
}

/// Classify an element by its raw bytes as reported by a streaming parser.
///
/// Names that are not valid UTF-8 cannot be part of the vocabulary and are ignored.
pub fn match_raw(prefix: Option<&[u8]>, local_name: &[u8]) -> ElementMatch {
    let prefix = match prefix.map(std::str::from_utf8) {
        None => None,
        Some(Ok(p)) => Some(p),
        Some(Err(_)) => return ElementMatch::Ignored,
    };
    match std::str::from_utf8(local_name) {
        Ok(local) => match_element(prefix, local),
        Err(_) => ElementMatch::Ignored,
    }
}

/// Classify an element by its qualified name (`prefix:local` or `local`).
pub fn match_qualified(qname: &str) -> ElementMatch {
    match qname.split_once(':') {
        Some((prefix, local)) => match_element(Some(prefix), local),
        None => match_element(None, qname),
    }
}
