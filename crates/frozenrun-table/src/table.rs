//! Frozen table lookup
//!
//! The runtime view of a table: an ordered list of entries terminated by a
//! sentinel. Scans stop at the first record with an empty name and never look
//! past it. An entry without a blob is a forced-failure marker: looking its
//! name up reports the unit as unavailable, not as "not in this table".

use std::borrow::Cow;

use crate::error::TableError;
use crate::format::TableEncoding;

/// One table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrozenEntry<'a> {
    /// Qualified name; empty only for the sentinel.
    pub name: &'a str,

    /// Code blob, or `None` for forced-failure markers and the sentinel.
    pub code: Option<&'a [u8]>,

    /// Signed size: blob length, negative for packages. 0 when `code` is `None`.
    pub size: i32,

    /// Package flag.
    pub is_package: bool,
}

impl FrozenEntry<'static> {
    /// The terminating record.
    pub const SENTINEL: FrozenEntry<'static> = FrozenEntry {
        name: "",
        code: None,
        size: 0,
        is_package: false,
    };
}

impl<'a> FrozenEntry<'a> {
    /// A module entry whose size is derived from its blob.
    pub const fn module(name: &'a str, code: &'a [u8]) -> Self {
        Self {
            name,
            code: Some(code),
            size: code.len() as i32,
            is_package: false,
        }
    }

    /// A package entry whose size is the negated blob length.
    pub const fn package(name: &'a str, code: &'a [u8]) -> Self {
        Self {
            name,
            code: Some(code),
            size: -(code.len() as i32),
            is_package: true,
        }
    }

    /// A marker that makes `name` permanently unresolvable.
    pub const fn forced_failure(name: &'a str) -> Self {
        Self {
            name,
            code: None,
            size: 0,
            is_package: false,
        }
    }

    /// Whether this is the terminating record.
    pub fn is_sentinel(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether this is a forced-failure marker.
    pub fn is_forced_failure(&self) -> bool {
        !self.is_sentinel() && self.code.is_none()
    }
}

/// A unit found in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrozenUnit<'a> {
    pub name: &'a str,
    pub code: &'a [u8],
    pub is_package: bool,
}

/// Result of looking a name up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The unit is embedded.
    Found(FrozenUnit<'a>),

    /// The name is blacklisted; callers must not search elsewhere.
    ForcedFailure,

    /// The table knows nothing about the name.
    NotFound,
}

/// Read-only table of frozen units.
#[derive(Debug, Clone)]
pub struct FrozenTable<'a> {
    encoding: Option<TableEncoding>,
    entries: Cow<'a, [FrozenEntry<'a>]>,
}

impl FrozenTable<'static> {
    /// A table holding only the sentinel.
    pub fn empty() -> Self {
        Self {
            encoding: None,
            entries: Cow::Borrowed(&[]),
        }
    }
}

impl<'a> FrozenTable<'a> {
    /// View a sentinel-terminated record array, e.g. one emitted as Rust source.
    pub fn from_records(records: &'a [FrozenEntry<'a>]) -> Result<Self, TableError> {
        let end = records
            .iter()
            .position(FrozenEntry::is_sentinel)
            .ok_or(TableError::MissingSentinel)?;
        Ok(Self {
            encoding: None,
            entries: Cow::Borrowed(&records[..end]),
        })
    }

    /// Decode the binary form produced by [`crate::BuiltTable::to_bytes`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self, TableError> {
        let (encoding, entries) = crate::format::read_table(bytes)?;
        Ok(Self {
            encoding: Some(encoding),
            entries: Cow::Owned(entries),
        })
    }

    pub(crate) fn from_entries(encoding: TableEncoding, entries: Vec<FrozenEntry<'a>>) -> Self {
        Self {
            encoding: Some(encoding),
            entries: Cow::Owned(entries),
        }
    }

    /// Look `name` up. The first matching record wins.
    pub fn find(&self, name: &str) -> Lookup<'a> {
        let entry = match self.entries.iter().find(|e| e.name == name) {
            Some(entry) => *entry,
            None => return Lookup::NotFound,
        };

        match entry.code {
            Some(code) => Lookup::Found(FrozenUnit {
                name: entry.name,
                code,
                is_package: entry.is_package,
            }),
            None => {
                tracing::trace!(name, "frozen lookup hit forced-failure marker");
                Lookup::ForcedFailure
            }
        }
    }

    /// Entries in table order, without the sentinel.
    pub fn entries(&self) -> &[FrozenEntry<'a>] {
        &self.entries
    }

    /// Number of entries, without the sentinel.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoding the table was decoded from; `None` for record arrays.
    pub fn encoding(&self) -> Option<TableEncoding> {
        self.encoding
    }
}
