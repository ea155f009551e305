//! Table error types.

/// Errors raised while building, encoding, or decoding a frozen table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Two real units share one qualified name.
    #[error("duplicate unit name '{0}'")]
    DuplicateUnitName(String),

    /// A name listed as forced-failure is also a real unit.
    #[error("unit '{0}' is both frozen and listed as a forced import failure")]
    ConflictingBlacklist(String),

    /// The name is not a dot-separated sequence of identifiers.
    #[error("invalid unit name '{0}'")]
    InvalidUnitName(String),

    /// The code blob does not fit the signed 32-bit size field.
    #[error("unit '{name}' is too large for the table ({size} bytes)")]
    UnitTooLarge {
        /// Unit name
        name: String,
        /// Blob length in bytes
        size: usize,
    },

    /// Two unit names mangle to the same blob identifier.
    #[error("units '{first}' and '{second}' both map to blob identifier '{identifier}'")]
    IdentifierCollision {
        /// Shared identifier
        identifier: String,
        /// Unit seen first in table order
        first: String,
        /// Unit seen second
        second: String,
    },

    /// A code-less package cannot carry its package bit in a signed size of 0.
    #[error("empty package '{0}' cannot be represented in the signed-size encoding")]
    AmbiguousEmptyPackage(String),

    /// Binary table does not start with the table magic.
    #[error("invalid table magic: {0:?}")]
    InvalidMagic([u8; 8]),

    /// Binary table version is not understood by this reader.
    #[error("unsupported table version {0}")]
    UnsupportedVersion(u32),

    /// Binary table names an unknown size encoding.
    #[error("unknown table encoding {0}")]
    UnknownEncoding(u32),

    /// Stored checksum does not match the record area.
    #[error("table checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u32,
        /// Checksum computed over the records
        actual: u32,
    },

    /// The data ended inside a header or record.
    #[error("table truncated at offset {0}")]
    Truncated(usize),

    /// No sentinel record terminates the table.
    #[error("table has no sentinel record")]
    MissingSentinel,

    /// Header entry count disagrees with the records found.
    #[error("table header announces {expected} entries, found {actual}")]
    EntryCountMismatch {
        /// Count from the header
        expected: u32,
        /// Records before the sentinel
        actual: u32,
    },

    /// A record name is not valid UTF-8.
    #[error("record name at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    /// A record's flags contradict its size.
    #[error("record '{0}' has inconsistent flags and size")]
    InconsistentRecord(String),

    /// Writing the table failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
