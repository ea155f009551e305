//! Binary table format
//!
//! Defines the byte layout of a frozen table as embedded in the launcher.
//! All integers are little-endian.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Header (24 bytes)                           │
//! │    magic        [u8; 8]  b"FRZTABL\0"        │
//! │    version      u32                          │
//! │    encoding     u32  0 = signed-size         │
//! │                      1 = package-flag        │
//! │    entry_count  u32  records before sentinel │
//! │    checksum     u32  CRC32 of record area    │
//! ├──────────────────────────────────────────────┤
//! │  Record*                                     │
//! │    name_len     u32                          │
//! │    name         [u8; name_len]  UTF-8        │
//! │    flags        u8   bit0 has blob           │
//! │                      bit1 package (enc. 1)   │
//! │    size         i32  ±len(blob), 0 if none   │
//! │    blob         [u8; |size|]  if bit0        │
//! ├──────────────────────────────────────────────┤
//! │  Sentinel: name_len 0, flags 0, size 0       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The checksum covers every byte after the header, so a table must end at
//! its sentinel; trailing bytes fail the checksum.

use std::io::{self, Write};

use crate::builder::TableRecord;
use crate::error::TableError;
use crate::table::FrozenEntry;

/// Magic bytes identifying a frozen table.
pub const TABLE_MAGIC: [u8; 8] = *b"FRZTABL\0";

/// Current table format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Record flag: the record carries a blob.
pub const FLAG_HAS_BLOB: u8 = 0x01;

/// Record flag: the unit is a package (package-flag encoding only).
pub const FLAG_PACKAGE: u8 = 0x02;

/// How the package property is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableEncoding {
    /// Package ⇔ negative size. Cannot represent empty packages.
    SignedSize,

    /// Signed size plus an explicit package bit.
    #[default]
    PackageFlag,
}

impl TableEncoding {
    fn to_u32(self) -> u32 {
        match self {
            TableEncoding::SignedSize => 0,
            TableEncoding::PackageFlag => 1,
        }
    }

    fn from_u32(value: u32) -> Result<Self, TableError> {
        match value {
            0 => Ok(TableEncoding::SignedSize),
            1 => Ok(TableEncoding::PackageFlag),
            other => Err(TableError::UnknownEncoding(other)),
        }
    }

    /// Name used in manifests and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            TableEncoding::SignedSize => "signed-size",
            TableEncoding::PackageFlag => "package-flag",
        }
    }
}

impl std::str::FromStr for TableEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signed-size" => Ok(TableEncoding::SignedSize),
            "package-flag" => Ok(TableEncoding::PackageFlag),
            other => Err(format!(
                "unknown table encoding '{}' (expected signed-size or package-flag)",
                other
            )),
        }
    }
}

/// Serialize records (the last of which must be the sentinel).
pub fn write_table(encoding: TableEncoding, records: &[TableRecord]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut entry_count = 0u32;

    for record in records {
        let mut flags = 0u8;
        if record.blob.is_some() {
            flags |= FLAG_HAS_BLOB;
        }
        if record.is_package && encoding == TableEncoding::PackageFlag {
            flags |= FLAG_PACKAGE;
        }

        body.extend_from_slice(&(record.name.len() as u32).to_le_bytes());
        body.extend_from_slice(record.name.as_bytes());
        body.push(flags);
        body.extend_from_slice(&record.size.to_le_bytes());
        if let Some(blob) = &record.blob {
            body.extend_from_slice(blob);
        }

        if record.is_sentinel() {
            break;
        }
        entry_count += 1;
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&TABLE_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&encoding.to_u32().to_le_bytes());
    out.extend_from_slice(&entry_count.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Write the serialized table to a writer.
pub fn write_table_to<W: Write>(
    writer: &mut W,
    encoding: TableEncoding,
    records: &[TableRecord],
) -> io::Result<()> {
    writer.write_all(&write_table(encoding, records))
}

/// Decode a table, borrowing names and blobs from `data`.
pub fn read_table(data: &[u8]) -> Result<(TableEncoding, Vec<FrozenEntry<'_>>), TableError> {
    if data.len() < HEADER_SIZE {
        return Err(TableError::Truncated(data.len()));
    }

    let mut magic = [0u8; 8];
    magic.copy_from_slice(&data[..8]);
    if magic != TABLE_MAGIC {
        return Err(TableError::InvalidMagic(magic));
    }

    let mut reader = Reader { data, offset: 8 };
    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(TableError::UnsupportedVersion(version));
    }
    let encoding = TableEncoding::from_u32(reader.u32()?)?;
    let entry_count = reader.u32()?;
    let checksum = reader.u32()?;

    let actual = crc32fast::hash(&data[HEADER_SIZE..]);
    if actual != checksum {
        return Err(TableError::ChecksumMismatch {
            expected: checksum,
            actual,
        });
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    loop {
        if reader.offset >= data.len() {
            return Err(TableError::MissingSentinel);
        }

        let name_offset = reader.offset;
        let name_len = reader.u32()? as usize;
        let name_bytes = reader.take(name_len)?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| TableError::InvalidUtf8(name_offset))?;
        let flags = reader.u8()?;
        let size = reader.i32()?;

        if name.is_empty() {
            break;
        }

        let code = if flags & FLAG_HAS_BLOB != 0 {
            Some(reader.take(size.unsigned_abs() as usize)?)
        } else {
            None
        };

        let is_package = match encoding {
            TableEncoding::SignedSize => size < 0,
            TableEncoding::PackageFlag => {
                let flagged = flags & FLAG_PACKAGE != 0;
                if size < 0 && !flagged {
                    return Err(TableError::InconsistentRecord(name.to_string()));
                }
                flagged
            }
        };

        entries.push(FrozenEntry {
            name,
            code,
            size,
            is_package,
        });
    }

    if entries.len() as u32 != entry_count {
        return Err(TableError::EntryCountMismatch {
            expected: entry_count,
            actual: entries.len() as u32,
        });
    }

    Ok((encoding, entries))
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], TableError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(TableError::Truncated(self.offset))?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, TableError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, TableError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn i32(&mut self) -> Result<i32, TableError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(buf))
    }
}
