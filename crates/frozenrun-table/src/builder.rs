//! Frozen table builder
//!
//! Assembles encoded units into one ordered, sentinel-terminated table:
//! units sorted byte-wise by name, then the forced-failure markers, then the
//! sentinel. The ordering is part of the output contract so that tables built
//! from the same inputs are byte-identical.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::emit;
use crate::error::TableError;
use crate::format::{self, TableEncoding};
use crate::table::{FrozenEntry, FrozenTable};
use crate::unit::{encode_unit, validate_name, CompiledUnit, EncodedUnit};

/// One record of a built table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    /// Qualified name; empty for the sentinel.
    pub name: String,

    /// Blob, `None` for forced-failure markers and the sentinel.
    pub blob: Option<Vec<u8>>,

    /// Signed size (0 without a blob).
    pub size: i32,

    /// Package flag.
    pub is_package: bool,
}

impl TableRecord {
    /// A record for a real unit.
    pub fn unit(name: impl Into<String>, blob: Vec<u8>, is_package: bool) -> Result<Self, TableError> {
        let name = name.into();
        let len = i32::try_from(blob.len()).map_err(|_| TableError::UnitTooLarge {
            name: name.clone(),
            size: blob.len(),
        })?;
        Ok(Self {
            name,
            blob: Some(blob),
            size: if is_package { -len } else { len },
            is_package,
        })
    }

    /// A forced-failure marker.
    pub fn forced_failure(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blob: None,
            size: 0,
            is_package: false,
        }
    }

    /// The terminating record.
    pub fn sentinel() -> Self {
        Self {
            name: String::new(),
            blob: None,
            size: 0,
            is_package: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_forced_failure(&self) -> bool {
        !self.is_sentinel() && self.blob.is_none()
    }

    fn from_encoded(unit: EncodedUnit) -> Self {
        Self {
            name: unit.name,
            blob: Some(unit.blob),
            size: unit.size,
            is_package: unit.is_package,
        }
    }

    fn as_entry(&self) -> FrozenEntry<'_> {
        FrozenEntry {
            name: &self.name,
            code: self.blob.as_deref(),
            size: self.size,
            is_package: self.is_package,
        }
    }
}

/// Collects units and forced-failure names, then builds the table.
#[derive(Debug, Default)]
pub struct FrozenTableBuilder {
    encoding: TableEncoding,
    units: Vec<CompiledUnit>,
    fail_import: Vec<String>,
}

impl FrozenTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the size encoding (default: package-flag).
    pub fn encoding(mut self, encoding: TableEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Add a real unit.
    pub fn add_unit(&mut self, unit: CompiledUnit) -> &mut Self {
        self.units.push(unit);
        self
    }

    /// Add several units.
    pub fn add_units<I: IntoIterator<Item = CompiledUnit>>(&mut self, units: I) -> &mut Self {
        self.units.extend(units);
        self
    }

    /// Make `name` always fail to import, whatever exists on disk at run time.
    pub fn fail_import(&mut self, name: impl Into<String>) -> &mut Self {
        self.fail_import.push(name.into());
        self
    }

    /// Build the table. Fails without producing a partial table.
    pub fn build(&self) -> Result<BuiltTable, TableError> {
        let mut encoded = self
            .units
            .iter()
            .map(encode_unit)
            .collect::<Result<Vec<_>, _>>()?;

        encoded.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        if let Some(pair) = encoded.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(TableError::DuplicateUnitName(pair[0].name.clone()));
        }

        if self.encoding == TableEncoding::SignedSize {
            if let Some(unit) = encoded.iter().find(|u| u.is_package && u.blob.is_empty()) {
                return Err(TableError::AmbiguousEmptyPackage(unit.name.clone()));
            }
        }

        let mut blocked = self.fail_import.clone();
        for name in &blocked {
            validate_name(name)?;
        }
        blocked.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        blocked.dedup();

        for name in &blocked {
            if encoded
                .binary_search_by(|u| u.name.as_bytes().cmp(name.as_bytes()))
                .is_ok()
            {
                return Err(TableError::ConflictingBlacklist(name.clone()));
            }
        }

        let blob_ids: Vec<String> = encoded.iter().map(EncodedUnit::blob_identifier).collect();
        let mut owners: HashMap<&str, &str> = HashMap::with_capacity(blob_ids.len());
        for (id, unit) in blob_ids.iter().zip(&encoded) {
            if let Some(first) = owners.insert(id.as_str(), unit.name.as_str()) {
                return Err(TableError::IdentifierCollision {
                    identifier: id.clone(),
                    first: first.to_string(),
                    second: unit.name.clone(),
                });
            }
        }

        let mut records: Vec<TableRecord> = encoded.into_iter().map(TableRecord::from_encoded).collect();
        records.extend(blocked.into_iter().map(TableRecord::forced_failure));
        records.push(TableRecord::sentinel());

        tracing::debug!(
            units = records.iter().filter(|r| r.blob.is_some()).count(),
            forced_failures = records.iter().filter(|r| r.is_forced_failure()).count(),
            encoding = self.encoding.as_str(),
            "built frozen table"
        );

        Ok(BuiltTable {
            encoding: self.encoding,
            records,
            blob_ids,
        })
    }
}

/// A finished table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTable {
    encoding: TableEncoding,
    records: Vec<TableRecord>,
    blob_ids: Vec<String>,
}

impl BuiltTable {
    /// All records, the sentinel last.
    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    /// Identifiers of the emitted blobs, in table order.
    pub fn blob_identifiers(&self) -> &[String] {
        &self.blob_ids
    }

    pub fn encoding(&self) -> TableEncoding {
        self.encoding
    }

    /// Binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        format::write_table(self.encoding, &self.records)
    }

    /// Write the binary form.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        format::write_table_to(writer, self.encoding, &self.records)
    }

    /// Rust source defining the blobs and a `FROZEN_MODULES` record array.
    pub fn to_rust_source(&self) -> String {
        emit::emit_rust(self)
    }

    /// Lookup view borrowing this table.
    pub fn view(&self) -> FrozenTable<'_> {
        let entries: Vec<FrozenEntry<'_>> = self
            .records
            .iter()
            .take_while(|r| !r.is_sentinel())
            .map(TableRecord::as_entry)
            .collect();
        FrozenTable::from_entries(self.encoding, entries)
    }
}
