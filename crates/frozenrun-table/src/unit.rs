//! Unit encoder
//!
//! Turns one compiled program unit into the blob and signed size stored in
//! the frozen table. The magnitude of the size is the blob length; a negative
//! size marks a package.

use crate::error::TableError;

/// Prefix of every emitted blob identifier.
pub const BLOB_PREFIX: &str = "_FM_";

/// One precompiled module or package, identified by its dotted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    /// Dot-separated qualified name, unique across a table.
    pub name: String,

    /// Marshaled host code. May be empty for namespace-only packages.
    pub code: Vec<u8>,

    /// Whether the unit is a package (may contain submodules).
    pub is_package: bool,
}

impl CompiledUnit {
    /// A plain module unit.
    pub fn module(name: impl Into<String>, code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            code,
            is_package: false,
        }
    }

    /// A package unit.
    pub fn package(name: impl Into<String>, code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            code,
            is_package: true,
        }
    }
}

/// A unit as it is laid out in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedUnit {
    /// Qualified name.
    pub name: String,

    /// Blob bytes, identical to the unit's code.
    pub blob: Vec<u8>,

    /// `len(blob)`, negated for packages.
    pub size: i32,

    /// Package flag. Redundant with the sign unless the blob is empty.
    pub is_package: bool,
}

impl EncodedUnit {
    /// Identifier under which the blob is emitted.
    pub fn blob_identifier(&self) -> String {
        blob_identifier(&self.name)
    }
}

/// Encode a unit. Identical input yields identical output.
pub fn encode_unit(unit: &CompiledUnit) -> Result<EncodedUnit, TableError> {
    validate_name(&unit.name)?;

    let len = i32::try_from(unit.code.len()).map_err(|_| TableError::UnitTooLarge {
        name: unit.name.clone(),
        size: unit.code.len(),
    })?;

    Ok(EncodedUnit {
        name: unit.name.clone(),
        blob: unit.code.clone(),
        size: if unit.is_package { -len } else { len },
        is_package: unit.is_package,
    })
}

/// Check that `name` is a non-empty dotted sequence of ASCII identifiers.
pub fn validate_name(name: &str) -> Result<(), TableError> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        });

    if valid {
        Ok(())
    } else {
        Err(TableError::InvalidUnitName(name.to_string()))
    }
}

/// Mangle a qualified name into a blob identifier: `pkg.mod` → `_FM_pkg__mod`.
pub fn blob_identifier(name: &str) -> String {
    format!("{}{}", BLOB_PREFIX, name.split('.').collect::<Vec<_>>().join("__"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_size_is_positive() {
        let encoded = encode_unit(&CompiledUnit::module("json.decoder", vec![7; 40])).unwrap();
        assert_eq!(encoded.size, 40);
        assert!(!encoded.is_package);
        assert_eq!(encoded.blob, vec![7; 40]);
    }

    #[test]
    fn test_package_size_is_negative() {
        let encoded = encode_unit(&CompiledUnit::package("json", vec![1, 2, 3])).unwrap();
        assert_eq!(encoded.size, -3);
        assert!(encoded.is_package);
    }

    #[test]
    fn test_empty_blob_is_legal() {
        let encoded = encode_unit(&CompiledUnit::package("ns", Vec::new())).unwrap();
        assert_eq!(encoded.size, 0);
        assert!(encoded.is_package);
        assert!(encoded.blob.is_empty());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let unit = CompiledUnit::module("a.b", b"code bytes".to_vec());
        assert_eq!(encode_unit(&unit).unwrap(), encode_unit(&unit).unwrap());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", ".a", "a.", "a..b", "1abc", "a-b", "a b"] {
            assert!(
                matches!(validate_name(name), Err(TableError::InvalidUnitName(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_name("_private.mod_2").is_ok());
    }

    #[test]
    fn test_blob_identifier() {
        assert_eq!(blob_identifier("pkg.sub.mod"), "_FM_pkg__sub__mod");
        assert_eq!(blob_identifier("os"), "_FM_os");
    }
}
