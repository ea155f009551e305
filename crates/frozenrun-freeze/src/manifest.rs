//! `freeze.toml` manifest
//!
//! ```toml
//! fail-import = ["tkinter"]
//!
//! [table]
//! encoding = "package-flag"
//! output = "frozen.frz"
//! rust-output = "frozen.rs"
//!
//! [[sources]]
//! path = "lib"
//! prefix = "vendor"
//! ```
//!
//! Relative paths are taken relative to the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use frozenrun_table::TableEncoding;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Manifest {
    pub table: TableSection,
    pub sources: Vec<SourceSpec>,
    pub fail_import: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TableSection {
    pub encoding: Option<String>,
    pub output: Option<PathBuf>,
    pub rust_output: Option<PathBuf>,
}

/// A source tree and the dotted prefix its units are frozen under.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SourceSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl SourceSpec {
    /// Parse `DIR` or `DIR=PREFIX`.
    pub fn parse(arg: &str) -> Result<Self, String> {
        let (path, prefix) = match arg.split_once('=') {
            Some((path, prefix)) => (path, Some(prefix)),
            None => (arg, None),
        };
        if path.is_empty() {
            return Err(format!("empty source directory in '{}'", arg));
        }
        if let Some(prefix) = prefix {
            if prefix.is_empty() || prefix.split('.').any(|part| !is_identifier(part)) {
                return Err(format!("invalid unit prefix '{}'", prefix));
            }
        }
        Ok(Self {
            path: PathBuf::from(path),
            prefix: prefix.map(str::to_string),
        })
    }
}

pub fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => chars.all(|c| c == '_' || c.is_ascii_alphanumeric()),
        _ => false,
    }
}

impl Manifest {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.encoding()?;
        Ok(manifest)
    }

    /// Load a manifest and anchor its relative paths at its directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut manifest = Self::from_toml_str(&content).with_context(|| format!("parse {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.rebase(base);
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for source in &mut self.sources {
            anchor(&mut source.path);
        }
        if let Some(output) = &mut self.table.output {
            anchor(output);
        }
        if let Some(output) = &mut self.table.rust_output {
            anchor(output);
        }
    }

    pub fn encoding(&self) -> anyhow::Result<Option<TableEncoding>> {
        self.table
            .encoding
            .as_deref()
            .map(|e| e.parse::<TableEncoding>().map_err(|err| anyhow::anyhow!("{}", err)))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_manifest() {
        let manifest = Manifest::from_toml_str(
            r#"
fail-import = ["tkinter", "idlelib"]

[table]
encoding = "signed-size"
output = "out/table.frz"
rust-output = "out/table.rs"

[[sources]]
path = "lib"

[[sources]]
path = "vendor"
prefix = "third_party"
"#,
        )
        .unwrap();
        assert_eq!(manifest.encoding().unwrap(), Some(TableEncoding::SignedSize));
        assert_eq!(manifest.fail_import, vec!["tkinter", "idlelib"]);
        assert_eq!(manifest.sources.len(), 2);
        assert_eq!(manifest.sources[1].prefix.as_deref(), Some("third_party"));
        assert_eq!(manifest.table.rust_output, Some(PathBuf::from("out/table.rs")));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from_toml_str("").unwrap();
        assert_eq!(manifest, Manifest::default());
        assert_eq!(manifest.encoding().unwrap(), None);
    }

    #[test]
    fn test_bad_encoding_rejected() {
        assert!(Manifest::from_toml_str("[table]\nencoding = \"compressed\"\n").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Manifest::from_toml_str("colour = \"blue\"\n").is_err());
    }

    #[test]
    fn test_load_rebases_paths() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("freeze.toml");
        std::fs::write(&path, "[table]\noutput = \"t.frz\"\n[[sources]]\npath = \"src\"\n").unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.table.output, Some(temp.path().join("t.frz")));
        assert_eq!(manifest.sources[0].path, temp.path().join("src"));
    }

    #[test]
    fn test_source_argument() {
        assert_eq!(
            SourceSpec::parse("lib=vendor.pkg").unwrap(),
            SourceSpec {
                path: PathBuf::from("lib"),
                prefix: Some("vendor.pkg".to_string())
            }
        );
        assert_eq!(SourceSpec::parse("lib").unwrap().prefix, None);
        assert!(SourceSpec::parse("lib=9lives").is_err());
        assert!(SourceSpec::parse("=x").is_err());
    }
}
