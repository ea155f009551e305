//! `frozenrun-freeze inspect`: list the records of a binary table.

use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use frozenrun_table::{FrozenEntry, FrozenTable};

use crate::util::sha256_hex;

pub fn execute(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    print!("{}", render(&bytes).with_context(|| format!("decode {}", path.display()))?);
    Ok(())
}

fn kind(entry: &FrozenEntry<'_>) -> &'static str {
    if entry.is_forced_failure() {
        "blocked"
    } else if entry.is_package {
        "package"
    } else {
        "module"
    }
}

/// The listing printed for a table.
pub fn render(bytes: &[u8]) -> anyhow::Result<String> {
    let table = FrozenTable::parse(bytes)?;
    let mut out = String::new();
    if let Some(encoding) = table.encoding() {
        writeln!(out, "encoding: {}", encoding.as_str())?;
    }
    writeln!(out, "sha256: {}", sha256_hex(bytes))?;
    for entry in table.entries() {
        writeln!(out, "{:<8} {:>9} {}", kind(entry), entry.size, entry.name)?;
    }
    let blocked = table.entries().iter().filter(|e| e.is_forced_failure()).count();
    writeln!(out, "{} units, {} blocked", table.len() - blocked, blocked)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frozenrun_table::{CompiledUnit, FrozenTableBuilder, TableEncoding};

    #[test]
    fn test_listing() {
        let mut builder = FrozenTableBuilder::new().encoding(TableEncoding::SignedSize);
        builder
            .add_unit(CompiledUnit::package("email", vec![1, 2, 3]))
            .add_unit(CompiledUnit::module("email.parser", vec![4, 5]))
            .fail_import("tkinter");
        let bytes = builder.build().unwrap().to_bytes();

        let text = render(&bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "encoding: signed-size");
        assert!(lines[1].starts_with("sha256: "));
        assert_eq!(lines[2], "package         -3 email");
        assert_eq!(lines[3], "module           2 email.parser");
        assert_eq!(lines[4], "blocked          0 tkinter");
        assert_eq!(lines[5], "2 units, 1 blocked");
    }

    #[test]
    fn test_corrupt_table() {
        assert!(render(b"not a table").is_err());
    }
}
