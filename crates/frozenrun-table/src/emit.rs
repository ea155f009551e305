//! Rust source emitter
//!
//! Writes a built table as Rust source: one `static` byte array per blob and a
//! `FROZEN_MODULES` record array ending in the sentinel, suitable for
//! `include!` into a launcher and for [`crate::FrozenTable::from_records`].

use std::fmt::Write;

use crate::builder::{BuiltTable, TableRecord};
use crate::unit::blob_identifier;

const BYTES_PER_LINE: usize = 16;

/// Render `table` as Rust source.
pub fn emit_rust(table: &BuiltTable) -> String {
    let mut out = String::new();
    out.push_str("// Generated by frozenrun-freeze. Do not edit.\n");
    let _ = writeln!(out, "// encoding: {}", table.encoding().as_str());

    for record in table.records() {
        if let Some(blob) = &record.blob {
            write_blob(&mut out, &blob_identifier(&record.name), blob);
        }
    }

    out.push_str("\npub static FROZEN_MODULES: &[frozenrun_table::FrozenEntry<'static>] = &[\n");
    for record in table.records() {
        out.push_str("    ");
        out.push_str(&entry_expr(record));
        out.push_str(",\n");
    }
    out.push_str("];\n");
    out
}

fn entry_expr(record: &TableRecord) -> String {
    if record.is_sentinel() {
        return "frozenrun_table::FrozenEntry::SENTINEL".to_string();
    }
    match &record.blob {
        None => format!("frozenrun_table::FrozenEntry::forced_failure({:?})", record.name),
        Some(_) => format!(
            "frozenrun_table::FrozenEntry::{}({:?}, &{})",
            if record.is_package { "package" } else { "module" },
            record.name,
            blob_identifier(&record.name)
        ),
    }
}

fn write_blob(out: &mut String, ident: &str, blob: &[u8]) {
    let _ = writeln!(out, "\n#[allow(non_upper_case_globals)]");
    let _ = writeln!(out, "pub static {}: [u8; {}] = [", ident, blob.len());
    for chunk in blob.chunks(BYTES_PER_LINE) {
        out.push_str("    ");
        for byte in chunk {
            let _ = write!(out, "{},", byte);
        }
        out.push('\n');
    }
    out.push_str("];\n");
}
