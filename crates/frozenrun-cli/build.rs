//! Build script for embedding the frozen unit table
//!
//! `FROZENRUN_TABLE` names a binary table written by `frozenrun-freeze build`;
//! without it the launcher carries a sentinel-only table. `FROZENRUN_CONFIG`
//! optionally names a TOML file overriding the launcher configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use frozenrun_table::{FrozenTable, FrozenTableBuilder};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    println!("cargo:rerun-if-env-changed=FROZENRUN_TABLE");
    let table = match env::var_os("FROZENRUN_TABLE") {
        Some(path) => {
            let path = Path::new(&path);
            println!("cargo:rerun-if-changed={}", path.display());
            let bytes = fs::read(path).unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
            if let Err(e) = FrozenTable::parse(&bytes) {
                panic!("{} is not a frozen table: {}", path.display(), e);
            }
            bytes
        }
        None => FrozenTableBuilder::new()
            .build()
            .expect("an empty table always builds")
            .to_bytes(),
    };
    fs::write(out_dir.join("frozen.frz"), table).expect("Failed to write frozen table");

    println!("cargo:rerun-if-env-changed=FROZENRUN_CONFIG");
    let config = match env::var_os("FROZENRUN_CONFIG") {
        Some(path) => {
            let path = Path::new(&path);
            println!("cargo:rerun-if-changed={}", path.display());
            fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
        }
        None => String::new(),
    };
    fs::write(out_dir.join("launcher.toml"), config).expect("Failed to write launcher config");
}
