//! Frozen unit table
//!
//! Build-time and run-time halves of the embedded unit table:
//! - **unit**: encodes one compiled unit into a blob and signed size
//! - **builder**: sorts units, appends forced-failure markers and the sentinel
//! - **format**: bit-exact binary layout of the table
//! - **table**: read-only lookup view used at import time
//! - **emit**: Rust source form of a built table

pub mod builder;
pub mod emit;
pub mod error;
pub mod format;
pub mod table;
pub mod unit;

pub use builder::{BuiltTable, FrozenTableBuilder, TableRecord};
pub use error::TableError;
pub use format::{TableEncoding, FORMAT_VERSION, HEADER_SIZE, TABLE_MAGIC};
pub use table::{FrozenEntry, FrozenTable, FrozenUnit, Lookup};
pub use unit::{blob_identifier, encode_unit, CompiledUnit, EncodedUnit};
