//! Bootstrap error types.

use frozenrun_table::TableError;

use crate::host::TargetError;

/// Errors that end a bootstrap run.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Bad or unknown flag, missing `-c`/`-m` argument
    #[error("{0}")]
    Usage(String),

    /// A recognised flag this launcher does not implement (`-R`)
    #[error("{0}")]
    UnsupportedFeature(String),

    /// Script, module or path reference not found or unreadable
    #[error("{0}")]
    Resolution(String),

    /// The embedded table is malformed
    #[error("frozen table: {0}")]
    TableIntegrity(#[from] TableError),

    /// The executed program raised and nobody caught it
    #[error("{0}")]
    Target(TargetError),

    /// I/O on the launcher's own streams
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Usage(_)
            | BootstrapError::UnsupportedFeature(_)
            | BootstrapError::Resolution(_)
            | BootstrapError::TableIntegrity(_)
            | BootstrapError::Target(_)
            | BootstrapError::Io(_) => 1,
        }
    }

    /// Whether the usage text should accompany the message.
    pub fn wants_usage(&self) -> bool {
        matches!(self, BootstrapError::Usage(_))
    }
}
