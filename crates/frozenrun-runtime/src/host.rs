//! Interpreter seam
//!
//! The dispatcher does not execute code itself. A [`Host`] compiles source
//! into code blobs, runs them, and provides the read-eval loop. The
//! dispatcher hands it a [`HostEnv`] with everything it may touch.

use std::fmt;

use crate::context::{Flags, WarningFilters};
use crate::finder::ModuleFinder;
use crate::streams::Streams;

/// Length of the header in front of code in bytecode files: 4 bytes of
/// host magic, 4 reserved bytes.
pub const CODE_FILE_HEADER: usize = 8;

/// One traceback line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub filename: String,
    pub line: u32,
    pub scope: String,
}

/// An error raised by target code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetError {
    /// Error class name, e.g. `ZeroDivisionError`
    pub kind: String,
    pub message: String,
    /// Outermost frame first
    pub traceback: Vec<TraceFrame>,
}

impl TargetError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            traceback: Vec::new(),
        }
    }

    /// Add a frame outside the existing ones.
    pub fn push_outer(&mut self, frame: TraceFrame) {
        self.traceback.insert(0, frame);
    }

    /// Full report as written to the error stream.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.traceback.is_empty() {
            out.push_str("Traceback (most recent call last):\n");
            for frame in &self.traceback {
                out.push_str(&format!(
                    "  File \"{}\", line {}, in {}\n",
                    frame.filename, frame.line, frame.scope
                ));
            }
        }
        out.push_str(&self.to_string());
        out.push('\n');
        out
    }
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for TargetError {}

/// How target execution ended when it did not finish normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Uncaught error
    #[error("{0}")]
    Raised(TargetError),

    /// The target asked to exit with this status
    #[error("exit({0})")]
    Exit(i32),
}

impl From<TargetError> for HostError {
    fn from(err: TargetError) -> Self {
        HostError::Raised(err)
    }
}

/// What the host may touch while running target code.
pub struct HostEnv<'a, 'f> {
    pub finder: &'a ModuleFinder<'f>,
    pub argv: &'a [String],
    pub flags: &'a Flags,
    pub warnings: &'a mut WarningFilters,
    pub streams: &'a mut Streams,
}

/// An interpreter.
pub trait Host {
    /// Magic bytes identifying this host's bytecode files.
    fn magic(&self) -> [u8; 4];

    /// Compile source text into a code blob.
    fn compile(&self, source: &str, filename: &str, optimize: u8) -> Result<Vec<u8>, TargetError>;

    /// Run a code blob as the main unit.
    fn run_main(&mut self, code: &[u8], filename: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError>;

    /// Read-eval loop in the main unit's namespace.
    fn interact(&mut self, banner: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError>;
}

/// Prefix `code` with a bytecode file header.
pub fn code_file_bytes(magic: [u8; 4], code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CODE_FILE_HEADER + code.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&[0; CODE_FILE_HEADER - 4]);
    out.extend_from_slice(code);
    out
}

/// Check a bytecode file's header and return the code after it.
pub fn strip_code_header(bytes: &[u8], magic: [u8; 4]) -> Option<&[u8]> {
    if bytes.len() < CODE_FILE_HEADER || bytes[..4] != magic {
        return None;
    }
    Some(&bytes[CODE_FILE_HEADER..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_traceback() {
        let mut err = TargetError::new("ZeroDivisionError", "division by zero");
        err.push_outer(TraceFrame {
            filename: "lib.py".into(),
            line: 3,
            scope: "<module>".into(),
        });
        err.push_outer(TraceFrame {
            filename: "<string>".into(),
            line: 1,
            scope: "<module>".into(),
        });
        assert_eq!(
            err.render(),
            "Traceback (most recent call last):\n  File \"<string>\", line 1, in <module>\n  File \"lib.py\", line 3, in <module>\nZeroDivisionError: division by zero\n"
        );
    }

    #[test]
    fn test_render_without_traceback_or_message() {
        assert_eq!(TargetError::new("KeyboardInterrupt", "").render(), "KeyboardInterrupt\n");
    }

    #[test]
    fn test_code_header() {
        let bytes = code_file_bytes(*b"MINI", b"code");
        assert_eq!(bytes.len(), CODE_FILE_HEADER + 4);
        assert_eq!(strip_code_header(&bytes, *b"MINI"), Some(&b"code"[..]));
        assert_eq!(strip_code_header(&bytes, *b"XXXX"), None);
        assert_eq!(strip_code_header(b"MINI", *b"MINI"), None);
    }
}
