//! Execution modes
//!
//! Exactly one [`ExecutionMode`] is active per run. Inside script mode the
//! variant is chosen by inspecting the reference's suffix.

use std::path::{Path, PathBuf};

use crate::config::LauncherConfig;

/// What the dispatcher runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A source file
    Script { path: PathBuf },

    /// An importable unit, `-m`
    Module { name: String },

    /// Source text, `-c` or standard input
    InlineString { source: String },

    /// A precompiled bytecode file
    CodeFile { path: PathBuf },

    /// Precompiled bytecode read from standard input, `-b`
    CodeString { bytes: Vec<u8> },

    /// A directory, archive or file of unrecognised type
    PathEntry { path: PathBuf },

    /// Read-eval loop
    Interactive,

    /// The executable's own appended archive
    AppSelf,
}

impl ExecutionMode {
    /// Short name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionMode::Script { .. } => "script",
            ExecutionMode::Module { .. } => "module",
            ExecutionMode::InlineString { .. } => "string",
            ExecutionMode::CodeFile { .. } => "codefile",
            ExecutionMode::CodeString { .. } => "codestring",
            ExecutionMode::PathEntry { .. } => "path",
            ExecutionMode::Interactive => "interactive",
            ExecutionMode::AppSelf => "app",
        }
    }

    /// The on-disk reference whose directory heads the search path.
    pub fn script_reference(&self) -> Option<&Path> {
        match self {
            ExecutionMode::Script { path }
            | ExecutionMode::CodeFile { path }
            | ExecutionMode::PathEntry { path } => Some(path),
            _ => None,
        }
    }
}

/// Pick the script-mode variant for `reference`.
///
/// `force_bytecode` is the `-b` flag. Source suffixes select [`ExecutionMode::Script`],
/// bytecode suffixes [`ExecutionMode::CodeFile`], anything else is a path entry.
pub fn classify_reference(reference: &str, force_bytecode: bool, config: &LauncherConfig) -> ExecutionMode {
    let path = PathBuf::from(reference);
    if force_bytecode || config.is_bytecode(reference) {
        ExecutionMode::CodeFile { path }
    } else if config.is_source(reference) {
        ExecutionMode::Script { path }
    } else {
        ExecutionMode::PathEntry { path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_reference_is_script() {
        let config = LauncherConfig::default();
        assert_eq!(
            classify_reference("app.py", false, &config),
            ExecutionMode::Script { path: "app.py".into() }
        );
        assert_eq!(classify_reference("tool.pyw", false, &config).kind(), "script");
    }

    #[test]
    fn test_bytecode_reference_is_codefile() {
        let config = LauncherConfig::default();
        assert_eq!(
            classify_reference("app.pyc", false, &config),
            ExecutionMode::CodeFile { path: "app.pyc".into() }
        );
        assert_eq!(classify_reference("app.py", true, &config).kind(), "codefile");
    }

    #[test]
    fn test_anything_else_is_path_entry() {
        let config = LauncherConfig::default();
        for reference in ["appdir", "bundle.zip", "script.sh"] {
            assert_eq!(classify_reference(reference, false, &config).kind(), "path");
        }
    }

    #[test]
    fn test_script_reference() {
        assert!(ExecutionMode::Interactive.script_reference().is_none());
        assert!(ExecutionMode::Module { name: "m".into() }.script_reference().is_none());
        let mode = ExecutionMode::PathEntry { path: "/srv/app".into() };
        assert_eq!(mode.script_reference(), Some(Path::new("/srv/app")));
    }
}
