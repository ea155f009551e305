//! Bootstrap context
//!
//! The single owned record of everything the dispatcher decides during
//! startup. It is seeded from the environment, updated by the flag parser as
//! each flag is read, and complete before any target code runs. Afterwards
//! only the warning filter list changes.

use std::fmt;
use std::path::PathBuf;

use crate::config::EnvNames;
use crate::env::Environment;
use crate::mode::ExecutionMode;

/// Interpreter flag values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    /// `-v` count
    pub verbose: u8,
    /// `-d` count
    pub debug: u8,
    /// `-O` count
    pub optimize: u8,
    /// `-i`: interact after the target finishes or fails
    pub inspect: bool,
    /// `-u`
    pub unbuffered: bool,
    /// `-E`: ignore the path variable
    pub ignore_environment: bool,
    /// `-S`: add the site directory verbatim, without reading `.pth` files
    pub ignore_pth_files: bool,
    /// `-S`: skip site initialisation (the user site directory)
    pub skip_site_main: bool,
    /// `-s`: skip the user site directory
    pub skip_user_site: bool,
    /// `-P`: don't prepend the script directory
    pub safe_path: bool,
    /// `-B`
    pub dont_write_bytecode: bool,
    /// `-b`: the reference is precompiled bytecode
    pub bytecode: bool,
    /// Passed through to the host's HTTPS layer
    pub https_verify: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            verbose: 0,
            debug: 0,
            optimize: 0,
            inspect: false,
            unbuffered: false,
            ignore_environment: false,
            ignore_pth_files: false,
            skip_site_main: false,
            skip_user_site: false,
            safe_path: false,
            dont_write_bytecode: false,
            bytecode: false,
            https_verify: true,
        }
    }
}

impl Flags {
    /// Seed flag values from environment variables.
    ///
    /// When the ignore-environment variable is on, nothing else is read and
    /// the path variable is ignored later on.
    pub fn from_environment(env: &Environment, names: &EnvNames) -> Self {
        let mut flags = Flags::default();
        if env.flag(&names.ignore_environment) == Some(true) {
            flags.ignore_environment = true;
            return flags;
        }

        if let Some(level) = env.level(&names.verbose) {
            flags.verbose = level;
        }
        if let Some(level) = env.level(&names.debug) {
            flags.debug = level;
        }
        if let Some(level) = env.level(&names.optimize) {
            flags.optimize = level;
        }
        if let Some(on) = env.flag(&names.inspect) {
            flags.inspect = on;
        }
        if let Some(on) = env.flag(&names.unbuffered) {
            flags.unbuffered = on;
        }
        if let Some(on) = env.flag(&names.safe_path) {
            flags.safe_path = on;
        }
        if let Some(on) = env.flag(&names.https_verify) {
            flags.https_verify = on;
        }
        flags
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Warning filters
// ────────────────────────────────────────────────────────────────────────────

/// What to do with a matching warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningAction {
    Default,
    Error,
    Ignore,
    Always,
    Module,
    Once,
}

impl WarningAction {
    const ALL: [(WarningAction, &'static str); 6] = [
        (WarningAction::Default, "default"),
        (WarningAction::Error, "error"),
        (WarningAction::Ignore, "ignore"),
        (WarningAction::Always, "always"),
        (WarningAction::Module, "module"),
        (WarningAction::Once, "once"),
    ];

    /// Parse an action. Any unambiguous-by-order prefix is accepted, and an
    /// empty action means `default`.
    pub fn parse(action: &str) -> Option<Self> {
        if action.is_empty() {
            return Some(WarningAction::Default);
        }
        if action == "all" {
            return Some(WarningAction::Always);
        }
        Self::ALL
            .iter()
            .find(|(_, name)| name.starts_with(action))
            .map(|(a, _)| *a)
    }

    pub fn as_str(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(a, _)| a == self)
            .map(|(_, name)| *name)
            .unwrap_or("default")
    }
}

/// One `-W action:message:category:module:lineno` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningFilter {
    pub action: WarningAction,
    /// Case-insensitive prefix of the message; empty matches everything
    pub message: String,
    /// Category name; empty matches everything
    pub category: String,
    /// Module name; empty matches everything
    pub module: String,
    /// Line number; 0 matches everything
    pub lineno: u32,
}

impl WarningFilter {
    /// Parse the argument of a `-W` flag.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        if parts.len() > 5 {
            return Err(format!("too many fields (max 5): '{}'", spec));
        }
        let field = |i: usize| parts.get(i).copied().unwrap_or("");

        let action = WarningAction::parse(field(0))
            .ok_or_else(|| format!("invalid action: '{}'", field(0)))?;
        let lineno = match field(4) {
            "" => 0,
            n => n
                .parse::<u32>()
                .map_err(|_| format!("invalid lineno '{}'", n))?,
        };

        Ok(Self {
            action,
            message: field(1).to_string(),
            category: field(2).to_string(),
            module: field(3).to_string(),
            lineno,
        })
    }

    fn matches(&self, category: &str, message: &str, module: &str, lineno: u32) -> bool {
        let message_ok = message
            .to_lowercase()
            .starts_with(&self.message.to_lowercase());
        let category_ok =
            self.category.is_empty() || self.category == "Warning" || self.category == category;
        let module_ok = self.module.is_empty() || self.module == module;
        let line_ok = self.lineno == 0 || self.lineno == lineno;
        message_ok && category_ok && module_ok && line_ok
    }
}

impl fmt::Display for WarningFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.action.as_str(),
            self.message,
            self.category,
            self.module,
            self.lineno
        )
    }
}

/// Ordered warning filters. Filters added later take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningFilters {
    filters: Vec<WarningFilter>,
}

impl WarningFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter in front of all existing ones.
    pub fn add(&mut self, filter: WarningFilter) {
        self.filters.insert(0, filter);
    }

    /// The action of the first matching filter.
    pub fn action_for(&self, category: &str, message: &str, module: &str, lineno: u32) -> WarningAction {
        self.filters
            .iter()
            .find(|f| f.matches(category, message, module, lineno))
            .map(|f| f.action)
            .unwrap_or(WarningAction::Default)
    }

    /// Filters in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &WarningFilter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run state
// ────────────────────────────────────────────────────────────────────────────

/// First-step decision of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Undetermined,
    Script,
    Interactive,
    AppSelf,
}

/// Later steps of the state machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Startup,
    Dispatching,
    Executing,
    Exited,
}

/// Everything decided during startup.
#[derive(Debug, Clone)]
pub struct BootstrapContext {
    /// File name of the launcher executable, used as the diagnostics prefix
    pub program_name: String,

    /// Launcher executable path
    pub executable: PathBuf,

    /// Working directory at startup
    pub cwd: PathBuf,

    pub flags: Flags,

    /// Grows during execution
    pub warnings: WarningFilters,

    pub run_mode: RunMode,

    /// Selected once, while dispatching
    pub mode: Option<ExecutionMode>,

    /// Argument vector handed to the target
    pub target_argv: Vec<String>,

    /// Resolved search path
    pub search_path: Vec<PathBuf>,

    /// Directives found by site expansion; recorded, never executed
    pub site_directives: Vec<String>,

    phase: Phase,
}

impl BootstrapContext {
    pub fn new(program_name: impl Into<String>, executable: PathBuf, cwd: PathBuf, flags: Flags) -> Self {
        Self {
            program_name: program_name.into(),
            executable,
            cwd,
            flags,
            warnings: WarningFilters::new(),
            run_mode: RunMode::Undetermined,
            mode: None,
            target_argv: Vec::new(),
            search_path: Vec::new(),
            site_directives: Vec::new(),
            phase: Phase::Startup,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to a later phase. Moving backwards is ignored.
    pub fn enter(&mut self, phase: Phase) {
        if phase <= self.phase {
            tracing::trace!(current = ?self.phase, requested = ?phase, "phase unchanged");
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?phase, run_mode = ?self.run_mode, "bootstrap phase");
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_environment() {
        let names = EnvNames::default();
        let env = Environment::new()
            .with("FROZENRUN_VERBOSE", "2")
            .with("FROZENRUN_OPTIMIZE", "1")
            .with("FROZENRUN_INSPECT", "1")
            .with("FROZENRUN_HTTPS_VERIFY", "0");
        let flags = Flags::from_environment(&env, &names);
        assert_eq!(flags.verbose, 2);
        assert_eq!(flags.debug, 0);
        assert_eq!(flags.optimize, 1);
        assert!(flags.inspect);
        assert!(!flags.https_verify);
    }

    #[test]
    fn test_ignore_environment_variable_blocks_everything() {
        let names = EnvNames::default();
        let env = Environment::new()
            .with("FROZENRUN_IGNORE_ENVIRONMENT", "1")
            .with("FROZENRUN_DEBUG", "3");
        let flags = Flags::from_environment(&env, &names);
        assert!(flags.ignore_environment);
        assert_eq!(flags.debug, 0);
    }

    #[test]
    fn test_warning_action_prefixes() {
        assert_eq!(WarningAction::parse("ignore"), Some(WarningAction::Ignore));
        assert_eq!(WarningAction::parse("i"), Some(WarningAction::Ignore));
        assert_eq!(WarningAction::parse("e"), Some(WarningAction::Error));
        assert_eq!(WarningAction::parse("a"), Some(WarningAction::Always));
        assert_eq!(WarningAction::parse(""), Some(WarningAction::Default));
        assert_eq!(WarningAction::parse("loud"), None);
    }

    #[test]
    fn test_warning_filter_fields() {
        let filter = WarningFilter::parse("error:deprecated:DeprecationWarning:app:12").unwrap();
        assert_eq!(filter.action, WarningAction::Error);
        assert_eq!(filter.message, "deprecated");
        assert_eq!(filter.category, "DeprecationWarning");
        assert_eq!(filter.module, "app");
        assert_eq!(filter.lineno, 12);
        assert_eq!(filter.to_string(), "error:deprecated:DeprecationWarning:app:12");

        assert!(WarningFilter::parse("a:b:c:d:e:f").is_err());
        assert!(WarningFilter::parse("ignore::::x").is_err());
    }

    #[test]
    fn test_later_filters_win() {
        let mut filters = WarningFilters::new();
        filters.add(WarningFilter::parse("ignore").unwrap());
        filters.add(WarningFilter::parse("error:Disk").unwrap());

        assert_eq!(
            filters.action_for("UserWarning", "disk almost full", "__main__", 1),
            WarningAction::Error
        );
        assert_eq!(
            filters.action_for("UserWarning", "something else", "__main__", 1),
            WarningAction::Ignore
        );
        assert_eq!(
            WarningFilters::new().action_for("UserWarning", "x", "m", 1),
            WarningAction::Default
        );
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut ctx = BootstrapContext::new("frozenrun", "frozenrun".into(), "/".into(), Flags::default());
        assert_eq!(ctx.phase(), Phase::Startup);
        ctx.enter(Phase::Executing);
        ctx.enter(Phase::Dispatching);
        assert_eq!(ctx.phase(), Phase::Executing);
        ctx.enter(Phase::Exited);
        assert_eq!(ctx.phase(), Phase::Exited);
    }
}
