//! Bootstrap dispatcher
//!
//! Drives one run through the state machine:
//! 1. Decide the run mode: executables not named like the runtime run their
//!    own appended archive and skip flag parsing entirely
//! 2. Parse flags into the context, pick script or interactive mode
//! 3. Select the execution mode and the target's argument vector
//! 4. Resolve the search path
//! 5. Load the target and hand it to the host; on an uncaught error either
//!    propagate or, with inspect mode, report it and start the read-eval loop

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use frozenrun_table::FrozenTable;

use crate::archive::Archive;
use crate::config::{Installation, LauncherConfig};
use crate::context::{BootstrapContext, Flags, Phase, RunMode};
use crate::env::Environment;
use crate::error::BootstrapError;
use crate::finder::{ModuleCode, ModuleFinder};
use crate::flags::{parse_command_line, ParseOutcome, Payload};
use crate::host::{strip_code_header, Host, HostEnv, HostError, TargetError};
use crate::mode::{classify_reference, ExecutionMode};
use crate::path::{resolve_search_path, PathInputs};
use crate::site::{PthSiteExpander, SiteExpander};
use crate::streams::Streams;
use crate::usage;

/// Process-level inputs of one run.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Path of the launcher executable
    pub executable: PathBuf,

    /// Arguments after the program name
    pub args: Vec<String>,

    pub cwd: PathBuf,

    pub env: Environment,

    /// Whether standard input is a terminal
    pub stdin_is_tty: bool,
}

impl Invocation {
    /// Capture the current process.
    pub fn from_process(stdin_is_tty: bool) -> io::Result<Self> {
        let mut args = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
        let argv0 = args.next().unwrap_or_default();
        let executable = std::env::current_exe().unwrap_or_else(|_| PathBuf::from(&argv0));
        Ok(Self {
            executable,
            args: args.collect(),
            cwd: std::env::current_dir()?,
            env: Environment::from_process(),
            stdin_is_tty,
        })
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct Completion {
    /// Process exit status
    pub status: i32,

    /// Final state of the run
    pub context: BootstrapContext,
}

/// Code ready to run.
struct LoadedTarget {
    code: Vec<u8>,
    filename: String,
}

/// Why loading a target failed.
enum LoadFailure {
    Bootstrap(BootstrapError),
    /// Raised while compiling target code; subject to inspect mode
    Target(TargetError),
}

impl From<BootstrapError> for LoadFailure {
    fn from(err: BootstrapError) -> Self {
        LoadFailure::Bootstrap(err)
    }
}

impl From<TargetError> for LoadFailure {
    fn from(err: TargetError) -> Self {
        LoadFailure::Target(err)
    }
}

fn resolution(message: String) -> LoadFailure {
    LoadFailure::Bootstrap(BootstrapError::Resolution(message))
}

/// Runs the launcher's startup sequence against a host.
pub struct Dispatcher<'t, H: Host> {
    config: LauncherConfig,
    table: FrozenTable<'t>,
    host: H,
    streams: Streams,
    site: Box<dyn SiteExpander>,
}

impl<'t, H: Host> Dispatcher<'t, H> {
    pub fn new(config: LauncherConfig, table: FrozenTable<'t>, host: H, streams: Streams) -> Self {
        Self {
            config,
            table,
            host,
            streams,
            site: Box::new(PthSiteExpander::new()),
        }
    }

    /// Replace the `.pth` site expander.
    pub fn with_site_expander(mut self, site: Box<dyn SiteExpander>) -> Self {
        self.site = site;
        self
    }

    /// Run once.
    pub fn run(&mut self, invocation: Invocation) -> Completion {
        let flags = Flags::from_environment(&invocation.env, &self.config.env);
        let program_name = invocation
            .executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.name.clone());
        let mut ctx = BootstrapContext::new(program_name, invocation.executable.clone(), invocation.cwd.clone(), flags);

        let status = match self.bootstrap(&mut ctx, &invocation) {
            Ok(status) => status,
            Err(err) => {
                self.report(&ctx, &err);
                err.exit_code()
            }
        };

        if let Err(err) = self.streams.flush() {
            tracing::warn!(error = %err, "failed to flush output streams");
        }
        ctx.enter(Phase::Exited);
        tracing::debug!(status, mode = ctx.mode.as_ref().map(ExecutionMode::kind), "run finished");
        Completion { status, context: ctx }
    }

    // ── diagnostics ─────────────────────────────────────────────────────────

    fn write_err(&mut self, text: &str) {
        if let Err(err) = self.streams.stderr.write_all(text.as_bytes()) {
            tracing::warn!(error = %err, "failed to write diagnostics");
        }
    }

    fn log(&mut self, ctx: &BootstrapContext, line: &str) {
        self.write_err(&format!("{}: {}\n", ctx.program_name, line));
    }

    fn log_error(&mut self, ctx: &BootstrapContext, line: &str) {
        self.write_err(&format!("{} error: {}\n", ctx.program_name, line));
    }

    fn log_warning(&mut self, ctx: &BootstrapContext, line: &str) {
        self.write_err(&format!("{} warning: {}\n", ctx.program_name, line));
    }

    fn report(&mut self, ctx: &BootstrapContext, err: &BootstrapError) {
        if err.wants_usage() {
            let help = usage::help_text(&self.config);
            self.write_err(&help);
            self.write_err(&format!("*** Error: {}\n", err));
            return;
        }
        match err {
            BootstrapError::Target(target) => self.write_err(&target.render()),
            other => self.log_error(ctx, &other.to_string()),
        }
    }

    // ── state machine ───────────────────────────────────────────────────────

    fn bootstrap(&mut self, ctx: &mut BootstrapContext, invocation: &Invocation) -> Result<i32, BootstrapError> {
        let mut positional = invocation.args.clone();
        let mut payload = None;

        if self.config.is_runtime_name(&ctx.program_name) {
            match parse_command_line(&invocation.args, ctx)? {
                ParseOutcome::Help => {
                    let help = usage::help_text(&self.config);
                    self.write_err(&help);
                    return Ok(0);
                }
                ParseOutcome::Version => {
                    writeln!(self.streams.stdout, "{}", self.config.version_line())?;
                    return Ok(0);
                }
                ParseOutcome::Run(parsed) => {
                    for warning in &parsed.warnings {
                        self.log_warning(ctx, warning);
                    }
                    positional = parsed.positional;
                    payload = parsed.payload;
                }
            }
            ctx.run_mode = if positional.is_empty() && payload.is_none() && invocation.stdin_is_tty {
                RunMode::Interactive
            } else {
                RunMode::Script
            };
        } else {
            ctx.run_mode = RunMode::AppSelf;
        }
        tracing::debug!(run_mode = ?ctx.run_mode, program = %ctx.program_name, "run mode selected");

        if ctx.flags.unbuffered {
            if ctx.flags.debug > 1 {
                self.log(ctx, "Enabling unbuffered mode");
            }
            self.streams.set_unbuffered();
        }
        if ctx.flags.debug > 0 {
            let info = usage::debug_info(ctx, &self.config);
            self.write_err(&info);
        }

        ctx.enter(Phase::Dispatching);
        let mode = self.select_mode(ctx, positional, payload)?;
        ctx.mode = Some(mode.clone());

        self.setup_search_path(ctx, invocation, &mode);

        ctx.enter(Phase::Executing);
        self.execute(ctx, mode)
    }

    fn select_mode(
        &mut self,
        ctx: &mut BootstrapContext,
        positional: Vec<String>,
        payload: Option<Payload>,
    ) -> Result<ExecutionMode, BootstrapError> {
        let mode = match ctx.run_mode {
            RunMode::AppSelf => {
                ctx.target_argv = std::iter::once(ctx.executable.display().to_string())
                    .chain(positional)
                    .collect();
                ExecutionMode::AppSelf
            }
            RunMode::Interactive => {
                ctx.target_argv = vec![String::new()];
                ExecutionMode::Interactive
            }
            RunMode::Script | RunMode::Undetermined => match payload {
                Some(Payload::InlineString(source)) => {
                    ctx.target_argv = std::iter::once("-c".to_string()).chain(positional).collect();
                    ExecutionMode::InlineString { source }
                }
                Some(Payload::Module(name)) => {
                    ctx.target_argv = std::iter::once(name.clone()).chain(positional).collect();
                    ExecutionMode::Module { name }
                }
                None if positional.is_empty() || positional[0] == "-" => {
                    let bytes = self.streams.read_stdin()?;
                    ctx.target_argv = if positional.is_empty() {
                        vec![String::new()]
                    } else {
                        positional
                    };
                    if ctx.flags.bytecode {
                        ExecutionMode::CodeString { bytes }
                    } else {
                        let source = String::from_utf8(bytes).map_err(|_| {
                            BootstrapError::Resolution("standard input is not valid UTF-8".to_string())
                        })?;
                        ExecutionMode::InlineString { source }
                    }
                }
                None => {
                    let mode = classify_reference(&positional[0], ctx.flags.bytecode, &self.config);
                    ctx.target_argv = positional;
                    mode
                }
            },
        };
        tracing::debug!(mode = mode.kind(), argv = ?ctx.target_argv, "execution mode selected");
        Ok(mode)
    }

    fn setup_search_path(&mut self, ctx: &mut BootstrapContext, invocation: &Invocation, mode: &ExecutionMode) {
        let home = invocation.env.home();
        let installation = Installation::locate(&ctx.executable, &self.config, home.as_deref());
        let script = match mode {
            ExecutionMode::AppSelf => Some(ctx.executable.as_path()),
            other => other.script_reference(),
        };
        let inputs = PathInputs {
            script,
            cwd: &ctx.cwd,
            env: &invocation.env,
            names: &self.config.env,
            flags: &ctx.flags,
            installation: &installation,
        };
        let resolved = resolve_search_path(&inputs, self.site.as_mut());

        if ctx.flags.debug > 1 {
            self.log(ctx, "Setting up search path");
            self.log(ctx, "  search path before cleanup:");
            for entry in &resolved.candidates {
                self.log(ctx, &format!("    {}", entry.display()));
            }
            self.log(ctx, "  search path final version:");
            for entry in &resolved.entries {
                self.log(ctx, &format!("    {}", entry.display()));
            }
            for directive in &resolved.directives {
                self.log(ctx, &format!("  site directive not executed: {}", directive));
            }
        }

        ctx.search_path = resolved.entries;
        ctx.site_directives = resolved.directives;
    }

    // ── execution ───────────────────────────────────────────────────────────

    fn execute(&mut self, ctx: &mut BootstrapContext, mode: ExecutionMode) -> Result<i32, BootstrapError> {
        let mut finder = ModuleFinder::new(self.table.clone(), ctx.search_path.clone(), &self.config, self.host.magic());
        let banner = usage::banner(&self.config);

        let outcome = match self.load(ctx, &mode, &mut finder) {
            Ok(None) => return self.interact(ctx, &finder, &banner),
            Ok(Some(target)) => self.run_target(ctx, &finder, &mode, &target),
            Err(LoadFailure::Bootstrap(err)) => return Err(err),
            Err(LoadFailure::Target(err)) => Err(HostError::Raised(err)),
        };

        match outcome {
            Ok(()) if ctx.flags.inspect => self.interact(ctx, &finder, &banner),
            Ok(()) => Ok(0),
            Err(HostError::Exit(status)) => Ok(status),
            Err(HostError::Raised(err)) if ctx.flags.inspect => {
                self.write_err(&err.render());
                self.interact(ctx, &finder, "")
            }
            Err(HostError::Raised(err)) => Err(BootstrapError::Target(err)),
        }
    }

    fn run_target(
        &mut self,
        ctx: &mut BootstrapContext,
        finder: &ModuleFinder<'_>,
        mode: &ExecutionMode,
        target: &LoadedTarget,
    ) -> Result<(), HostError> {
        if ctx.flags.debug > 1 {
            self.log(ctx, &format!("Executing '{}' in mode '{}'", target.filename, mode.kind()));
            self.log(ctx, &format!("  argv={:?}", ctx.target_argv));
            let path: Vec<String> = finder.search_path().iter().map(|p| p.display().to_string()).collect();
            self.log(ctx, &format!("  path={:?}", path));
        }
        let mut env = HostEnv {
            finder,
            argv: &ctx.target_argv,
            flags: &ctx.flags,
            warnings: &mut ctx.warnings,
            streams: &mut self.streams,
        };
        self.host.run_main(&target.code, &target.filename, &mut env)
    }

    fn interact(&mut self, ctx: &mut BootstrapContext, finder: &ModuleFinder<'_>, banner: &str) -> Result<i32, BootstrapError> {
        tracing::debug!("entering interactive loop");
        let mut env = HostEnv {
            finder,
            argv: &ctx.target_argv,
            flags: &ctx.flags,
            warnings: &mut ctx.warnings,
            streams: &mut self.streams,
        };
        match self.host.interact(banner, &mut env) {
            Ok(()) => Ok(0),
            Err(HostError::Exit(status)) => Ok(status),
            Err(HostError::Raised(err)) => Err(BootstrapError::Target(err)),
        }
    }

    /// Load the target's code. `Ok(None)` means interactive mode.
    fn load(
        &mut self,
        ctx: &mut BootstrapContext,
        mode: &ExecutionMode,
        finder: &mut ModuleFinder<'_>,
    ) -> Result<Option<LoadedTarget>, LoadFailure> {
        let verbose = ctx.flags.verbose > 0;
        let optimize = ctx.flags.optimize;

        let target = match mode {
            ExecutionMode::Interactive => return Ok(None),
            ExecutionMode::Script { path } => {
                if verbose {
                    self.log(ctx, &format!("Running '{}' as script", path.display()));
                }
                let source = fs::read_to_string(path)
                    .map_err(|_| resolution(format!("Could not find/read script file '{}'", path.display())))?;
                let filename = path.display().to_string();
                LoadedTarget {
                    code: self.host.compile(&source, &filename, optimize)?,
                    filename,
                }
            }
            ExecutionMode::CodeFile { path } => {
                if verbose {
                    self.log(ctx, &format!("Running '{}' as bytecode file", path.display()));
                }
                let bytes = fs::read(path)
                    .map_err(|_| resolution(format!("Could not find/read script file '{}'", path.display())))?;
                let code = strip_code_header(&bytes, self.host.magic())
                    .ok_or_else(|| resolution(format!("Incompatible bytecode file '{}'", path.display())))?;
                LoadedTarget {
                    code: code.to_vec(),
                    filename: path.display().to_string(),
                }
            }
            ExecutionMode::InlineString { source } => {
                if verbose {
                    self.log(ctx, "Running inline string");
                }
                let filename = if ctx.target_argv.first().map(String::as_str) == Some("-c") {
                    "<string>"
                } else {
                    "<stdin>"
                };
                LoadedTarget {
                    code: self.host.compile(source, filename, optimize)?,
                    filename: filename.to_string(),
                }
            }
            ExecutionMode::CodeString { bytes } => {
                if verbose {
                    self.log(ctx, "Running bytecode string");
                }
                let code = strip_code_header(bytes, self.host.magic())
                    .ok_or_else(|| resolution("Incompatible bytecode string".to_string()))?;
                LoadedTarget {
                    code: code.to_vec(),
                    filename: "<stdin>".to_string(),
                }
            }
            ExecutionMode::Module { name } => {
                if verbose {
                    self.log(ctx, &format!("Running '{}' as module", name));
                }
                self.load_module(ctx, name, finder, optimize)?
            }
            ExecutionMode::PathEntry { path } => {
                if verbose {
                    self.log(ctx, &format!("Running '{}' as path", path.display()));
                }
                self.load_path(path, false, finder, optimize)?
            }
            ExecutionMode::AppSelf => {
                let executable = ctx.executable.clone();
                if verbose {
                    self.log(ctx, &format!("Running '{}' as path", executable.display()));
                }
                self.load_path(&executable, true, finder, optimize)?
            }
        };
        Ok(Some(target))
    }

    fn load_module(
        &mut self,
        ctx: &mut BootstrapContext,
        name: &str,
        finder: &ModuleFinder<'_>,
        optimize: u8,
    ) -> Result<LoadedTarget, LoadFailure> {
        let could_not_run = |reason: String| resolution(format!("Could not run '{}': {}", name, reason));

        // Every enclosing package must resolve on its own; a blocked parent
        // blocks everything beneath it.
        for (at, _) in name.match_indices('.') {
            let parent = &name[..at];
            let located = finder.find(parent).map_err(|e| could_not_run(e.to_string()))?;
            if !located.is_package {
                return Err(could_not_run(format!(
                    "No module named '{}'; '{}' is not a package",
                    name, parent
                )));
            }
        }

        let mut located = finder.find(name).map_err(|e| could_not_run(e.to_string()))?;
        if located.is_package {
            let main = format!("{}.{}", name, self.config.entry_point);
            located = finder.find(&main).map_err(|_| {
                could_not_run(format!(
                    "No module named '{}'; '{}' is a package and cannot be directly executed",
                    main, name
                ))
            })?;
        }

        if let Some(first) = ctx.target_argv.first_mut() {
            *first = located.origin.clone();
        }
        let code = match located.code {
            ModuleCode::Compiled(code) => code,
            ModuleCode::Source(source) => self.host.compile(&source, &located.origin, optimize)?,
            ModuleCode::Namespace => {
                return Err(could_not_run(format!("'{}' is a namespace package without code", located.name)))
            }
        };
        Ok(LoadedTarget {
            code,
            filename: located.origin,
        })
    }

    /// Entry point file inside a directory: source suffixes first.
    fn entry_in_directory(&self, dir: &Path) -> Option<(PathBuf, bool)> {
        let sources = self.config.source_suffixes.iter().map(|s| (s, false));
        let compiled = self.config.bytecode_suffixes.iter().map(|s| (s, true));
        sources
            .chain(compiled)
            .map(|(suffix, is_compiled)| (dir.join(format!("{}{}", self.config.entry_point, suffix)), is_compiled))
            .find(|(path, _)| path.is_file())
    }

    fn entry_in_archive(&self, archive: &Archive) -> Option<(String, bool)> {
        let sources = self.config.source_suffixes.iter().map(|s| (s, false));
        let compiled = self.config.bytecode_suffixes.iter().map(|s| (s, true));
        sources
            .chain(compiled)
            .map(|(suffix, is_compiled)| (format!("{}{}", self.config.entry_point, suffix), is_compiled))
            .find(|(member, _)| archive.contains(member))
    }

    fn code_from_bytes(
        &self,
        bytes: Vec<u8>,
        is_compiled: bool,
        origin: &str,
        optimize: u8,
    ) -> Result<Vec<u8>, LoadFailure> {
        if is_compiled {
            return strip_code_header(&bytes, self.host.magic())
                .map(<[u8]>::to_vec)
                .ok_or_else(|| resolution(format!("Incompatible bytecode file '{}'", origin)));
        }
        let source = String::from_utf8(bytes)
            .map_err(|_| resolution(format!("Could not run '{}': source is not valid UTF-8", origin)))?;
        Ok(self.host.compile(&source, origin, optimize)?)
    }

    fn load_path(
        &mut self,
        path: &Path,
        app: bool,
        finder: &mut ModuleFinder<'_>,
        optimize: u8,
    ) -> Result<LoadedTarget, LoadFailure> {
        let display = path.display().to_string();
        let missing_entry = || {
            resolution(format!(
                "Could not run '{}': can't find '{}' module in '{}'",
                display, self.config.entry_point, display
            ))
        };

        if path.is_dir() {
            let (file, is_compiled) = self.entry_in_directory(path).ok_or_else(missing_entry)?;
            let origin = file.display().to_string();
            let bytes = fs::read(&file).map_err(|_| resolution(format!("Could not find/read script file '{}'", origin)))?;
            let code = self.code_from_bytes(bytes, is_compiled, &origin, optimize)?;
            finder.prepend(path.to_path_buf());
            return Ok(LoadedTarget { code, filename: origin });
        }

        if !path.is_file() {
            return Err(resolution(format!("Could not find/read script file '{}'", display)));
        }

        let archive = Archive::open(path)
            .map_err(|e| resolution(format!("Could not find/read script file '{}': {}", display, e)))?;
        match archive {
            Some(mut archive) => {
                let (member, is_compiled) = self.entry_in_archive(&archive).ok_or_else(missing_entry)?;
                let origin = archive.member_origin(&member);
                let bytes = archive
                    .read(&member)
                    .map_err(|e| resolution(format!("Could not run '{}': {}", display, e)))?;
                let code = self.code_from_bytes(bytes, is_compiled, &origin, optimize)?;
                finder.prepend(path.to_path_buf());
                Ok(LoadedTarget { code, filename: origin })
            }
            None if app => Err(resolution(format!("Could not run '{}': app missing appended archive", display))),
            None => {
                let bytes = fs::read(path).map_err(|_| resolution(format!("Could not find/read script file '{}'", display)))?;
                let code = self.code_from_bytes(bytes, false, &display, optimize)?;
                Ok(LoadedTarget { code, filename: display })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mini::MiniHost;
    use crate::streams::testing::{captured, Capture};

    struct Outcome {
        completion: Completion,
        out: Capture,
        err: Capture,
    }

    fn invoke(program: &str, args: &[&str], cwd: &Path, stdin: &str, tty: bool) -> Outcome {
        let (streams, out, err) = captured(stdin);
        let mut dispatcher = Dispatcher::new(LauncherConfig::default(), FrozenTable::empty(), MiniHost::new(), streams);
        let invocation = Invocation {
            executable: cwd.join("bin").join(program),
            args: args.iter().map(|s| s.to_string()).collect(),
            cwd: cwd.to_path_buf(),
            env: Environment::new(),
            stdin_is_tty: tty,
        };
        Outcome {
            completion: dispatcher.run(invocation),
            out,
            err,
        }
    }

    #[test]
    fn test_inline_string_argv() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-c", "print(argv)", "a", "-v"], temp.path(), "", false);
        assert_eq!(o.completion.status, 0);
        assert_eq!(o.out.text(), "['-c', 'a', '-v']\n");
        assert_eq!(o.completion.context.flags.verbose, 0);
    }

    #[test]
    fn test_filter_mode_reads_stdin() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &[], temp.path(), "print('from stdin', argv)\n", false);
        assert_eq!(o.completion.status, 0);
        assert_eq!(o.out.text(), "from stdin ['']\n");
        assert_eq!(o.completion.context.run_mode, RunMode::Script);
    }

    #[test]
    fn test_tty_without_arguments_is_interactive() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &[], temp.path(), "print(6 * 7)\n", true);
        assert_eq!(o.completion.status, 0);
        assert_eq!(o.completion.context.mode, Some(ExecutionMode::Interactive));
        assert_eq!(o.out.text(), "42\n");
        assert!(o.err.text().contains(">>> "));
    }

    #[test]
    fn test_version_and_help_streams() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-V"], temp.path(), "", false);
        assert_eq!(o.completion.status, 0);
        assert!(o.out.text().starts_with("frozenrun "));
        assert!(o.err.text().is_empty());

        let o = invoke("frozenrun", &["-h"], temp.path(), "", false);
        assert_eq!(o.completion.status, 0);
        assert!(o.out.text().is_empty());
        assert!(o.err.text().starts_with("Usage: frozenrun"));
    }

    #[test]
    fn test_usage_error_prints_help_and_reason() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-Z"], temp.path(), "", false);
        assert_eq!(o.completion.status, 1);
        assert!(o.err.text().contains("Usage: frozenrun"));
        assert!(o.err.text().ends_with("*** Error: Unknown option -Z\n"));
    }

    #[test]
    fn test_unsupported_flag_is_prefixed_error() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-R", "x.py"], temp.path(), "", false);
        assert_eq!(o.completion.status, 1);
        assert_eq!(o.err.text(), "frozenrun error: Hash randomization (-R) is not supported\n");
    }

    #[test]
    fn test_missing_script_is_resolution_error() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["nope.py"], temp.path(), "", false);
        assert_eq!(o.completion.status, 1);
        assert!(o.err.text().starts_with("frozenrun error: Could not find/read script file 'nope.py'"));
    }

    #[test]
    fn test_verbose_reports_mode() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("hello.py");
        fs::write(&script, "print('hello')\n").unwrap();
        let o = invoke("frozenrun", &["-v", script.to_str().unwrap()], temp.path(), "", false);
        assert_eq!(o.completion.status, 0);
        assert_eq!(o.out.text(), "hello\n");
        assert!(o
            .err
            .text()
            .contains(&format!("frozenrun: Running '{}' as script", script.display())));
    }

    #[test]
    fn test_debug_dump() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-dd", "-c", "pass"], temp.path(), "", false);
        let err = o.err.text();
        assert!(err.contains("### frozenrun debug information"));
        assert!(err.contains("debug = 2"));
        assert!(err.contains("frozenrun: Setting up search path"));
        assert!(err.contains("frozenrun: Executing '<string>' in mode 'string'"));
    }

    #[test]
    fn test_syntax_error_with_inspect_enters_loop() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-i", "-c", "1 +"], temp.path(), "", false);
        assert_eq!(o.completion.status, 0);
        assert!(o.err.text().contains("SyntaxError"));
        assert!(o.err.text().contains(">>> "));
    }

    #[test]
    fn test_exit_status_from_target() {
        let temp = tempfile::tempdir().unwrap();
        let o = invoke("frozenrun", &["-c", "exit(7)"], temp.path(), "", false);
        assert_eq!(o.completion.status, 7);
        assert_eq!(o.completion.context.phase(), Phase::Exited);
    }
}
