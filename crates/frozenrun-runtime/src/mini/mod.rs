//! Reference host
//!
//! A small Python-flavoured statement language compiled to a deterministic
//! stack bytecode. It exists so the launcher can run and be tested end to
//! end without an external interpreter:
//! - **lexer** / **compiler**: source to [`code::CodeObject`]
//! - **code**: instruction set and byte form
//! - **value** / **vm**: values and the interpreter loop

pub mod code;
pub mod compiler;
pub mod lexer;
pub mod value;
pub mod vm;

use std::io::Write;

use crate::host::{Host, HostEnv, HostError, TargetError};
use code::CodeObject;
use vm::Interpreter;

/// Bytecode file magic of the reference host.
pub const MAGIC: [u8; 4] = *b"MINI";

/// The reference host.
#[derive(Default)]
pub struct MiniHost {
    interpreter: Interpreter,
}

impl MiniHost {
    pub fn new() -> Self {
        Self::default()
    }
}

fn report(env: &mut HostEnv<'_, '_>, err: &TargetError) -> Result<(), HostError> {
    env.streams
        .stderr
        .write_all(err.render().as_bytes())
        .map_err(|e| HostError::Raised(TargetError::new("OSError", e.to_string())))
}

impl Host for MiniHost {
    fn magic(&self) -> [u8; 4] {
        MAGIC
    }

    fn compile(&self, source: &str, filename: &str, optimize: u8) -> Result<Vec<u8>, TargetError> {
        compiler::compile(source, filename, optimize, false).map(|code| code.to_bytes())
    }

    fn run_main(&mut self, code: &[u8], filename: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError> {
        let code = CodeObject::from_bytes(code)?;
        self.interpreter.namespace("__main__", filename);
        self.interpreter.exec(&code, "__main__", env)
    }

    fn interact(&mut self, banner: &str, env: &mut HostEnv<'_, '_>) -> Result<(), HostError> {
        if !banner.is_empty() {
            writeln!(env.streams.stderr, "{}", banner)
                .map_err(|e| HostError::Raised(TargetError::new("OSError", e.to_string())))?;
        }
        self.interpreter.namespace("__main__", "<stdin>");

        loop {
            let line = env
                .streams
                .read_line(">>> ")
                .map_err(|e| HostError::Raised(TargetError::new("OSError", e.to_string())))?;
            let Some(line) = line else {
                let _ = writeln!(env.streams.stderr);
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            let result = compiler::compile(&line, "<stdin>", env.flags.optimize, true)
                .map_err(HostError::Raised)
                .and_then(|code| self.interpreter.exec(&code, "__main__", env));
            match result {
                Ok(()) => {}
                Err(HostError::Exit(status)) => return Err(HostError::Exit(status)),
                Err(HostError::Raised(err)) => report(env, &err)?,
            }
            env.streams
                .stdout
                .flush()
                .map_err(|e| HostError::Raised(TargetError::new("OSError", e.to_string())))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;
    use crate::context::{Flags, WarningFilter, WarningFilters};
    use crate::finder::ModuleFinder;
    use crate::streams::testing::{captured, Capture};
    use frozenrun_table::{FrozenEntry, FrozenTable};
    use std::path::PathBuf;

    struct Run {
        result: Result<(), HostError>,
        out: Capture,
        err: Capture,
        warnings: WarningFilters,
    }

    fn run_with(source: &str, flags: Flags, warnings: WarningFilters, path: Vec<PathBuf>, stdin: &str) -> Run {
        let table = FrozenTable::empty();
        let finder = ModuleFinder::new(table, path, &LauncherConfig::default(), MAGIC);
        let (mut streams, out, err) = captured(stdin);
        let mut warnings = warnings;
        let argv = vec!["prog.py".to_string(), "one".to_string()];
        let mut host = MiniHost::new();
        let result = match host.compile(source, "prog.py", flags.optimize) {
            Ok(code) => {
                let mut env = HostEnv {
                    finder: &finder,
                    argv: &argv,
                    flags: &flags,
                    warnings: &mut warnings,
                    streams: &mut streams,
                };
                host.run_main(&code, "prog.py", &mut env)
            }
            Err(e) => Err(HostError::Raised(e)),
        };
        Run {
            result,
            out,
            err,
            warnings,
        }
    }

    fn run(source: &str) -> Run {
        run_with(source, Flags::default(), WarningFilters::new(), Vec::new(), "")
    }

    #[test]
    fn test_print_and_arithmetic() {
        let r = run("x = 6\ny = x * 7\nprint('answer', y, y / 4, -x // 4)\n");
        assert!(r.result.is_ok());
        assert_eq!(r.out.text(), "answer 42 10.5 -2\n");
    }

    #[test]
    fn test_division_by_zero_traceback() {
        let r = run("a = 1\nb = a / 0\n");
        match r.result {
            Err(HostError::Raised(err)) => {
                assert_eq!(err.kind, "ZeroDivisionError");
                assert_eq!(err.traceback.len(), 1);
                assert_eq!(err.traceback[0].line, 2);
            }
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn test_argv_len_and_indexing() {
        let r = run("print(len(argv), argv[1], argv[-1][0], str(1.0) + '!')");
        assert_eq!(r.out.text(), "2 one o 1.0!\n");
    }

    #[test]
    fn test_boolean_operators_short_circuit() {
        let r = run("print(0 or 'x', 1 and 2, not 0, None or None)\nx = 0 and (1 / 0)");
        assert!(r.result.is_ok());
        assert_eq!(r.out.text(), "x 2 True None\n");
    }

    #[test]
    fn test_assert_and_optimize() {
        let r = run("assert 1 == 2, 'no'");
        assert!(matches!(r.result, Err(HostError::Raised(ref e)) if e.to_string() == "AssertionError: no"));

        let flags = Flags {
            optimize: 1,
            ..Flags::default()
        };
        let r = run_with("assert 1 == 2, 'no'\nprint('ok')", flags, WarningFilters::new(), Vec::new(), "");
        assert!(r.result.is_ok());
        assert_eq!(r.out.text(), "ok\n");
    }

    #[test]
    fn test_raise_and_exit() {
        let r = run("raise ValueError('bad value')");
        assert!(matches!(r.result, Err(HostError::Raised(ref e)) if e.kind == "ValueError" && e.message == "bad value"));

        assert_eq!(run("exit(3)").result, Err(HostError::Exit(3)));
        assert_eq!(run("exit()").result, Err(HostError::Exit(0)));
        let r = run("exit('stopped')");
        assert_eq!(r.result, Err(HostError::Exit(1)));
        assert_eq!(r.err.text(), "stopped\n");
    }

    #[test]
    fn test_warnings_follow_filters() {
        let r = run("warn('careful')\nwarn('careful')");
        assert_eq!(r.err.text(), "prog.py:1: UserWarning: careful\nprog.py:2: UserWarning: careful\n");

        let mut ignore = WarningFilters::new();
        ignore.add(WarningFilter::parse("ignore").unwrap());
        let r = run_with("warn('careful')", Flags::default(), ignore, Vec::new(), "");
        assert!(r.err.text().is_empty());

        let mut error = WarningFilters::new();
        error.add(WarningFilter::parse("error").unwrap());
        let r = run_with("warn('careful')", Flags::default(), error, Vec::new(), "");
        assert!(matches!(r.result, Err(HostError::Raised(ref e)) if e.kind == "UserWarning"));
    }

    #[test]
    fn test_filter_list_grows_during_execution() {
        let r = run("filterwarnings('ignore')\nwarn('quiet')");
        assert!(r.result.is_ok());
        assert!(r.err.text().is_empty());
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn test_imports_from_search_path() {
        let temp = tempfile::tempdir().unwrap();
        let pkg = temp.path().join("shapes");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("__init__.py"), "kind = 'package'\n").unwrap();
        std::fs::write(pkg.join("square.py"), "def_side = 4\narea = def_side * def_side\n").unwrap();

        let r = run_with(
            "import shapes.square\nprint(shapes.kind, shapes.square.area, __name__)",
            Flags::default(),
            WarningFilters::new(),
            vec![temp.path().to_path_buf()],
            "",
        );
        assert!(r.result.is_ok(), "{:?}", r.result);
        assert_eq!(r.out.text(), "package 16 __main__\n");
    }

    #[test]
    fn test_import_errors() {
        let r = run("import missing");
        assert!(matches!(
            r.result,
            Err(HostError::Raised(ref e)) if e.to_string() == "ModuleNotFoundError: No module named 'missing'"
        ));
    }

    #[test]
    fn test_frozen_import_and_forced_failure() {
        static GREETING: std::sync::OnceLock<Vec<u8>> = std::sync::OnceLock::new();
        let blob = GREETING.get_or_init(|| compiler::compile("text = 'hi'", "<frozen>", 0, false).unwrap().to_bytes());
        let records = [
            FrozenEntry::module("greeting", blob),
            FrozenEntry::forced_failure("blocked"),
            FrozenEntry::SENTINEL,
        ];
        let table = FrozenTable::from_records(&records).unwrap();
        let finder = ModuleFinder::new(table, Vec::new(), &LauncherConfig::default(), MAGIC);
        let (mut streams, out, _) = captured("");
        let flags = Flags::default();
        let mut warnings = WarningFilters::new();
        let mut env = HostEnv {
            finder: &finder,
            argv: &[],
            flags: &flags,
            warnings: &mut warnings,
            streams: &mut streams,
        };
        let mut host = MiniHost::new();

        let code = host.compile("import greeting\nprint(greeting.text)", "m.py", 0).unwrap();
        host.run_main(&code, "m.py", &mut env).unwrap();
        assert_eq!(out.text(), "hi\n");

        let code = host.compile("import blocked", "m.py", 0).unwrap();
        match host.run_main(&code, "m.py", &mut env) {
            Err(HostError::Raised(e)) => {
                assert_eq!(e.kind, "ImportError");
                assert!(e.message.contains("blocked"));
            }
            other => panic!("expected ImportError, got {other:?}"),
        }
    }

    #[test]
    fn test_interactive_session() {
        let table = FrozenTable::empty();
        let finder = ModuleFinder::new(table, Vec::new(), &LauncherConfig::default(), MAGIC);
        let (mut streams, out, err) = captured("x = 2\nx * 21\n1 / 0\nprint('after')\n");
        let flags = Flags::default();
        let mut warnings = WarningFilters::new();
        let mut env = HostEnv {
            finder: &finder,
            argv: &[],
            flags: &flags,
            warnings: &mut warnings,
            streams: &mut streams,
        };

        let result = MiniHost::new().interact("", &mut env);
        assert!(result.is_ok());
        assert_eq!(out.text(), "42\nafter\n");
        assert!(err.text().contains("ZeroDivisionError: division by zero"));
        assert!(err.text().starts_with(">>> "));
    }

    #[test]
    fn test_interactive_exit() {
        let table = FrozenTable::empty();
        let finder = ModuleFinder::new(table, Vec::new(), &LauncherConfig::default(), MAGIC);
        let (mut streams, _, _) = captured("exit(4)\nprint('never')\n");
        let flags = Flags::default();
        let mut warnings = WarningFilters::new();
        let mut env = HostEnv {
            finder: &finder,
            argv: &[],
            flags: &flags,
            warnings: &mut warnings,
            streams: &mut streams,
        };
        assert_eq!(MiniHost::new().interact("banner", &mut env), Err(HostError::Exit(4)));
    }
}
