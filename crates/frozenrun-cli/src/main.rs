//! frozenrun launcher
//!
//! A single executable carrying its own frozen unit table. Run under a name
//! starting with `frozenrun` or `python` it behaves like an interpreter
//! command line; under any other name it runs the archive appended to itself.

mod console;

use std::io::IsTerminal;
use std::path::Path;

use anyhow::Context;
use frozenrun_runtime::mini::MiniHost;
use frozenrun_runtime::{BootstrapError, Dispatcher, Environment, Invocation, LauncherConfig, Streams};
use frozenrun_table::FrozenTable;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static FROZEN_TABLE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/frozen.frz"));
static LAUNCHER_CONFIG: &str = include_str!(concat!(env!("OUT_DIR"), "/launcher.toml"));

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_env("FROZENRUN_LOG").unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let status = match run() {
        Ok(status) => status,
        Err(err) => {
            let executable = std::env::current_exe().ok();
            eprintln!("{} error: {:#}", program_name(executable.as_deref()), err);
            1
        }
    };
    std::process::exit(status);
}

/// Name diagnostics are prefixed with; renamed apps report under their own name.
fn program_name(executable: Option<&Path>) -> String {
    executable
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frozenrun".to_string())
}

fn run() -> anyhow::Result<i32> {
    let config = LauncherConfig::from_toml_str(LAUNCHER_CONFIG).context("invalid embedded launcher configuration")?;
    let table = FrozenTable::parse(FROZEN_TABLE).map_err(BootstrapError::from)?;
    tracing::debug!(units = table.len(), encoding = ?table.encoding(), "embedded table loaded");

    let stdin_is_tty = std::io::stdin().is_terminal();
    let invocation = Invocation::from_process(stdin_is_tty).context("failed to read the process environment")?;

    let mut streams = Streams::stdio();
    if stdin_is_tty {
        match console::EditorConsole::new(Environment::from_process().home()) {
            Ok(console) => streams = streams.with_console(Box::new(console)),
            Err(err) => tracing::warn!(error = %err, "line editing unavailable"),
        }
    }

    let mut dispatcher = Dispatcher::new(config, table, MiniHost::new(), streams);
    let completion = dispatcher.run(invocation);
    Ok(completion.status)
}
