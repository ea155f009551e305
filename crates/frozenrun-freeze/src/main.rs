//! frozenrun-freeze
//!
//! Build-side companion of the launcher:
//! - `build`: compile source trees into a frozen unit table
//! - `inspect`: list the records of a table
//! - `app`: append an application archive to a launcher executable

mod collect;
mod commands;
mod manifest;
mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use frozenrun_table::TableEncoding;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::build::BuildArgs;
use manifest::SourceSpec;

#[derive(Parser)]
#[command(name = "frozenrun-freeze")]
#[command(about = "Freeze source trees into frozenrun unit tables", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile source trees and write a frozen table
    Build {
        /// Manifest file (freeze.toml)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Source directory, optionally with a unit prefix: DIR[=PREFIX]
        #[arg(long = "source", value_parser = SourceSpec::parse)]
        sources: Vec<SourceSpec>,

        /// Unit name that must always fail to import
        #[arg(long)]
        fail_import: Vec<String>,

        /// Size encoding: package-flag or signed-size
        #[arg(long, value_parser = parse_encoding)]
        encoding: Option<TableEncoding>,

        /// Binary table output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rust source output
        #[arg(long)]
        rust_output: Option<PathBuf>,

        /// Optimization level passed to the compiler (-O, -OO)
        #[arg(short = 'O', action = clap::ArgAction::Count)]
        optimize: u8,
    },

    /// List the records of a binary table
    Inspect {
        /// Table file
        table: PathBuf,
    },

    /// Write a launcher with an appended application archive
    App {
        /// Launcher executable to copy
        #[arg(long)]
        launcher: PathBuf,

        /// Application directory containing __main__.py
        #[arg(long)]
        source: PathBuf,

        /// Output executable
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_encoding(value: &str) -> Result<TableEncoding, String> {
    value.parse()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("FROZENRUN_LOG")
                .unwrap_or_else(|_| "frozenrun_freeze=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            sources,
            fail_import,
            encoding,
            output,
            rust_output,
            optimize,
        } => commands::build::execute(BuildArgs {
            manifest,
            sources,
            fail_import,
            encoding,
            output,
            rust_output,
            optimize,
        }),

        Commands::Inspect { table } => commands::inspect::execute(&table),

        Commands::App {
            launcher,
            source,
            output,
        } => commands::app::execute(&launcher, &source, &output),
    }
}
