//! `frozenrun-freeze build`: compile source trees into a frozen table.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use frozenrun_runtime::mini::MiniHost;
use frozenrun_table::{FrozenTableBuilder, TableEncoding};

use crate::collect::collect_units;
use crate::manifest::{Manifest, SourceSpec};
use crate::util::sha256_hex;

const DEFAULT_OUTPUT: &str = "frozen.frz";

/// Command-line settings; each overrides the manifest.
#[derive(Debug, Default)]
pub struct BuildArgs {
    pub manifest: Option<PathBuf>,
    pub sources: Vec<SourceSpec>,
    pub fail_import: Vec<String>,
    pub encoding: Option<TableEncoding>,
    pub output: Option<PathBuf>,
    pub rust_output: Option<PathBuf>,
    pub optimize: u8,
}

/// Settings after merging the manifest with the command line.
#[derive(Debug, PartialEq)]
pub struct BuildPlan {
    pub sources: Vec<SourceSpec>,
    pub fail_import: Vec<String>,
    pub encoding: TableEncoding,
    pub output: PathBuf,
    pub rust_output: Option<PathBuf>,
    pub optimize: u8,
}

impl BuildPlan {
    pub fn merge(manifest: Manifest, args: BuildArgs) -> anyhow::Result<Self> {
        let encoding = match args.encoding {
            Some(encoding) => encoding,
            None => manifest.encoding()?.unwrap_or_default(),
        };
        let sources = if args.sources.is_empty() {
            manifest.sources
        } else {
            args.sources
        };
        let mut fail_import = manifest.fail_import;
        fail_import.extend(args.fail_import);

        Ok(Self {
            sources,
            fail_import,
            encoding,
            output: args
                .output
                .or(manifest.table.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            rust_output: args.rust_output.or(manifest.table.rust_output),
            optimize: args.optimize,
        })
    }
}

pub fn execute(args: BuildArgs) -> anyhow::Result<()> {
    let manifest = match &args.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };
    let plan = BuildPlan::merge(manifest, args)?;
    for identifier in run(&plan)? {
        println!("{}", identifier);
    }
    Ok(())
}

/// Build and write the table; returns the emitted blob identifiers.
pub fn run(plan: &BuildPlan) -> anyhow::Result<Vec<String>> {
    if plan.sources.is_empty() {
        anyhow::bail!("no source directories given (use --source or a manifest)");
    }

    let host = MiniHost::new();
    let namespaces = plan.encoding == TableEncoding::PackageFlag;
    let mut builder = FrozenTableBuilder::new().encoding(plan.encoding);
    for source in &plan.sources {
        let units = collect_units(source, &host, plan.optimize, namespaces)?;
        tracing::info!(source = %source.path.display(), units = units.len(), "collected source tree");
        builder.add_units(units);
    }
    for name in &plan.fail_import {
        builder.fail_import(name.clone());
    }
    let table = builder.build()?;

    write_file(&plan.output, |out| table.write_to(out).map_err(Into::into))?;
    tracing::info!(
        output = %plan.output.display(),
        records = table.records().len(),
        sha256 = %sha256_hex(&table.to_bytes()),
        "wrote frozen table"
    );

    if let Some(rust_output) = &plan.rust_output {
        let source = table.to_rust_source();
        write_file(rust_output, |out| out.write_all(source.as_bytes()).map_err(Into::into))?;
        tracing::info!(output = %rust_output.display(), "wrote Rust source");
    }

    Ok(table.blob_identifiers().to_vec())
}

fn write_file(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write(&mut out).with_context(|| format!("write {}", path.display()))?;
    out.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frozenrun_table::{FrozenTable, Lookup};

    fn source_tree() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg/__init__.py"), "name = 'pkg'\n").unwrap();
        fs::write(temp.path().join("pkg/util.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("tool.py"), "print('tool')\n").unwrap();
        temp
    }

    #[test]
    fn test_command_line_overrides_manifest() {
        let manifest = Manifest::from_toml_str(
            "fail-import = [\"a\"]\n[table]\nencoding = \"signed-size\"\noutput = \"m.frz\"\n[[sources]]\npath = \"m\"\n",
        )
        .unwrap();
        let plan = BuildPlan::merge(
            manifest,
            BuildArgs {
                sources: vec![SourceSpec::parse("cli").unwrap()],
                fail_import: vec!["b".to_string()],
                encoding: Some(TableEncoding::PackageFlag),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(plan.sources, vec![SourceSpec::parse("cli").unwrap()]);
        assert_eq!(plan.fail_import, vec!["a", "b"]);
        assert_eq!(plan.encoding, TableEncoding::PackageFlag);
        assert_eq!(plan.output, PathBuf::from("m.frz"));
    }

    #[test]
    fn test_defaults() {
        let plan = BuildPlan::merge(Manifest::default(), BuildArgs::default()).unwrap();
        assert_eq!(plan.encoding, TableEncoding::PackageFlag);
        assert_eq!(plan.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(plan.rust_output.is_none());
    }

    #[test]
    fn test_build_writes_table_and_source() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        let plan = BuildPlan {
            sources: vec![SourceSpec {
                path: src.path().to_path_buf(),
                prefix: None,
            }],
            fail_import: vec!["tkinter".to_string()],
            encoding: TableEncoding::PackageFlag,
            output: out.path().join("nested/table.frz"),
            rust_output: Some(out.path().join("table.rs")),
            optimize: 0,
        };
        let identifiers = run(&plan).unwrap();
        assert_eq!(identifiers, vec!["_FM_pkg", "_FM_pkg__util", "_FM_tool"]);

        let bytes = fs::read(&plan.output).unwrap();
        let table = FrozenTable::parse(&bytes).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.find("tkinter"), Lookup::ForcedFailure);
        assert!(matches!(table.find("pkg"), Lookup::Found(unit) if unit.is_package));

        let rust = fs::read_to_string(out.path().join("table.rs")).unwrap();
        assert!(rust.contains("FROZEN_MODULES"));
    }

    #[test]
    fn test_same_inputs_same_bytes() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        let plan = |name: &str| BuildPlan {
            sources: vec![SourceSpec {
                path: src.path().to_path_buf(),
                prefix: None,
            }],
            fail_import: vec![],
            encoding: TableEncoding::SignedSize,
            output: out.path().join(name),
            rust_output: None,
            optimize: 0,
        };
        run(&plan("a.frz")).unwrap();
        run(&plan("b.frz")).unwrap();
        assert_eq!(
            fs::read(out.path().join("a.frz")).unwrap(),
            fs::read(out.path().join("b.frz")).unwrap()
        );
    }

    #[test]
    fn test_blacklisting_frozen_unit_fails() {
        let src = source_tree();
        let out = tempfile::tempdir().unwrap();
        let plan = BuildPlan {
            sources: vec![SourceSpec {
                path: src.path().to_path_buf(),
                prefix: None,
            }],
            fail_import: vec!["tool".to_string()],
            encoding: TableEncoding::PackageFlag,
            output: out.path().join("t.frz"),
            rust_output: None,
            optimize: 0,
        };
        let err = run(&plan).unwrap_err();
        assert!(err.to_string().contains("tool"));
        assert!(!plan.output.exists());
    }

    #[test]
    fn test_no_sources() {
        let plan = BuildPlan::merge(Manifest::default(), BuildArgs::default()).unwrap();
        assert!(run(&plan).is_err());
    }
}
