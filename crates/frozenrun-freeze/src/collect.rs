//! Source tree collection
//!
//! Maps a directory of `.py` files onto dotted unit names: `a/b.py` is module
//! `a.b`, `a/__init__.py` makes `a` a package, and a directory without
//! `__init__.py` becomes a code-less namespace package when the table
//! encoding can represent one. Hidden entries and `__pycache__` are skipped.

use std::fs;
use std::path::Path;

use anyhow::Context;
use frozenrun_runtime::Host;
use frozenrun_table::CompiledUnit;
use walkdir::{DirEntry, WalkDir};

use crate::manifest::{is_identifier, SourceSpec};

const SOURCE_SUFFIX: &str = ".py";
const PACKAGE_INIT: &str = "__init__.py";

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.depth() > 0 && (name.starts_with('.') || name == "__pycache__")
}

fn contains_source(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .flatten()
        .any(|e| e.file_type().is_file() && e.file_name().to_string_lossy().ends_with(SOURCE_SUFFIX))
}

fn dotted(prefix: &[String], parts: &[String]) -> String {
    prefix.iter().chain(parts).cloned().collect::<Vec<_>>().join(".")
}

/// Compile every unit under `source`.
pub fn collect_units<H: Host>(
    source: &SourceSpec,
    host: &H,
    optimize: u8,
    namespaces: bool,
) -> anyhow::Result<Vec<CompiledUnit>> {
    let root = &source.path;
    if !root.is_dir() {
        anyhow::bail!("source directory {} does not exist", root.display());
    }
    let prefix: Vec<String> = source
        .prefix
        .as_deref()
        .map(|p| p.split('.').map(str::to_string).collect())
        .unwrap_or_default();

    let mut units = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("strip prefix {} from {}", root.display(), entry.path().display()))?;
        let mut parts: Vec<String> = rel.iter().map(|c| c.to_string_lossy().into_owned()).collect();

        if entry.file_type().is_dir() {
            if (parts.is_empty() && prefix.is_empty()) || entry.path().join(PACKAGE_INIT).is_file() {
                continue;
            }
            if !parts.iter().all(|p| is_identifier(p)) || !contains_source(entry.path()) {
                continue;
            }
            let name = dotted(&prefix, &parts);
            if namespaces {
                tracing::debug!(unit = %name, "namespace package");
                units.push(CompiledUnit::package(name, Vec::new()));
            } else {
                tracing::warn!(unit = %name, "namespace packages need the package-flag encoding; skipped");
            }
            continue;
        }

        let Some(file_name) = parts.pop() else { continue };
        let Some(stem) = file_name.strip_suffix(SOURCE_SUFFIX) else { continue };
        let is_package = file_name == PACKAGE_INIT;
        if !is_package {
            parts.push(stem.to_string());
        }
        if parts.is_empty() && prefix.is_empty() {
            tracing::warn!(file = %entry.path().display(), "top-level __init__.py has no unit name; skipped");
            continue;
        }
        if !parts.iter().all(|p| is_identifier(p)) {
            tracing::warn!(file = %entry.path().display(), "not a valid unit name; skipped");
            continue;
        }

        let name = dotted(&prefix, &parts);
        let text = fs::read_to_string(entry.path()).with_context(|| format!("read {}", entry.path().display()))?;
        let filename = entry.path().display().to_string();
        let code = host
            .compile(&text, &filename, optimize)
            .map_err(|err| anyhow::anyhow!("{}", err.render().trim_end()))
            .with_context(|| format!("compile {}", filename))?;
        tracing::debug!(unit = %name, is_package, bytes = code.len(), "compiled unit");
        units.push(if is_package {
            CompiledUnit::package(name, code)
        } else {
            CompiledUnit::module(name, code)
        });
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frozenrun_runtime::mini::MiniHost;
    use std::path::PathBuf;

    fn tree() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        for dir in ["pkg", "ns", "__pycache__", ".hidden", "empty"] {
            fs::create_dir(root.join(dir)).unwrap();
        }
        fs::write(root.join("app.py"), "print('app')\n").unwrap();
        fs::write(root.join("pkg/__init__.py"), "version = 1\n").unwrap();
        fs::write(root.join("pkg/mod.py"), "x = 2\n").unwrap();
        fs::write(root.join("ns/leaf.py"), "y = 3\n").unwrap();
        fs::write(root.join("__pycache__/app.py"), "junk\n").unwrap();
        fs::write(root.join(".hidden/secret.py"), "z = 4\n").unwrap();
        fs::write(root.join("bad-name.py"), "w = 5\n").unwrap();
        fs::write(root.join("notes.txt"), "not code\n").unwrap();
        temp
    }

    fn names(units: &[CompiledUnit]) -> Vec<(String, bool)> {
        units.iter().map(|u| (u.name.clone(), u.is_package)).collect()
    }

    fn spec(path: &Path, prefix: Option<&str>) -> SourceSpec {
        SourceSpec {
            path: PathBuf::from(path),
            prefix: prefix.map(str::to_string),
        }
    }

    #[test]
    fn test_tree_layout() {
        let temp = tree();
        let units = collect_units(&spec(temp.path(), None), &MiniHost::new(), 0, true).unwrap();
        assert_eq!(
            names(&units),
            vec![
                ("app".to_string(), false),
                ("ns".to_string(), true),
                ("ns.leaf".to_string(), false),
                ("pkg".to_string(), true),
                ("pkg.mod".to_string(), false),
            ]
        );
        let ns = units.iter().find(|u| u.name == "ns").unwrap();
        assert!(ns.code.is_empty());
    }

    #[test]
    fn test_namespaces_skipped_when_unrepresentable() {
        let temp = tree();
        let units = collect_units(&spec(temp.path(), None), &MiniHost::new(), 0, false).unwrap();
        assert!(units.iter().all(|u| u.name != "ns"));
        assert!(units.iter().any(|u| u.name == "ns.leaf"));
    }

    #[test]
    fn test_prefix() {
        let temp = tree();
        let units = collect_units(&spec(temp.path(), Some("vendor")), &MiniHost::new(), 0, true).unwrap();
        let all = names(&units);
        assert_eq!(all[0], ("vendor".to_string(), true));
        assert!(all.contains(&("vendor.pkg.mod".to_string(), false)));
    }

    #[test]
    fn test_code_matches_host_compile() {
        let temp = tree();
        let host = MiniHost::new();
        let units = collect_units(&spec(temp.path(), None), &host, 0, true).unwrap();
        let app = units.iter().find(|u| u.name == "app").unwrap();
        let filename = temp.path().join("app.py").display().to_string();
        assert_eq!(app.code, host.compile("print('app')\n", &filename, 0).unwrap());
    }

    #[test]
    fn test_syntax_error_names_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("broken.py"), "x = = 1\n").unwrap();
        let err = collect_units(&spec(temp.path(), None), &MiniHost::new(), 0, true).unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("broken.py"), "{}", text);
        assert!(text.contains("SyntaxError"), "{}", text);
    }

    #[test]
    fn test_missing_directory() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(collect_units(&spec(&missing, None), &MiniHost::new(), 0, true).is_err());
    }
}
