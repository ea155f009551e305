//! Module finder
//!
//! Resolves dotted unit names in a fixed order: the frozen table first,
//! then every search path entry. A forced-failure marker in the table ends
//! the search immediately; whatever exists on disk is never consulted.

use std::fs;
use std::path::{Path, PathBuf};

use frozenrun_table::{FrozenTable, Lookup};

use crate::archive::Archive;
use crate::config::LauncherConfig;
use crate::host::strip_code_header;

/// Errors that can occur while locating a unit
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The table blacklists the name
    #[error("import of '{0}' is blocked")]
    Blocked(String),

    /// Nothing provides the name
    #[error("No module named '{0}'")]
    NotFound(String),

    /// A bytecode file with the wrong magic or a short header
    #[error("bad magic number in '{0}'")]
    BadBytecode(String),

    /// A candidate file could not be read
    #[error("could not read '{origin}': {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}

/// Code of a located unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleCode {
    /// Source text to compile
    Source(String),
    /// Compiled code, header already stripped
    Compiled(Vec<u8>),
    /// A directory package without an init unit
    Namespace,
}

/// A located unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedModule {
    pub name: String,
    /// Where the code came from: a path, `archive/member`, or `<frozen>`
    pub origin: String,
    pub is_package: bool,
    pub code: ModuleCode,
}

/// Looks units up in the frozen table and on the search path.
#[derive(Debug, Clone)]
pub struct ModuleFinder<'t> {
    table: FrozenTable<'t>,
    search_path: Vec<PathBuf>,
    source_suffixes: Vec<String>,
    bytecode_suffixes: Vec<String>,
    magic: [u8; 4],
}

impl<'t> ModuleFinder<'t> {
    pub fn new(table: FrozenTable<'t>, search_path: Vec<PathBuf>, config: &LauncherConfig, magic: [u8; 4]) -> Self {
        Self {
            table,
            search_path,
            source_suffixes: config.source_suffixes.clone(),
            bytecode_suffixes: config.bytecode_suffixes.clone(),
            magic,
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Put `entry` in front of the search path.
    pub fn prepend(&mut self, entry: PathBuf) {
        self.search_path.insert(0, entry);
    }

    /// Locate `name`.
    pub fn find(&self, name: &str) -> Result<LocatedModule, ImportError> {
        match self.table.find(name) {
            Lookup::Found(unit) => {
                tracing::trace!(name, "found in frozen table");
                return Ok(LocatedModule {
                    name: name.to_string(),
                    origin: "<frozen>".to_string(),
                    is_package: unit.is_package,
                    code: ModuleCode::Compiled(unit.code.to_vec()),
                });
            }
            Lookup::ForcedFailure => return Err(ImportError::Blocked(name.to_string())),
            Lookup::NotFound => {}
        }

        let parts: Vec<&str> = name.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ImportError::NotFound(name.to_string()));
        }
        let relative = parts.join("/");

        let mut namespace: Option<String> = None;
        for entry in &self.search_path {
            if entry.is_dir() {
                if let Some(found) = self.find_in_directory(entry, name, &relative)? {
                    return Ok(found);
                }
                let dir = entry.join(&relative);
                if namespace.is_none() && dir.is_dir() {
                    namespace = Some(dir.display().to_string());
                }
            } else if entry.is_file() {
                let archive = Archive::open(entry).map_err(|source| ImportError::Io {
                    origin: entry.display().to_string(),
                    source,
                })?;
                if let Some(mut archive) = archive {
                    if let Some(found) = self.find_in_archive(&mut archive, name, &relative)? {
                        return Ok(found);
                    }
                    if namespace.is_none() && archive.contains_dir(&relative) {
                        namespace = Some(archive.member_origin(&relative));
                    }
                }
            }
        }

        match namespace {
            Some(origin) => Ok(LocatedModule {
                name: name.to_string(),
                origin,
                is_package: true,
                code: ModuleCode::Namespace,
            }),
            None => Err(ImportError::NotFound(name.to_string())),
        }
    }

    /// Candidate relative file names for `relative`, packages first.
    fn candidates(&self, relative: &str) -> Vec<(String, bool, bool)> {
        let mut out = Vec::new();
        for (base, is_package) in [(format!("{}/__init__", relative), true), (relative.to_string(), false)] {
            for suffix in &self.source_suffixes {
                out.push((format!("{}{}", base, suffix), is_package, false));
            }
            for suffix in &self.bytecode_suffixes {
                out.push((format!("{}{}", base, suffix), is_package, true));
            }
        }
        out
    }

    fn find_in_directory(&self, dir: &Path, name: &str, relative: &str) -> Result<Option<LocatedModule>, ImportError> {
        for (file, is_package, compiled) in self.candidates(relative) {
            let path = dir.join(&file);
            if !path.is_file() {
                continue;
            }
            let origin = path.display().to_string();
            let bytes = fs::read(&path).map_err(|source| ImportError::Io {
                origin: origin.clone(),
                source,
            })?;
            return self.located(name, origin, is_package, compiled, bytes).map(Some);
        }
        Ok(None)
    }

    fn find_in_archive(&self, archive: &mut Archive, name: &str, relative: &str) -> Result<Option<LocatedModule>, ImportError> {
        for (member, is_package, compiled) in self.candidates(relative) {
            if !archive.contains(&member) {
                continue;
            }
            let origin = archive.member_origin(&member);
            let bytes = archive.read(&member).map_err(|source| ImportError::Io {
                origin: origin.clone(),
                source,
            })?;
            return self.located(name, origin, is_package, compiled, bytes).map(Some);
        }
        Ok(None)
    }

    fn located(
        &self,
        name: &str,
        origin: String,
        is_package: bool,
        compiled: bool,
        bytes: Vec<u8>,
    ) -> Result<LocatedModule, ImportError> {
        let code = if compiled {
            let code = strip_code_header(&bytes, self.magic).ok_or_else(|| ImportError::BadBytecode(origin.clone()))?;
            ModuleCode::Compiled(code.to_vec())
        } else {
            let text = String::from_utf8(bytes).map_err(|err| ImportError::Io {
                origin: origin.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            })?;
            ModuleCode::Source(text)
        };
        tracing::trace!(name, origin = %origin, "found on search path");
        Ok(LocatedModule {
            name: name.to_string(),
            origin,
            is_package,
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::write_zip;
    use crate::host::code_file_bytes;
    use frozenrun_table::FrozenEntry;
    use std::fs::File;

    const MAGIC: [u8; 4] = *b"TEST";

    static JSON: [u8; 3] = [1, 2, 3];
    static RECORDS: &[FrozenEntry<'static>] = &[
        FrozenEntry::package("json", &JSON),
        FrozenEntry::forced_failure("secrets"),
        FrozenEntry::SENTINEL,
    ];

    fn finder(path: Vec<PathBuf>) -> ModuleFinder<'static> {
        let table = FrozenTable::from_records(RECORDS).unwrap();
        ModuleFinder::new(table, path, &LauncherConfig::default(), MAGIC)
    }

    #[test]
    fn test_frozen_table_first() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("json.py"), "x = 1\n").unwrap();

        let found = finder(vec![temp.path().to_path_buf()]).find("json").unwrap();
        assert_eq!(found.origin, "<frozen>");
        assert!(found.is_package);
        assert_eq!(found.code, ModuleCode::Compiled(JSON.to_vec()));
    }

    #[test]
    fn test_forced_failure_never_falls_through() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("secrets.py"), "token = 1\n").unwrap();

        let err = finder(vec![temp.path().to_path_buf()]).find("secrets").unwrap_err();
        assert!(matches!(err, ImportError::Blocked(ref n) if n == "secrets"));
    }

    #[test]
    fn test_directory_lookup_order() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir_all(first.join("pkg")).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("pkg").join("__init__.py"), "a = 1\n").unwrap();
        fs::write(first.join("pkg").join("tool.py"), "b = 2\n").unwrap();
        fs::write(second.join("tool.py"), "c = 3\n").unwrap();

        let finder = finder(vec![first.clone(), second.clone()]);
        let pkg = finder.find("pkg").unwrap();
        assert!(pkg.is_package);
        assert_eq!(pkg.code, ModuleCode::Source("a = 1\n".into()));

        let sub = finder.find("pkg.tool").unwrap();
        assert!(!sub.is_package);
        assert_eq!(sub.code, ModuleCode::Source("b = 2\n".into()));

        let top = finder.find("tool").unwrap();
        assert_eq!(top.origin, second.join("tool.py").display().to_string());
    }

    #[test]
    fn test_bytecode_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("good.pyc"), code_file_bytes(MAGIC, b"blob")).unwrap();
        fs::write(temp.path().join("bad.pyc"), code_file_bytes(*b"ELSE", b"blob")).unwrap();

        let finder = finder(vec![temp.path().to_path_buf()]);
        assert_eq!(finder.find("good").unwrap().code, ModuleCode::Compiled(b"blob".to_vec()));
        assert!(matches!(finder.find("bad"), Err(ImportError::BadBytecode(_))));
    }

    #[test]
    fn test_namespace_package() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("ns").join("inner")).unwrap();
        fs::write(temp.path().join("ns").join("inner").join("mod.py"), "").unwrap();

        let finder = finder(vec![temp.path().to_path_buf()]);
        let ns = finder.find("ns").unwrap();
        assert_eq!(ns.code, ModuleCode::Namespace);
        assert!(ns.is_package);
        assert!(finder.find("ns.inner.mod").is_ok());
    }

    #[test]
    fn test_zip_entry() {
        let temp = tempfile::tempdir().unwrap();
        let zip_path = temp.path().join("lib.zip");
        write_zip(
            File::create(&zip_path).unwrap(),
            &[("helpers/__init__.py", ""), ("helpers/text.py", "name = 'text'\n")],
        );

        let finder = finder(vec![zip_path.clone()]);
        let found = finder.find("helpers.text").unwrap();
        assert_eq!(found.code, ModuleCode::Source("name = 'text'\n".into()));
        assert!(found.origin.ends_with("lib.zip/helpers/text.py"));
        assert!(finder.find("helpers").unwrap().is_package);
    }

    #[test]
    fn test_not_found() {
        let finder = finder(Vec::new());
        assert!(matches!(finder.find("nothing"), Err(ImportError::NotFound(_))));
        assert!(matches!(finder.find("a..b"), Err(ImportError::NotFound(_))));
        assert_eq!(
            finder.find("nothing").unwrap_err().to_string(),
            "No module named 'nothing'"
        );
    }

    #[test]
    fn test_prepend() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("local.py"), "").unwrap();
        let mut finder = finder(Vec::new());
        assert!(finder.find("local").is_err());
        finder.prepend(temp.path().to_path_buf());
        assert!(finder.find("local").is_ok());
    }
}
