//! Site directory expansion
//!
//! A site directory may hold `.pth` marker files naming further directories
//! to search. Lines starting with `import` are executable directives; they
//! are reported to the caller and never run here.

use std::fs;
use std::path::{Path, PathBuf};

use crate::path::normalize_path;

/// Output of one expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteExpansion {
    /// The site directory followed by the directories its marker files add
    pub directories: Vec<PathBuf>,

    /// `import ...` lines found in marker files
    pub directives: Vec<String>,
}

/// Expands a site directory into an ordered list of directories.
pub trait SiteExpander {
    /// Expand `directory`. `known` holds the entries already on the search
    /// path; expanders should not repeat them.
    fn expand(&mut self, directory: &Path, known: &[PathBuf]) -> SiteExpansion;
}

/// Reads `.pth` files in name order.
#[derive(Debug, Default)]
pub struct PthSiteExpander;

impl PthSiteExpander {
    pub fn new() -> Self {
        Self
    }

    fn marker_files(directory: &Path) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(directory) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name.ends_with(".pth") && !name.starts_with('.')
            })
            .collect();
        files.sort();
        files
    }
}

impl SiteExpander for PthSiteExpander {
    fn expand(&mut self, directory: &Path, known: &[PathBuf]) -> SiteExpansion {
        let mut expansion = SiteExpansion::default();
        let mut seen: Vec<PathBuf> = known.to_vec();

        if !seen.iter().any(|p| p == directory) {
            expansion.directories.push(directory.to_path_buf());
            seen.push(directory.to_path_buf());
        }

        for marker in Self::marker_files(directory) {
            let content = match fs::read_to_string(&marker) {
                Ok(content) => content,
                Err(err) => {
                    tracing::debug!(file = %marker.display(), error = %err, "skipping unreadable site file");
                    continue;
                }
            };

            for line in content.lines() {
                if line.starts_with('#') || line.trim().is_empty() {
                    continue;
                }
                if line.starts_with("import ") || line.starts_with("import\t") {
                    tracing::debug!(file = %marker.display(), directive = line, "site directive recorded, not executed");
                    expansion.directives.push(line.trim_end().to_string());
                    continue;
                }
                let entry = normalize_path(line.trim_end(), directory, None);
                if entry.exists() && !seen.contains(&entry) {
                    seen.push(entry.clone());
                    expansion.directories.push(entry);
                }
            }
        }
        expansion
    }
}
