//! Search path resolution
//!
//! Builds the ordered search path from the script location, the path
//! environment variable, and the installation layout:
//! 1. Script directory (or working directory), unless safe-path
//! 2. Path variable entries, normalised, unless ignore-environment
//! 3. Library directory and its native extension directory
//! 4. Site directory, verbatim or through the site expander
//! 5. User site directory, unless skipped
//! 6. Drop entries that don't exist, keeping order

use std::path::{Component, Path, PathBuf};

use crate::config::{EnvNames, Installation};
use crate::context::Flags;
use crate::env::Environment;
use crate::site::SiteExpander;

/// Make `path` absolute, with limited `~` expansion.
///
/// Only a bare `~` and a leading `~/` are expanded. Relative paths are
/// joined to `cwd`, then `.` and `..` components are folded lexically.
pub fn normalize_path(path: &str, cwd: &Path, home: Option<&Path>) -> PathBuf {
    let path = path.trim();
    let expanded = match (path, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (p, Some(home)) if p.starts_with("~/") || p.starts_with("~\\") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    fold_components(&absolute)
}

fn fold_components(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Everything path resolution reads.
pub struct PathInputs<'a> {
    /// Script, bytecode file or path entry being run, if any
    pub script: Option<&'a Path>,
    pub cwd: &'a Path,
    pub env: &'a Environment,
    pub names: &'a EnvNames,
    pub flags: &'a Flags,
    pub installation: &'a Installation,
}

/// Result of path resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Candidates before the existence filter
    pub candidates: Vec<PathBuf>,

    /// Final search path
    pub entries: Vec<PathBuf>,

    /// Directives reported by the site expander, in discovery order
    pub directives: Vec<String>,
}

/// Resolve the search path.
pub fn resolve_search_path(inputs: &PathInputs<'_>, site: &mut dyn SiteExpander) -> ResolvedPath {
    let home = inputs.env.home();
    let home = home.as_deref();
    let normalize = |p: &str| normalize_path(p, inputs.cwd, home);

    let mut resolved = ResolvedPath::default();
    let candidates = &mut resolved.candidates;

    if !inputs.flags.safe_path {
        let dir = match inputs.script {
            Some(script) => {
                let script = normalize(&script.to_string_lossy());
                script
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or(script)
            }
            None => normalize(&inputs.cwd.to_string_lossy()),
        };
        tracing::trace!(dir = %dir.display(), "search path: script directory");
        candidates.push(dir);
    }

    if !inputs.flags.ignore_environment {
        if let Some(value) = inputs.env.get(&inputs.names.path) {
            for entry in std::env::split_paths(value) {
                candidates.push(normalize(&entry.to_string_lossy()));
            }
        }
    }

    let installation = inputs.installation;
    candidates.push(normalize(&installation.lib.to_string_lossy()));
    candidates.push(normalize(&installation.lib_dynload.to_string_lossy()));

    let mut site_dirs = vec![normalize(&installation.site_packages.to_string_lossy())];
    if !inputs.flags.skip_site_main && !inputs.flags.skip_user_site {
        if let Some(user_site) = &inputs.installation.user_site {
            site_dirs.push(user_site.clone());
        }
    }

    for dir in site_dirs {
        if inputs.flags.ignore_pth_files {
            candidates.push(dir);
            continue;
        }
        let expansion = site.expand(&dir, &candidates[..]);
        for extra in expansion.directories {
            if !candidates.contains(&extra) {
                candidates.push(extra);
            }
        }
        resolved.directives.extend(expansion.directives);
    }

    resolved.entries = resolved
        .candidates
        .iter()
        .filter(|p| p.exists())
        .cloned()
        .collect();

    tracing::debug!(
        candidates = resolved.candidates.len(),
        entries = resolved.entries.len(),
        "resolved search path"
    );
    resolved
}
