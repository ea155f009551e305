//! Launcher configuration and installation layout
//!
//! [`LauncherConfig`] holds the compiled-in constants the dispatcher consults
//! (names, suffixes, environment variable names). Embedders can override any
//! of them from a TOML document. [`Installation`] derives library and site
//! directories from the executable's location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a launcher configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("Failed to parse launcher config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid launcher config: {0}")]
    ValidationError(String),
}

/// Compiled-in launcher constants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct LauncherConfig {
    /// Program name used in diagnostics and the version line
    pub name: String,

    /// Version string
    pub version: String,

    /// Release string shown next to the version
    pub release: String,

    /// Executable name prefixes that select interpreter mode. Any other
    /// executable name runs its appended application archive.
    pub runtime_prefixes: Vec<String>,

    /// Suffixes of source files run as scripts
    pub source_suffixes: Vec<String>,

    /// Suffixes of precompiled bytecode files
    pub bytecode_suffixes: Vec<String>,

    /// Unit run from directories and archives
    pub entry_point: String,

    /// Directory name of the standard library below `lib/`
    pub lib_name: String,

    /// Environment variable names
    pub env: EnvNames,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            name: "frozenrun".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            runtime_prefixes: vec!["frozenrun".to_string(), "python".to_string()],
            source_suffixes: vec![".py".to_string(), ".pyw".to_string()],
            bytecode_suffixes: vec![".pyc".to_string(), ".pyo".to_string()],
            entry_point: "__main__".to_string(),
            lib_name: default_lib_name(),
            env: EnvNames::default(),
        }
    }
}

fn default_lib_name() -> String {
    let mut parts = env!("CARGO_PKG_VERSION").split('.');
    let major = parts.next().unwrap_or("0");
    let minor = parts.next().unwrap_or("0");
    format!("frozenrun{}.{}", major, minor)
}

impl LauncherConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LauncherConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError("name cannot be empty".to_string()));
        }
        if self.entry_point.is_empty() || self.entry_point.contains('.') {
            return Err(ConfigError::ValidationError(format!(
                "entry point must be a plain unit name, got '{}'",
                self.entry_point
            )));
        }
        for suffix in self.source_suffixes.iter().chain(&self.bytecode_suffixes) {
            if !suffix.starts_with('.') {
                return Err(ConfigError::ValidationError(format!(
                    "suffix '{}' must start with '.'",
                    suffix
                )));
            }
        }
        Ok(())
    }

    /// Whether `program` (an executable's file name) selects interpreter mode.
    pub fn is_runtime_name(&self, program: &str) -> bool {
        self.runtime_prefixes.iter().any(|p| program.starts_with(p.as_str()))
    }

    pub fn is_source(&self, reference: &str) -> bool {
        self.source_suffixes.iter().any(|s| reference.ends_with(s.as_str()))
    }

    pub fn is_bytecode(&self, reference: &str) -> bool {
        self.bytecode_suffixes.iter().any(|s| reference.ends_with(s.as_str()))
    }

    /// The `-V` line.
    pub fn version_line(&self) -> String {
        format!("{} {} (release {})", self.name, self.version, self.release)
    }
}

/// Names of the environment variables the launcher reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnvNames {
    pub path: String,
    pub verbose: String,
    pub debug: String,
    pub optimize: String,
    pub inspect: String,
    pub unbuffered: String,
    pub safe_path: String,
    pub ignore_environment: String,
    pub https_verify: String,
}

impl Default for EnvNames {
    fn default() -> Self {
        Self::with_prefix("FROZENRUN")
    }
}

impl EnvNames {
    /// `<PREFIX>_PATH`, `<PREFIX>_VERBOSE`, ...
    pub fn with_prefix(prefix: &str) -> Self {
        let name = |suffix: &str| format!("{}_{}", prefix, suffix);
        Self {
            path: name("PATH"),
            verbose: name("VERBOSE"),
            debug: name("DEBUG"),
            optimize: name("OPTIMIZE"),
            inspect: name("INSPECT"),
            unbuffered: name("UNBUFFERED"),
            safe_path: name("SAFE_PATH"),
            ignore_environment: name("IGNORE_ENVIRONMENT"),
            https_verify: name("HTTPS_VERIFY"),
        }
    }
}

/// Directories of an installed launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// The launcher executable
    pub executable: PathBuf,

    /// Directory holding the executable
    pub bindir: PathBuf,

    /// Parent of `bindir`
    pub prefix: PathBuf,

    /// Standard library directory
    pub lib: PathBuf,

    /// Native extension directory
    pub lib_dynload: PathBuf,

    /// Site directory
    pub site_packages: PathBuf,

    /// Per-user site directory, when a home directory is known
    pub user_site: Option<PathBuf>,
}

impl Installation {
    /// Derive the layout from the executable path.
    ///
    /// The library lives under `<prefix>/lib/<libname>` when that exists
    /// (a regular install), otherwise next to the executable in
    /// `<bindir>/lib/<libname>`.
    pub fn locate(executable: &Path, config: &LauncherConfig, home: Option<&Path>) -> Self {
        let bindir = executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let prefix = bindir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| bindir.clone());

        let installed = prefix.join("lib").join(&config.lib_name);
        let lib = if installed.is_dir() {
            installed
        } else {
            bindir.join("lib").join(&config.lib_name)
        };

        Self {
            executable: executable.to_path_buf(),
            lib_dynload: lib.join("lib-dynload"),
            site_packages: lib.join("site-packages"),
            user_site: home.map(|h| {
                h.join(".local")
                    .join("lib")
                    .join(&config.lib_name)
                    .join("site-packages")
            }),
            bindir,
            prefix,
            lib,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let config = LauncherConfig::default();
        assert!(config.is_runtime_name("frozenrun"));
        assert!(config.is_runtime_name("frozenrun-debug"));
        assert!(config.is_runtime_name("python3"));
        assert!(!config.is_runtime_name("myapp"));
        assert_eq!(config.env.path, "FROZENRUN_PATH");
        assert_eq!(config.env.ignore_environment, "FROZENRUN_IGNORE_ENVIRONMENT");
    }

    #[test]
    fn test_suffixes() {
        let config = LauncherConfig::default();
        assert!(config.is_source("app.py"));
        assert!(config.is_source("gui.pyw"));
        assert!(config.is_bytecode("app.pyc"));
        assert!(config.is_bytecode("app.pyo"));
        assert!(!config.is_source("app.zip"));
        assert!(!config.is_bytecode("app.py"));
    }

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let config = LauncherConfig::from_toml_str(
            r#"
name = "tool"
runtime-prefixes = ["tool"]

[env]
path = "TOOLPATH"
"#,
        )
        .unwrap();
        assert_eq!(config.name, "tool");
        assert_eq!(config.runtime_prefixes, vec!["tool"]);
        assert_eq!(config.env.path, "TOOLPATH");
        assert_eq!(config.env.verbose, "FROZENRUN_VERBOSE");
        assert_eq!(config.entry_point, "__main__");
    }

    #[test]
    fn test_invalid_suffix_rejected() {
        let err = LauncherConfig::from_toml_str("source-suffixes = [\"py\"]").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_installation_falls_back_to_bindir() {
        let temp = tempfile::tempdir().unwrap();
        let config = LauncherConfig::default();
        let exe = temp.path().join("bin").join("frozenrun");

        let layout = Installation::locate(&exe, &config, None);
        assert_eq!(layout.bindir, temp.path().join("bin"));
        assert_eq!(layout.prefix, temp.path());
        assert_eq!(layout.lib, temp.path().join("bin").join("lib").join(&config.lib_name));
        assert_eq!(layout.lib_dynload, layout.lib.join("lib-dynload"));
        assert!(layout.user_site.is_none());
    }

    #[test]
    fn test_installation_prefers_prefix_lib() {
        let temp = tempfile::tempdir().unwrap();
        let config = LauncherConfig::default();
        let lib = temp.path().join("lib").join(&config.lib_name);
        std::fs::create_dir_all(&lib).unwrap();
        let exe = temp.path().join("bin").join("frozenrun");

        let layout = Installation::locate(&exe, &config, Some(Path::new("/home/u")));
        assert_eq!(layout.lib, lib);
        assert_eq!(layout.site_packages, lib.join("site-packages"));
        assert_eq!(
            layout.user_site.unwrap(),
            Path::new("/home/u/.local/lib").join(&config.lib_name).join("site-packages")
        );
    }
}
