//! Environment snapshot
//!
//! The dispatcher never reads the process environment directly; it receives
//! a snapshot so runs are reproducible and tests can inject variables.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Captured environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment. Values that are not valid
    /// Unicode are converted lossily.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| {
                let key = k.into_string().ok()?;
                Some((key, v.to_string_lossy().into_owned()))
            })
            .collect();
        Self { vars }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// A switch is on when set to anything but an empty string or `0`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| {
            let v = v.trim();
            !v.is_empty() && v != "0"
        })
    }

    /// Numeric level. A non-numeric, non-empty value counts as 1.
    pub fn level(&self, key: &str) -> Option<u8> {
        let value = self.get(key)?.trim();
        if value.is_empty() {
            return None;
        }
        Some(value.parse::<u8>().unwrap_or(1))
    }

    /// Home directory used for `~` expansion and the user site.
    pub fn home(&self) -> Option<PathBuf> {
        self.get("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
