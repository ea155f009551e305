//! `frozenrun-freeze app`: launcher bytes followed by a zip of the
//! application tree. Run under any name not starting with a runtime prefix,
//! the launcher executes the archive's root `__main__.py`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

const ENTRY_POINT: &str = "__main__.py";

/// Relative member paths and their files, in name order.
fn members(root: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name.starts_with('.') || name == "__pycache__")
        })
    {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root)?;
        let member = rel
            .iter()
            .map(|c| c.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        found.push((member, entry.into_path()));
    }
    Ok(found)
}

/// Write the app; returns the number of archived files.
pub fn run(launcher: &Path, source: &Path, output: &Path) -> anyhow::Result<usize> {
    if !source.join(ENTRY_POINT).is_file() {
        anyhow::bail!("{} has no {}", source.display(), ENTRY_POINT);
    }
    let launcher_bytes = fs::read(launcher).with_context(|| format!("read launcher {}", launcher.display()))?;
    let files = members(source)?;

    let mut out = BufWriter::new(File::create(output).with_context(|| format!("create {}", output.display()))?);
    out.write_all(&launcher_bytes)?;
    let mut zip = zip::ZipWriter::new(out);
    for (member, path) in &files {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        zip.start_file(member.as_str(), SimpleFileOptions::default())?;
        zip.write_all(&bytes)?;
    }
    zip.finish()?.flush()?;

    mark_executable(output)?;
    tracing::info!(
        output = %output.display(),
        launcher_bytes = launcher_bytes.len(),
        files = files.len(),
        "wrote app"
    );
    Ok(files.len())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions).with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

pub fn execute(launcher: &Path, source: &Path, output: &Path) -> anyhow::Result<()> {
    let count = run(launcher, source, output)?;
    println!("{} ({} files)", output.display(), count);
    Ok(())
}
