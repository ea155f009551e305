//! Zip path entries
//!
//! Search path entries and runnable path entries may be zip archives,
//! including archives appended to an executable.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

/// An open zip archive.
pub struct Archive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl Archive {
    /// Open `path` as a zip archive. `Ok(None)` means the file exists but is
    /// not an archive.
    pub fn open(path: &Path) -> io::Result<Option<Self>> {
        let file = File::open(path)?;
        match ZipArchive::new(file) {
            Ok(zip) => Ok(Some(Self {
                path: path.to_path_buf(),
                zip,
            })),
            Err(ZipError::Io(err)) if err.kind() != io::ErrorKind::UnexpectedEof => Err(err),
            Err(err) => {
                tracing::trace!(path = %path.display(), error = %err, "not a zip archive");
                Ok(None)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a file member exists.
    pub fn contains(&self, member: &str) -> bool {
        self.zip.index_for_name(member).is_some()
    }

    /// Whether any member lives below `dir/`.
    pub fn contains_dir(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.zip.file_names().any(|name| name.starts_with(&prefix))
    }

    /// Read a member's bytes.
    pub fn read(&mut self, member: &str) -> io::Result<Vec<u8>> {
        let mut file = self.zip.by_name(member).map_err(|err| match err {
            ZipError::Io(err) => err,
            ZipError::FileNotFound => io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not in {}", member, self.path.display()),
            ),
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        })?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Display form of a member, `archive/member`.
    pub fn member_origin(&self, member: &str) -> String {
        format!("{}/{}", self.path.display(), member)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{Seek, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Write a zip with the given members to `out`.
    pub fn write_zip<W: Write + Seek>(out: W, members: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(out);
        for (name, data) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
}
