//! Temp-file-then-rename commits.
//!
//! The temp file lives next to the target (same filesystem, so the final
//! rename is atomic) and is named after it with a random suffix. Dropping an
//! [`AtomicFile`] without committing deletes the temp file.

use crate::errors::ConfigFileError;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    /// Create the temp file that will replace `target` on commit.
    pub fn create(target: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let target = target.as_ref();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = match target.file_name() {
            Some(name) => format!("{}.", name.to_string_lossy()),
            None => return Err(ConfigFileError::io(target, invalid_target())),
        };

        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(6)
            .tempfile_in(dir)
            .map_err(|source| ConfigFileError::io(target, source))?;

        Ok(Self {
            target: target.to_path_buf(),
            writer: BufWriter::new(temp),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Flush, optionally fsync, and rename the temp file over the target.
    ///
    /// The target keeps its permissions if it already exists.
    pub fn commit(self, sync: bool) -> Result<(), ConfigFileError> {
        let target = self.target;
        let temp = self
            .writer
            .into_inner()
            .map_err(|err| ConfigFileError::io(&target, err.into_error()))?;

        if sync {
            temp.as_file()
                .sync_all()
                .map_err(|source| ConfigFileError::io(temp.path(), source))?;
        }

        if let Ok(metadata) = fs::metadata(&target) {
            fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|source| ConfigFileError::io(temp.path(), source))?;
        }

        debug!(file = %target.display(), temp = %temp.path().display(), "committing file");
        temp.persist(&target)
            .map_err(|err| ConfigFileError::Persist {
                path: target.clone(),
                source: err.error,
            })?;
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn invalid_target() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
}
