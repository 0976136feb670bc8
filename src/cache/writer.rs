//! Writer Module
//!
//! Atomic file writes.
//! Content goes to a temporary file in the target's directory and is then
//! renamed over the target, so readers see either the old or the new file,
//! never a partial one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

// == Write Error ==
/// Why an atomic write did not happen.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory {0} is not writable")]
    NotWritable(PathBuf),

    #[error("cannot create temporary file in {path}: {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write temporary file: {0}")]
    Write(#[source] io::Error),

    #[error("cannot move temporary file onto {path}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// == Atomic Writer ==
/// Writes whole files atomically, applying a umask to what it creates.
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    umask: u32,
}

impl AtomicWriter {
    pub fn new(umask: u32) -> Self {
        Self { umask }
    }

    /// Replaces `target` with `content` in one rename.
    pub fn write(&self, target: &Path, content: &[u8]) -> Result<(), WriteError> {
        self.stage(target, content)?.commit()
    }

    /// Writes `content` to a temporary sibling of `target` without publishing it.
    ///
    /// Dropping the returned [`StagedWrite`] discards the temporary file and
    /// leaves `target` untouched.
    pub fn stage(&self, target: &Path, content: &[u8]) -> Result<StagedWrite, WriteError> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        self.ensure_dir(dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix("swap")
            .tempfile_in(dir)
            .map_err(|source| match source.kind() {
                io::ErrorKind::PermissionDenied => WriteError::NotWritable(dir.to_path_buf()),
                _ => WriteError::TempFile {
                    path: dir.to_path_buf(),
                    source,
                },
            })?;

        temp.write_all(content).map_err(WriteError::Write)?;
        temp.flush().map_err(WriteError::Write)?;
        self.apply_file_mode(temp.path()).map_err(WriteError::Write)?;

        Ok(StagedWrite {
            temp,
            target: target.to_path_buf(),
        })
    }

    /// Creates `path` and its parents. An existing directory is success.
    pub fn ensure_dir(&self, path: &Path) -> Result<(), WriteError> {
        if path.is_dir() {
            return Ok(());
        }

        match self.dir_builder().create(path) {
            Ok(()) => Ok(()),
            // Another process may have won the race
            Err(_) if path.is_dir() => Ok(()),
            Err(source) => Err(WriteError::CreateDir {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    #[cfg(unix)]
    fn dir_builder(&self) -> fs::DirBuilder {
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true).mode(0o777 & !self.umask);
        builder
    }

    #[cfg(not(unix))]
    fn dir_builder(&self) -> fs::DirBuilder {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        builder
    }

    #[cfg(unix)]
    fn apply_file_mode(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o666 & !self.umask))
    }

    #[cfg(not(unix))]
    fn apply_file_mode(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

// == Staged Write ==
/// A fully written temporary file waiting to replace its target.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically moves the temporary file onto the target.
    ///
    /// On failure the temporary file is removed.
    pub fn commit(self) -> Result<(), WriteError> {
        let Self { temp, target } = self;
        temp.persist(&target).map_err(|err| WriteError::Rename {
            path: target,
            source: err.error,
        })?;
        Ok(())
    }
}

// == Utility Functions ==
/// True when `dir` accepts new files for the current process.
///
/// Permission bits alone ignore ownership and ACLs, so this creates an
/// anonymous file in `dir` and drops it again.
pub fn is_writable(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}
