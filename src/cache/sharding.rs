//! Sharding Module
//!
//! Filename sharding for the file store.
//!
//! Maps an arbitrary key to `<base>/<shard>/<filename><ext>` where the shard
//! is the first byte of the key's SHA-256 in hex. The filename is the key in
//! hex when that fits the platform's path limits, otherwise `_` + the hash.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

// == Path Limits ==
/// Longest single path component most filesystems accept.
const MAX_COMPONENT_LEN: usize = 255;

/// Windows caps a whole path at 260 chars including the terminating NUL,
/// and some APIs already fail at 259.
const MAX_WINDOWS_PATH_LEN: usize = 258;

/// Separators plus the two shard characters: `\xx\`.
const SHARD_OVERHEAD: usize = 4;

// == Shard Layout ==
/// Deterministic key to path mapping rooted at one directory.
#[derive(Debug, Clone)]
pub struct ShardLayout {
    base_dir: PathBuf,
    extension: String,
    base_dir_len: usize,
    windows_limits: bool,
}

impl ShardLayout {
    /// Creates a layout under `base_dir`, which should already be canonical.
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self::with_platform(base_dir, extension, cfg!(windows))
    }

    /// Same as [`ShardLayout::new`] with the whole-path limit toggled explicitly.
    pub fn with_platform(
        base_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        windows_limits: bool,
    ) -> Self {
        let base_dir = base_dir.into();
        let base_dir_len = display_len(&base_dir);
        Self {
            base_dir,
            extension: extension.into(),
            base_dir_len,
            windows_limits,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolves the file that holds `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let hash = hash_key(key);
        let filename = if self.needs_hashed_name(key) {
            format!("_{hash}{}", self.extension)
        } else {
            format!("{}{}", hex::encode(key.as_bytes()), self.extension)
        };

        self.base_dir.join(&hash[..2]).join(filename)
    }

    /// True when a file name matches this layout's extension.
    ///
    /// Without an extension every file belongs to the store.
    pub fn owns(&self, name: &Path) -> bool {
        self.extension.is_empty()
            || name
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(&self.extension))
                .unwrap_or(false)
    }

    fn needs_hashed_name(&self, key: &str) -> bool {
        let encoded_len = key.len() * 2 + self.extension.len();
        key.is_empty()
            || encoded_len > MAX_COMPONENT_LEN
            || (self.windows_limits
                && self.base_dir_len + SHARD_OVERHEAD + encoded_len > MAX_WINDOWS_PATH_LEN)
    }
}

// == Utility Functions ==
/// Length of `path` as the user would write it.
///
/// Canonical Windows paths carry a verbatim prefix (`\\?\C:\...` or
/// `\\?\UNC\server\...`) that does not count against the path limit.
fn display_len(path: &Path) -> usize {
    let raw = path.to_string_lossy();
    if let Some(unc) = raw.strip_prefix(r"\\?\UNC\") {
        return r"\\".len() + unc.len();
    }
    raw.strip_prefix(r"\\?\").unwrap_or(&raw).len()
}

/// Lowercase hex SHA-256 of the key.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
