//! Cross-platform filesystem helpers
//!
//! - `write_atomic`: whole-file write via a temp sibling plus rename, so
//!   readers never observe a half-written cache
//! - `normalize_path`: strips the Windows extended-length prefix before a
//!   path becomes a file-table key or a cache digest token

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write `contents` to `dst` as a single atomic replacement.
///
/// The data lands in a `.tmp` sibling first and is renamed into place.
/// On Windows the existing target is deleted before the rename, since
/// `fs::rename` there refuses to replace.
pub fn write_atomic(dst: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = dst.with_extension("tmp");
    fs::write(&tmp, contents)?;

    #[cfg(windows)]
    {
        if dst.exists() {
            fs::remove_file(dst)?;
        }
    }
    fs::rename(&tmp, dst)
}

/// Strip the Windows extended-length prefix, a no-op on Unix.
///
/// Canonicalized Windows paths carry `\\?\` (UNC shares `\\?\UNC\`).
/// The crawlers and the cache key derivation feed paths through here so
/// that the same file never appears under two spellings: a prefixed key
/// would not compare equal to the watcher-reported form, and a prefixed
/// root would change the cache digest.
pub fn normalize_path(path: &Path) -> PathBuf {
    if !cfg!(windows) {
        return path.to_path_buf();
    }

    let raw = path.to_string_lossy();
    match raw.strip_prefix(r"\\?\") {
        Some(rest) => match rest.strip_prefix(r"UNC\") {
            Some(share) => PathBuf::from(format!(r"\\{}", share)),
            None => PathBuf::from(rest),
        },
        None => path.to_path_buf(),
    }
}
