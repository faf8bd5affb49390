//! Cache location, loader, and persister
//!
//! The cache file path is a pure function of the build configuration: the
//! sanitized project name plus an MD5 digest over the builder version,
//! roots, extensions, platforms, and mocks pattern. Changing any of them
//! yields a different path; stale caches are never migrated, just not
//! found.
//!
//! Reads are tolerant: a missing, unreadable, or malformed cache file
//! yields an empty index and a warm-start is simply lost. Writes are
//! whole-file and atomic.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HasteMapError, Result};
use crate::fs_utils::{normalize_path, write_atomic};
use crate::index_data::IndexData;

/// Version token of the builder; bump to invalidate all caches on a
/// format or semantics change.
const CACHE_VERSION: &str = "1";

/// Separator joining the config tokens fed to the digest. NUL cannot
/// appear inside a token, so distinct token lists never collide.
const TOKEN_SEPARATOR: char = '\0';

/// Derive the deterministic cache file path for a build configuration.
pub fn cache_file_path(
    cache_directory: &Path,
    name: &str,
    roots: &[PathBuf],
    extensions: &[String],
    platforms: &[String],
    mocks_pattern: Option<&str>,
) -> PathBuf {
    let mut tokens = vec![CACHE_VERSION.to_string()];
    // Digest the normalized spelling so a canonicalized root hashes the
    // same as the configured one.
    tokens.extend(
        roots
            .iter()
            .map(|r| normalize_path(r).to_string_lossy().into_owned()),
    );
    tokens.extend(extensions.iter().cloned());
    tokens.extend(platforms.iter().cloned());
    tokens.push(mocks_pattern.unwrap_or("").to_string());

    let joined = tokens.join(&TOKEN_SEPARATOR.to_string());
    let digest = md5::compute(joined.as_bytes());

    cache_directory.join(format!("{}-{:x}", sanitize_name(name), digest))
}

/// Replace non-word characters in the project name so it is safe as a
/// file name component.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect()
}

/// Deserialize the cache file, or return an empty index.
///
/// `reset` forces the empty path without attempting the read.
pub fn read(cache_path: &Path, reset: bool) -> IndexData {
    if reset {
        debug!(path = %cache_path.display(), "cache reset requested, starting empty");
        return IndexData::new();
    }

    let bytes = match fs::read(cache_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return IndexData::new(),
        Err(e) => {
            warn!(path = %cache_path.display(), error = %e, "cache read failed, starting empty");
            return IndexData::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %cache_path.display(), error = %e, "cache corrupt, starting empty");
            IndexData::new()
        }
    }
}

/// Serialize the index to the cache path as a single atomic write.
pub fn persist(cache_path: &Path, data: &IndexData) -> Result<()> {
    let bytes = serde_json::to_vec(data).map_err(|e| HasteMapError::PersistFailure {
        path: cache_path.display().to_string(),
        message: e.to_string(),
    })?;
    write_atomic(cache_path, &bytes).map_err(|e| HasteMapError::PersistFailure {
        path: cache_path.display().to_string(),
        message: e.to_string(),
    })
}
