//! Crawler contract and dispatch
//!
//! A crawler takes the prior index plus the include policy and returns an
//! index whose `files` table reflects the current on-disk set: new and
//! changed files reset to unvisited records, unchanged records passed
//! through untouched, removed files deleted. Only the watcher crawler
//! updates `clocks`.
//!
//! Dispatch prefers the watcher crawler when it is enabled and the
//! service probe succeeded; a watcher failure falls back to the native
//! crawler exactly once.

pub mod native;
pub mod watchman;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use crate::config::HasteMapOptions;
use crate::error::{HasteMapError, Result};
use crate::filters::FileFilter;
use crate::index_data::{FileRecord, IndexData};

use self::native::NativeCrawler;
use self::watchman::WatchmanCrawler;

/// Inputs shared by every crawl.
pub struct CrawlRequest<'a> {
    pub roots: &'a [PathBuf],
    pub extensions: &'a [String],
    pub filter: &'a FileFilter,
}

/// The crawl contract: current file set in, under the include policy,
/// with per-file change detection against the prior index.
pub trait Crawler {
    fn crawl(&self, request: &CrawlRequest<'_>, prior: &IndexData) -> Result<IndexData>;
}

/// Select a crawler per the options and run it, retrying watcher
/// failures once on the native crawler.
pub fn crawl(
    options: &HasteMapOptions,
    filter: &FileFilter,
    prior: &IndexData,
) -> Result<IndexData> {
    let request = CrawlRequest {
        roots: &options.roots,
        extensions: &options.extensions,
        filter,
    };

    if options.use_watchman && watchman::is_available() {
        match WatchmanCrawler.crawl(&request, prior) {
            Ok(data) => return Ok(data),
            Err(watcher_err) => {
                warn!(
                    error = %watcher_err,
                    "watcher crawl failed; the watchman service may not be running, or a root \
                     is missing a repository marker (.watchmanconfig, .git, .hg). Retrying once \
                     with the native crawler"
                );
                return NativeCrawler.crawl(&request, prior).map_err(|native_err| {
                    HasteMapError::CrawlRetryFailure {
                        watcher: watcher_err.to_string(),
                        native: native_err.to_string(),
                    }
                });
            }
        }
    }

    NativeCrawler.crawl(&request, prior)
}

/// Whether a path's final extension is on the include whitelist.
pub(crate) fn has_included_extension(path: &std::path::Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e == ext),
        None => false,
    }
}

/// Record for a discovered file: carry the prior record through when the
/// mtime is unchanged, otherwise reset to an unvisited record so the
/// metadata stage re-extracts it.
pub(crate) fn carry_or_reset(
    prior_files: &BTreeMap<String, FileRecord>,
    path: &str,
    mtime: u64,
) -> FileRecord {
    match prior_files.get(path) {
        Some(record) if record.mtime == mtime => record.clone(),
        _ => FileRecord::fresh(mtime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_keeps_unchanged_record() {
        let mut prior = BTreeMap::new();
        prior.insert(
            "/repo/a.js".to_string(),
            FileRecord {
                id: Some("A".to_string()),
                mtime: 10,
                visited: true,
                dependencies: vec!["B".to_string()],
            },
        );

        let carried = carry_or_reset(&prior, "/repo/a.js", 10);
        assert!(carried.visited);
        assert_eq!(carried.id.as_deref(), Some("A"));
    }

    #[test]
    fn changed_mtime_resets_derived_fields() {
        let mut prior = BTreeMap::new();
        prior.insert(
            "/repo/a.js".to_string(),
            FileRecord {
                id: Some("A".to_string()),
                mtime: 10,
                visited: true,
                dependencies: vec!["B".to_string()],
            },
        );

        let reset = carry_or_reset(&prior, "/repo/a.js", 11);
        assert_eq!(reset, FileRecord::fresh(11));
    }

    #[test]
    fn unknown_path_starts_fresh() {
        let reset = carry_or_reset(&BTreeMap::new(), "/repo/new.js", 5);
        assert_eq!(reset, FileRecord::fresh(5));
    }
}
