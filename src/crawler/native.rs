//! Native directory-walk crawler
//!
//! Walks every root with the `ignore` crate's walker, filtered down to
//! the extension whitelist and the configured ignore predicate. The file
//! table is rebuilt from scratch on every crawl, so removed files simply
//! fall out; unchanged files carry their prior record through.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use tracing::debug;

use crate::error::Result;
use crate::fs_utils::normalize_path;
use crate::index_data::{FileRecord, IndexData};

use super::{carry_or_reset, has_included_extension, CrawlRequest, Crawler};

pub struct NativeCrawler;

impl Crawler for NativeCrawler {
    fn crawl(&self, request: &CrawlRequest<'_>, prior: &IndexData) -> Result<IndexData> {
        let mut files = BTreeMap::new();

        for root in request.roots {
            walk_root(root.as_ref(), request, &prior.files, &mut files);
        }

        Ok(IndexData {
            // The native crawler has no notion of a watcher clock.
            clocks: prior.clocks.clone(),
            files,
            map: prior.map.clone(),
            mocks: prior.mocks.clone(),
        })
    }
}

fn walk_root(
    root: &Path,
    request: &CrawlRequest<'_>,
    prior_files: &BTreeMap<String, FileRecord>,
    files: &mut BTreeMap<String, FileRecord>,
) {
    // Our ignore predicate is the only include policy; the walker's
    // gitignore and hidden-file handling would make crawls depend on
    // repository contents outside the configuration.
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        if !has_included_extension(path, request.extensions) {
            continue;
        }

        // File-table keys use the normalized spelling so they compare
        // equal to watcher-reported and cached paths.
        let path_str = normalize_path(path).to_string_lossy().into_owned();
        if request.filter.ignores(&path_str) {
            continue;
        }

        let mtime = match modified_millis(path) {
            Some(mtime) => mtime,
            None => {
                debug!(path = %path.display(), "could not stat file, skipping");
                continue;
            }
        };

        files.insert(path_str.clone(), carry_or_reset(prior_files, &path_str, mtime));
    }
}

fn modified_millis(path: &Path) -> Option<u64> {
    let modified = path.metadata().ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since_epoch.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FileFilter;
    use regex::Regex;
    use std::fs;
    use tempfile::tempdir;

    fn crawl_once(
        root: &Path,
        extensions: &[&str],
        filter: &FileFilter,
        prior: &IndexData,
    ) -> IndexData {
        let roots = vec![root.to_path_buf()];
        let extensions: Vec<String> = extensions.iter().map(|s| s.to_string()).collect();
        let request = CrawlRequest {
            roots: &roots,
            extensions: &extensions,
            filter,
        };
        NativeCrawler.crawl(&request, prior).unwrap()
    }

    #[test]
    fn finds_only_whitelisted_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.ts"), "").unwrap();
        fs::write(dir.path().join("README"), "").unwrap();

        let data = crawl_once(dir.path(), &["js"], &FileFilter::default(), &IndexData::new());

        assert_eq!(data.files.len(), 1);
        let only = data.files.keys().next().unwrap();
        assert!(only.ends_with("a.js"));
    }

    #[test]
    fn missing_root_yields_empty_table() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("no-such-dir");
        let data = crawl_once(&absent, &["js"], &FileFilter::default(), &IndexData::new());
        assert!(data.files.is_empty());
    }

    #[test]
    fn ignored_paths_are_excluded() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("__fixtures__");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();

        let filter = FileFilter::new(Some(Regex::new(r"__fixtures__").unwrap()), vec![], false);
        let data = crawl_once(dir.path(), &["js"], &filter, &IndexData::new());

        assert_eq!(data.files.len(), 1);
        assert!(data.files.keys().next().unwrap().ends_with("b.js"));
    }

    #[test]
    fn unchanged_files_carry_their_record() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "module").unwrap();
        let filter = FileFilter::default();

        let first = crawl_once(dir.path(), &["js"], &filter, &IndexData::new());
        let path = first.files.keys().next().unwrap().clone();

        // Simulate a completed extraction in the prior index.
        let mut prior = first.clone();
        let record = prior.files.get_mut(&path).unwrap();
        record.visited = true;
        record.id = Some("A".to_string());

        let second = crawl_once(dir.path(), &["js"], &filter, &prior);
        assert_eq!(second.files[&path], prior.files[&path]);
    }

    #[test]
    fn removed_files_fall_out() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "").unwrap();
        let filter = FileFilter::default();

        let first = crawl_once(dir.path(), &["js"], &filter, &IndexData::new());
        assert_eq!(first.files.len(), 1);

        fs::remove_file(&file).unwrap();
        let second = crawl_once(dir.path(), &["js"], &filter, &first);
        assert!(second.files.is_empty());
    }
}
