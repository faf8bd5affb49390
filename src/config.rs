//! Build configuration
//!
//! All knobs of the index builder live on one options struct. `name`,
//! `roots`, and `extensions` are required; everything else has a default
//! matching the common test-runner setup.

use std::path::PathBuf;
use std::thread;

use regex::Regex;

/// Options accepted by [`crate::HasteMap::new`].
#[derive(Debug, Clone)]
pub struct HasteMapOptions {
    /// Directory holding the persisted cache file.
    pub cache_directory: PathBuf,

    /// File extensions to include, without the leading dot.
    pub extensions: Vec<String>,

    /// Paths matching this pattern are excluded from the crawl.
    pub ignore_pattern: Option<Regex>,

    /// Extraction concurrency; `<= 1` runs in-process without a pool.
    pub max_workers: usize,

    /// Paths matching this pattern register as mocks under their stem.
    pub mocks_pattern: Option<Regex>,

    /// Logical project name, part of the cache file identity.
    pub name: String,

    /// Platform tokens recognized in double-extension file names.
    pub platforms: Vec<String>,

    /// Package names under `node_modules` whose files are indexed.
    pub provides_module_node_modules: Vec<String>,

    /// Skip the cache read and start from an empty index.
    pub reset_cache: bool,

    /// Keep `node_modules` files in the file table without extracting.
    pub retain_all_files: bool,

    /// Root directories to crawl.
    pub roots: Vec<PathBuf>,

    /// Abort the build on a module naming collision instead of warning.
    pub throw_on_module_collision: bool,

    /// Permit the watcher crawler, subject to the availability probe.
    pub use_watchman: bool,
}

impl HasteMapOptions {
    pub fn new(
        name: impl Into<String>,
        roots: Vec<PathBuf>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            cache_directory: std::env::temp_dir(),
            extensions,
            ignore_pattern: None,
            max_workers: default_max_workers(),
            mocks_pattern: None,
            name: name.into(),
            platforms: Vec::new(),
            provides_module_node_modules: Vec::new(),
            reset_cache: false,
            retain_all_files: false,
            roots,
            throw_on_module_collision: false,
            use_watchman: true,
        }
    }
}

fn default_max_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
