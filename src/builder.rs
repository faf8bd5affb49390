//! Index build pipeline
//!
//! Four stages run in sequence on the coordinator: load the cache, crawl
//! the roots, rebuild the module tables from per-file metadata, persist.
//! Extraction fans out on the worker pool; everything that mutates the
//! index happens on the coordinator, applied in sorted-path order so
//! collision outcomes are reproducible.
//!
//! `build()` is single-flight per instance: the published result is
//! latched, and later calls return the same facades without running the
//! pipeline again. A failed build does not latch; the next call starts
//! fresh.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache;
use crate::config::HasteMapOptions;
use crate::crawler;
use crate::error::{HasteMapError, Result};
use crate::extract::DefaultExtractor;
use crate::file_store::FileStore;
use crate::filters::FileFilter;
use crate::index_data::{IndexData, ModuleRef, PlatformMap};
use crate::module_map::ModuleMap;
use crate::platform::{platform_from_path, GENERIC_PLATFORM};
use crate::worker::{Extractor, WorkerPool};

/// The facades published together when a build completes.
#[derive(Clone, Debug)]
pub struct BuildResult {
    pub file_store: Arc<FileStore>,
    pub module_map: Arc<ModuleMap>,
}

/// Builds and publishes the module index for one configuration.
pub struct HasteMap {
    options: HasteMapOptions,
    filter: FileFilter,
    extractor: Arc<dyn Extractor>,
    published: Mutex<Option<BuildResult>>,
}

impl HasteMap {
    /// Index builder with the default lexical extractor.
    pub fn new(options: HasteMapOptions) -> Self {
        Self::with_extractor(options, Arc::new(DefaultExtractor))
    }

    /// Index builder with a custom metadata extractor.
    pub fn with_extractor(options: HasteMapOptions, extractor: Arc<dyn Extractor>) -> Self {
        let filter = FileFilter::new(
            options.ignore_pattern.clone(),
            options.provides_module_node_modules.clone(),
            options.retain_all_files,
        );
        Self {
            options,
            filter,
            extractor,
            published: Mutex::new(None),
        }
    }

    /// Where this configuration's cache lives.
    pub fn cache_path(&self) -> PathBuf {
        cache::cache_file_path(
            &self.options.cache_directory,
            &self.options.name,
            &self.options.roots,
            &self.options.extensions,
            &self.options.platforms,
            self.options.mocks_pattern.as_ref().map(|p| p.as_str()),
        )
    }

    /// Run the pipeline and publish the facades.
    ///
    /// Reentrant-safe: concurrent callers block on the in-flight build
    /// and observe its result; later callers get the latched result.
    pub fn build(&self) -> Result<BuildResult> {
        let mut published = self.published.lock();
        if let Some(result) = &*published {
            return Ok(result.clone());
        }

        let result = self.run_pipeline()?;
        *published = Some(result.clone());
        Ok(result)
    }

    fn run_pipeline(&self) -> Result<BuildResult> {
        let cache_path = self.cache_path();
        let prior = cache::read(&cache_path, self.options.reset_cache);
        debug!(
            cache = %cache_path.display(),
            cached_files = prior.files.len(),
            "starting index build"
        );

        let crawled = crawler::crawl(&self.options, &self.filter, &prior)?;
        let data = self.build_metadata(crawled)?;
        cache::persist(&cache_path, &data)?;

        info!(
            files = data.files.len(),
            modules = data.map.len(),
            mocks = data.mocks.len(),
            "index build complete"
        );

        let IndexData {
            files, map, mocks, ..
        } = data;
        Ok(BuildResult {
            file_store: Arc::new(FileStore::new(files)),
            module_map: Arc::new(ModuleMap::new(map, mocks)),
        })
    }

    /// Stage 3: rebuild `map` and `mocks` from the post-crawl file table,
    /// extracting only files whose prior metadata is no longer valid.
    fn build_metadata(&self, mut data: IndexData) -> Result<IndexData> {
        let mut map: BTreeMap<String, PlatformMap> = BTreeMap::new();
        let mut mocks: BTreeMap<String, String> = BTreeMap::new();
        let mut pending: Vec<String> = Vec::new();

        for (path, record) in &data.files {
            if self.filter.skips_extraction(path) {
                continue;
            }

            if let Some(pattern) = &self.options.mocks_pattern {
                if pattern.is_match(path) {
                    let stem = mock_stem(path);
                    if let Some(previous) = mocks.insert(stem.clone(), path.clone()) {
                        warn!(
                            stem = %stem,
                            first = %previous,
                            second = %path,
                            "duplicate mock file for stem, the latter wins"
                        );
                    }
                }
            }

            if record.visited {
                let id = match &record.id {
                    // Extracted and declares no module.
                    None => continue,
                    Some(id) => id,
                };
                if let Some(entry) = carry_map_entry(&data, id) {
                    map.insert(id.clone(), entry);
                    continue;
                }
            }
            pending.push(path.clone());
        }

        let mut pool = WorkerPool::new(self.options.max_workers);
        let results = pool.extract_batch(self.extractor.as_ref(), &pending);
        pool.shutdown();

        for (path, result) in results {
            match result {
                Ok(outcome) => {
                    if let Some(record) = data.files.get_mut(&path) {
                        record.visited = true;
                        record.id = outcome.id.clone();
                        record.dependencies = outcome.dependencies;
                    }
                    if let (Some(id), Some(module)) = (outcome.id, outcome.module) {
                        install_module(
                            &mut map,
                            &id,
                            module,
                            &self.options.platforms,
                            self.options.throw_on_module_collision,
                        )?;
                    }
                }
                Err(e) => {
                    // Read failures are not fatal: the file just leaves
                    // the index until a later crawl sees it again.
                    debug!(path = %path, error = %e, "extraction failed, dropping file");
                    data.files.remove(&path);
                }
            }
        }

        data.map = map;
        data.mocks = mocks;
        Ok(data)
    }
}

/// Prior map entry for `id`, restricted to refs whose file survived the
/// crawl. `None` when nothing survives, which forces re-extraction.
fn carry_map_entry(data: &IndexData, id: &str) -> Option<PlatformMap> {
    let entry = data.map.get(id)?;
    let filtered: PlatformMap = entry
        .iter()
        .filter(|(_, module)| data.files.contains_key(&module.path))
        .map(|(platform, module)| (platform.clone(), module.clone()))
        .collect();
    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

/// Install a module under its platform slot, first-installed wins.
fn install_module(
    map: &mut BTreeMap<String, PlatformMap>,
    id: &str,
    module: ModuleRef,
    platforms: &[String],
    throw_on_collision: bool,
) -> Result<()> {
    let platform = platform_from_path(&module.path, platforms)
        .unwrap_or_else(|| GENERIC_PLATFORM.to_string());

    let entry = map.entry(id.to_string()).or_default();
    match entry.get(&platform) {
        None => {
            entry.insert(platform, module);
        }
        // Same file seen twice.
        Some(existing) if existing.path == module.path => {}
        Some(existing) => {
            if throw_on_collision {
                return Err(HasteMapError::ModuleCollision {
                    id: id.to_string(),
                    first: existing.path.clone(),
                    second: module.path,
                });
            }
            warn!(
                id = %id,
                kept = %existing.path,
                rejected = %module.path,
                "duplicate haste module name, keeping the first"
            );
        }
    }
    Ok(())
}

/// Base name minus the final extension, the mocks registry key.
fn mock_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
