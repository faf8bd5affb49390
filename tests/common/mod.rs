//! Shared helpers for build-pipeline integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use hastemap::{DefaultExtractor, Extractor, HasteMapOptions, Result, WorkerResult};

/// Builder for on-disk source trees the pipeline crawls in tests.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories as needed.
    pub fn add_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
        full_path
    }

    /// Rewrite a file after a short pause so its mtime observably moves.
    pub fn rewrite_file(&self, relative_path: &str, content: &str) -> PathBuf {
        std::thread::sleep(std::time::Duration::from_millis(20));
        self.add_file(relative_path, content)
    }

    pub fn remove_file(&self, relative_path: &str) {
        fs::remove_file(self.dir.path().join(relative_path)).expect("failed to remove file");
    }

    /// A module source declaring `id` via the docblock directive.
    pub fn module_source(id: &str, dependencies: &[&str]) -> String {
        let mut source = format!("/**\n * @providesModule {}\n */\n", id);
        for dep in dependencies {
            source.push_str(&format!("const _ = require('{}');\n", dep));
        }
        source
    }
}

/// Extractor spy counting how often the pipeline reaches a worker.
pub struct CountingExtractor {
    inner: DefaultExtractor,
    calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: DefaultExtractor,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Extractor for CountingExtractor {
    fn extract(&self, path: &Path) -> Result<WorkerResult> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.extract(path)
    }
}

/// Hermetic options: native crawler only, in-process extraction, and a
/// cache directory owned by the test.
pub fn options(repo: &TestRepo, cache_dir: &Path) -> HasteMapOptions {
    let mut options = HasteMapOptions::new(
        "test-project",
        vec![repo.root().to_path_buf()],
        vec!["js".to_string(), "json".to_string()],
    );
    options.cache_directory = cache_dir.to_path_buf();
    options.use_watchman = false;
    options.max_workers = 1;
    options
}
