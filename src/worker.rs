//! Worker orchestration for the metadata stage
//!
//! The metadata builder hands every pending path to [`WorkerPool`] and
//! folds the results on the coordinator, so there is exactly one writer
//! of the module table. With `max_workers <= 1` extraction runs directly
//! in-process; otherwise a thread pool of `max_workers` threads is
//! created lazily on first use and torn down when the build finishes.

use std::path::Path;

use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::warn;

use crate::error::Result;
use crate::index_data::ModuleRef;

/// Per-file output of an extractor.
///
/// `id` and `module` are either both present or both absent: a file that
/// declares a module always has a module ref pointing back at itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    pub id: Option<String>,
    pub module: Option<ModuleRef>,
    pub dependencies: Vec<String>,
}

/// Extracts `(id, module, dependencies)` metadata from a single file.
///
/// Implementations must be safe to call from multiple worker threads.
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<WorkerResult>;
}

/// Bounded extraction fan-out with a lazily created pool.
pub struct WorkerPool {
    max_workers: usize,
    // None inside the cell records a failed pool build; extraction then
    // stays in-process for the rest of this pool's lifetime.
    pool: OnceCell<Option<rayon::ThreadPool>>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            pool: OnceCell::new(),
        }
    }

    /// Extract every path, returning `(path, result)` pairs in input
    /// order regardless of completion order.
    pub fn extract_batch(
        &self,
        extractor: &dyn Extractor,
        paths: &[String],
    ) -> Vec<(String, Result<WorkerResult>)> {
        if self.max_workers <= 1 || paths.len() <= 1 {
            return paths
                .iter()
                .map(|path| (path.clone(), extractor.extract(Path::new(path))))
                .collect();
        }

        match self.get_or_build_pool() {
            Some(pool) => pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| (path.clone(), extractor.extract(Path::new(path))))
                    .collect()
            }),
            None => paths
                .iter()
                .map(|path| (path.clone(), extractor.extract(Path::new(path))))
                .collect(),
        }
    }

    fn get_or_build_pool(&self) -> &Option<rayon::ThreadPool> {
        self.pool.get_or_init(|| {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.max_workers)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(error = %e, "worker pool creation failed, extracting in-process");
                    None
                }
            }
        })
    }

    /// Release the pool and its threads. Idempotent, and a no-op when
    /// the pool was never created.
    pub fn shutdown(&mut self) {
        self.pool = OnceCell::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HasteMapError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StemExtractor {
        calls: AtomicUsize,
    }

    impl StemExtractor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Extractor for StemExtractor {
        fn extract(&self, path: &Path) -> Result<WorkerResult> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string());
            if stem.as_deref() == Some("broken") {
                return Err(HasteMapError::ExtractionFailure {
                    path: path.display().to_string(),
                    message: "boom".to_string(),
                });
            }
            let module = stem
                .as_ref()
                .map(|_| ModuleRef::module(path.to_string_lossy()));
            Ok(WorkerResult {
                id: stem,
                module,
                dependencies: vec![],
            })
        }
    }

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("/repo/{}.js", n)).collect()
    }

    #[test]
    fn in_process_mode_preserves_order() {
        let pool = WorkerPool::new(1);
        let extractor = StemExtractor::new();
        let results = pool.extract_batch(&extractor, &paths(&["a", "b", "c"]));

        let ids: Vec<_> = results
            .iter()
            .map(|(_, r)| r.as_ref().unwrap().id.clone().unwrap())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(extractor.calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn pooled_mode_preserves_input_order() {
        let mut pool = WorkerPool::new(4);
        let extractor = StemExtractor::new();
        let input = paths(&["d", "c", "b", "a"]);
        let results = pool.extract_batch(&extractor, &input);

        let returned: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(returned, input);
        pool.shutdown();
    }

    #[test]
    fn errors_surface_per_path() {
        let pool = WorkerPool::new(1);
        let extractor = StemExtractor::new();
        let results = pool.extract_batch(&extractor, &paths(&["a", "broken"]));

        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }

    #[test]
    fn shutdown_is_idempotent_and_tolerates_never_created() {
        let mut pool = WorkerPool::new(8);
        pool.shutdown();
        pool.shutdown();

        let extractor = StemExtractor::new();
        // Usable again after teardown; the pool is rebuilt lazily.
        let results = pool.extract_batch(&extractor, &paths(&["a", "b"]));
        assert_eq!(results.len(), 2);
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn empty_batch_never_builds_a_pool() {
        let pool = WorkerPool::new(8);
        let extractor = StemExtractor::new();
        assert!(pool.extract_batch(&extractor, &[]).is_empty());
        assert!(pool.pool.get().is_none());
    }
}
