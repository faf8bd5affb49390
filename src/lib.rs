//! hastemap: a persistent, incremental module-name index
//!
//! Builds and maintains a flat index of a source tree that answers two
//! questions quickly: "what does this file declare and depend on?" and
//! "which file provides module id X on platform P?". Designed as the
//! startup hot path of a test runner and module resolver over trees with
//! hundreds of thousands of files: warm rebuilds read a cache, crawl
//! deltas through a file watcher when one is available, and re-extract
//! only files whose mtime changed.
//!
//! # Pipeline
//!
//! ```text
//! ┌────────┐   ┌─────────┐   ┌──────────────┐   ┌─────────┐
//! │ cache  │──>│ crawler │──>│   metadata   │──>│ persist │
//! │ loader │   │ dispatch│   │ (worker pool)│   │ (atomic)│
//! └────────┘   └─────────┘   └──────────────┘   └─────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use hastemap::{HasteMap, HasteMapOptions};
//!
//! let options = HasteMapOptions::new(
//!     "my-project",
//!     vec![PathBuf::from("/repo/src")],
//!     vec!["js".to_string()],
//! );
//! let haste_map = HasteMap::new(options);
//! let result = haste_map.build()?;
//!
//! let path = result.module_map.get_module("Button", Some("ios"), true);
//! # Ok::<(), hastemap::HasteMapError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod file_store;
pub mod filters;
pub mod fs_utils;
pub mod index_data;
pub mod module_map;
pub mod platform;
pub mod worker;

pub use builder::{BuildResult, HasteMap};
pub use config::HasteMapOptions;
pub use error::{HasteMapError, Result};
pub use extract::DefaultExtractor;
pub use file_store::FileStore;
pub use index_data::{FileRecord, IndexData, ModuleKind, ModuleRef};
pub use module_map::ModuleMap;
pub use platform::{GENERIC_PLATFORM, NATIVE_PLATFORM};
pub use worker::{Extractor, WorkerResult};
