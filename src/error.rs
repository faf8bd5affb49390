//! Error types for hastemap operations

use thiserror::Error;

/// Main error type for index build operations
#[derive(Error, Debug)]
pub enum HasteMapError {
    #[error("crawl failed: {message}")]
    CrawlFailure { message: String },

    #[error("watcher crawl failed ({watcher}); retry with the native crawler also failed ({native})")]
    CrawlRetryFailure { watcher: String, native: String },

    #[error("duplicate module name \"{id}\": {first} and {second} both provide it")]
    ModuleCollision {
        id: String,
        first: String,
        second: String,
    },

    #[error("failed to extract metadata from {path}: {message}")]
    ExtractionFailure { path: String, message: String },

    #[error("failed to persist index cache to {path}: {message}")]
    PersistFailure { path: String, message: String },
}

/// Result type alias for hastemap operations
pub type Result<T> = std::result::Result<T, HasteMapError>;
