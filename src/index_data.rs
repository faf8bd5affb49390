//! Serializable index data model
//!
//! The index is one compound entity with four sub-tables, all keyed by
//! strings. `BTreeMap` keeps the key domain exactly what was inserted,
//! iterates in a stable sorted order, and serializes byte-identically
//! across runs, which the persisted cache relies on.
//!
//! Per-file records and module references use a positional wire format to
//! keep the cache compact: `FileRecord` serializes as
//! `[id, mtime, visited, dependencies]` and `ModuleRef` as `[path, kind]`.
//! In memory both are named-field structs.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

/// Per-module mapping from platform token to the providing file.
pub type PlatformMap = BTreeMap<String, ModuleRef>;

/// The compound index entity.
///
/// Created empty or loaded from the cache, mutated only by the crawl and
/// metadata stages of the build pipeline, then frozen and persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexData {
    /// Watcher clock token per root path, used for delta crawls.
    pub clocks: BTreeMap<String, String>,

    /// Canonical set of files in scope, keyed by absolute path.
    pub files: BTreeMap<String, FileRecord>,

    /// Module id -> platform -> providing file.
    pub map: BTreeMap<String, PlatformMap>,

    /// Test-double registry keyed by the filename stem.
    pub mocks: BTreeMap<String, String>,
}

impl IndexData {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Extraction status and derived metadata for one file.
///
/// `visited` means the extractor has processed the file at this `mtime`;
/// only then are `id` and `dependencies` authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    /// Module name this file declares, if any.
    pub id: Option<String>,

    /// Modification time in milliseconds since the Unix epoch.
    pub mtime: u64,

    /// Whether derived fields reflect an extraction at this mtime.
    pub visited: bool,

    /// Module specifiers this file depends on.
    pub dependencies: Vec<String>,
}

impl FileRecord {
    /// Record for a newly discovered or changed file, pending extraction.
    pub fn fresh(mtime: u64) -> Self {
        Self {
            id: None,
            mtime,
            visited: false,
            dependencies: Vec::new(),
        }
    }
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.mtime)?;
        tuple.serialize_element(&(self.visited as u8))?;
        tuple.serialize_element(&self.dependencies)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for FileRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (id, mtime, visited, dependencies) =
            <(Option<String>, u64, u8, Vec<String>)>::deserialize(deserializer)?;
        if visited > 1 {
            return Err(de::Error::custom(format!(
                "visited flag must be 0 or 1, got {}",
                visited
            )));
        }
        Ok(Self {
            id,
            mtime,
            visited: visited == 1,
            dependencies,
        })
    }
}

/// What kind of thing provides a module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// A single source file declaring the module.
    Module,
    /// A directory whose manifest declares the module.
    Package,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Module => "module",
            ModuleKind::Package => "package",
        }
    }
}

/// Cross-reference from the module table into the file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Absolute path of the providing file; must be a key in `files`.
    pub path: String,

    pub kind: ModuleKind,
}

impl ModuleRef {
    pub fn module(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ModuleKind::Module,
        }
    }

    pub fn package(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ModuleKind::Package,
        }
    }
}

impl Serialize for ModuleRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.path)?;
        tuple.serialize_element(self.kind.as_str())?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for ModuleRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (path, kind) = <(String, String)>::deserialize(deserializer)?;
        let kind = match kind.as_str() {
            "module" => ModuleKind::Module,
            "package" => ModuleKind::Package,
            other => {
                return Err(de::Error::custom(format!(
                    "unknown module kind \"{}\"",
                    other
                )))
            }
        };
        Ok(Self { path, kind })
    }
}
