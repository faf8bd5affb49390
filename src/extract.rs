//! Default metadata extractor
//!
//! Lexical, not syntactic: the module id comes from an `@providesModule`
//! directive in the file's leading docblock, dependencies from
//! `require(...)` calls and static `import`/`export ... from`
//! specifiers. A `package.json` manifest declares its `name` as a
//! package-kind module. Consumers with other conventions plug in their
//! own [`Extractor`].

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HasteMapError, Result};
use crate::index_data::ModuleRef;
use crate::worker::{Extractor, WorkerResult};

static DOCBLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*(/\*.*?\*/)").unwrap());

static PROVIDES_MODULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@providesModule\s+(\S+)").unwrap());

static REQUIRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

static IMPORT_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b(?:import|export)\b[^'";]*?\bfrom\s*['"]([^'"]+)['"]"#).unwrap());

static BARE_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bimport\s*['"]([^'"]+)['"]"#).unwrap());

pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(&self, path: &Path) -> Result<WorkerResult> {
        if path.file_name().and_then(|n| n.to_str()) == Some("package.json") {
            return extract_package(path);
        }

        let source = fs::read_to_string(path).map_err(|e| HasteMapError::ExtractionFailure {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let id = docblock_directive(&source);
        let module = id
            .as_ref()
            .map(|_| ModuleRef::module(path.to_string_lossy()));

        Ok(WorkerResult {
            id,
            module,
            dependencies: extract_dependencies(&source),
        })
    }
}

/// A package manifest provides its `name` as a package-kind module.
fn extract_package(path: &Path) -> Result<WorkerResult> {
    let source = fs::read_to_string(path).map_err(|e| HasteMapError::ExtractionFailure {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let manifest: serde_json::Value =
        serde_json::from_str(&source).map_err(|e| HasteMapError::ExtractionFailure {
            path: path.display().to_string(),
            message: format!("invalid package manifest: {}", e),
        })?;

    let id = manifest
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.to_string());
    let module = id
        .as_ref()
        .map(|_| ModuleRef::package(path.to_string_lossy()));

    Ok(WorkerResult {
        id,
        module,
        dependencies: Vec::new(),
    })
}

/// Module id declared by the leading docblock, if any. Directives later
/// in the file do not count.
fn docblock_directive(source: &str) -> Option<String> {
    let docblock = DOCBLOCK_RE.captures(source)?.get(1)?.as_str();
    let id = PROVIDES_MODULE_RE.captures(docblock)?.get(1)?.as_str();
    Some(id.to_string())
}

/// Specifiers this file depends on, deduplicated in first-seen order.
fn extract_dependencies(source: &str) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    for re in [&*REQUIRE_RE, &*IMPORT_FROM_RE, &*BARE_IMPORT_RE] {
        for capture in re.captures_iter(source) {
            let specifier = capture[1].to_string();
            if !dependencies.contains(&specifier) {
                dependencies.push(specifier);
            }
        }
    }
    dependencies
}
