//! Watcher-service crawler
//!
//! Client for the watchman daemon, spoken over the `watchman -j` CLI with
//! JSON requests and responses. Each root is registered with
//! `watch-project`, then queried for files matching the extension
//! whitelist. A clock token stored per root in `clocks` turns subsequent
//! crawls into delta queries; a fresh instance (or a first crawl) rebuilds
//! the root's slice of the file table from the full listing.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{HasteMapError, Result};
use crate::fs_utils::normalize_path;
use crate::index_data::{FileRecord, IndexData};

use super::{carry_or_reset, CrawlRequest, Crawler};

static WATCHMAN_AVAILABLE: OnceCell<bool> = OnceCell::new();

/// One-time process-level probe that the watchman binary is invocable.
pub fn is_available() -> bool {
    *WATCHMAN_AVAILABLE.get_or_init(|| {
        Command::new("watchman")
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    })
}

pub struct WatchmanCrawler;

impl Crawler for WatchmanCrawler {
    fn crawl(&self, request: &CrawlRequest<'_>, prior: &IndexData) -> Result<IndexData> {
        let mut files = prior.files.clone();
        let mut clocks = prior.clocks.clone();

        for root in request.roots {
            let root_str = root.to_string_lossy().into_owned();
            let watch = watch_project(root)?;
            let since = prior.clocks.get(&root_str).cloned();
            let response = run_query(&watch, request, since.as_deref())?;

            let fresh = since.is_none() || response.is_fresh_instance;
            apply_query_response(
                &mut files,
                &prior.files,
                root,
                &watch.query_base(),
                &response,
                request,
                fresh,
            );
            clocks.insert(root_str, response.clock.clone());
        }

        Ok(IndexData {
            clocks,
            files,
            map: prior.map.clone(),
            mocks: prior.mocks.clone(),
        })
    }
}

/// Resolved watch for one root.
struct Watch {
    /// Directory watchman actually watches (the project root).
    watch_root: PathBuf,
    /// Our root relative to the watch root, when watchman widened it.
    relative_path: Option<String>,
}

impl Watch {
    /// Directory that query result names are relative to.
    fn query_base(&self) -> PathBuf {
        match &self.relative_path {
            Some(relative) => self.watch_root.join(relative),
            None => self.watch_root.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WatchProjectResponse {
    watch: String,
    #[serde(default)]
    relative_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    clock: String,
    #[serde(default)]
    files: Vec<QueryFile>,
    #[serde(default)]
    is_fresh_instance: bool,
}

#[derive(Debug, Deserialize)]
struct QueryFile {
    name: String,
    #[serde(default = "default_true")]
    exists: bool,
    /// Watchman reports this as an integer or a float depending on build.
    #[serde(default)]
    mtime_ms: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

fn watch_project(root: &Path) -> Result<Watch> {
    let response: WatchProjectResponse =
        run_command(json!(["watch-project", root.to_string_lossy()]))?;
    Ok(Watch {
        watch_root: PathBuf::from(response.watch),
        relative_path: response.relative_path,
    })
}

fn run_query(
    watch: &Watch,
    request: &CrawlRequest<'_>,
    since: Option<&str>,
) -> Result<QueryResponse> {
    let mut any_suffix = vec![json!("anyof")];
    any_suffix.extend(request.extensions.iter().map(|ext| json!(["suffix", ext])));

    let mut spec = json!({
        "expression": ["allof", ["type", "f"], any_suffix],
        "fields": ["name", "exists", "mtime_ms"],
    });
    if let Some(clock) = since {
        spec["since"] = json!(clock);
    }
    if let Some(relative) = &watch.relative_path {
        spec["relative_root"] = json!(relative);
    }

    run_command(json!([
        "query",
        watch.watch_root.to_string_lossy(),
        spec
    ]))
}

/// Send one JSON command to the watchman CLI and decode its response.
fn run_command<T: serde::de::DeserializeOwned>(command: serde_json::Value) -> Result<T> {
    let mut child = Command::new("watchman")
        .args(["-j", "--no-pretty"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HasteMapError::CrawlFailure {
            message: format!("could not spawn watchman: {}", e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(command.to_string().as_bytes())
            .map_err(|e| HasteMapError::CrawlFailure {
                message: format!("could not write watchman request: {}", e),
            })?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| HasteMapError::CrawlFailure {
            message: format!("watchman did not exit cleanly: {}", e),
        })?;

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(|e| HasteMapError::CrawlFailure {
            message: format!(
                "unparseable watchman response: {} ({})",
                e,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })?;

    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        return Err(HasteMapError::CrawlFailure {
            message: format!("watchman error: {}", error),
        });
    }

    serde_json::from_value(value).map_err(|e| HasteMapError::CrawlFailure {
        message: format!("unexpected watchman response shape: {}", e),
    })
}

/// Fold one root's query response into the file table.
///
/// Fresh listings replace the root's slice wholesale; delta listings only
/// touch the files watchman names. Everything else passes through.
fn apply_query_response(
    files: &mut BTreeMap<String, FileRecord>,
    prior_files: &BTreeMap<String, FileRecord>,
    root: &Path,
    query_base: &Path,
    response: &QueryResponse,
    request: &CrawlRequest<'_>,
    fresh: bool,
) {
    if fresh {
        files.retain(|path, _| !Path::new(path).starts_with(root));
    }

    for entry in &response.files {
        let absolute = normalize_path(&query_base.join(&entry.name));
        let path_str = absolute.to_string_lossy().into_owned();

        if !super::has_included_extension(&absolute, request.extensions) {
            continue;
        }
        if request.filter.ignores(&path_str) {
            debug!(path = %path_str, "watchman reported an ignored path");
            files.remove(&path_str);
            continue;
        }

        if !entry.exists {
            files.remove(&path_str);
            continue;
        }

        let mtime = match entry.mtime_ms.as_ref().and_then(mtime_to_millis) {
            Some(mtime) => mtime,
            None => continue,
        };
        files.insert(path_str.clone(), carry_or_reset(prior_files, &path_str, mtime));
    }
}

fn mtime_to_millis(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f as u64))
}
