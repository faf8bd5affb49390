//! Crawl-time include policy
//!
//! A path is ignored when it matches the configured ignore pattern, or
//! when it sits under a `node_modules` segment and is neither whitelisted
//! by package name nor covered by `retain_all_files`. Retained
//! `node_modules` files stay in the file table but are never handed to
//! the extractor.

use regex::Regex;

const NODE_MODULES: &str = "/node_modules/";

/// Predicate deciding which candidate paths enter the file table.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    ignore_pattern: Option<Regex>,
    node_modules_whitelist: Vec<String>,
    retain_all_files: bool,
}

impl FileFilter {
    pub fn new(
        ignore_pattern: Option<Regex>,
        node_modules_whitelist: Vec<String>,
        retain_all_files: bool,
    ) -> Self {
        Self {
            ignore_pattern,
            node_modules_whitelist,
            retain_all_files,
        }
    }

    /// Whether a candidate path is excluded from the crawl.
    pub fn ignores(&self, path: &str) -> bool {
        if let Some(pattern) = &self.ignore_pattern {
            if pattern.is_match(path) {
                return true;
            }
        }
        if self.retain_all_files {
            return false;
        }
        is_node_module(path) && !self.is_whitelisted(path)
    }

    /// Whether the metadata stage must skip extraction for a retained path.
    pub fn skips_extraction(&self, path: &str) -> bool {
        self.retain_all_files && is_node_module(path)
    }

    /// A path under `node_modules/<name>/...` is whitelisted iff `<name>`
    /// is one of the configured package names.
    fn is_whitelisted(&self, path: &str) -> bool {
        self.node_modules_whitelist
            .iter()
            .any(|name| path.contains(&format!("{}{}/", NODE_MODULES, name)))
    }
}

/// Whether a path lies under any `node_modules` segment.
pub fn is_node_module(path: &str) -> bool {
    path.contains(NODE_MODULES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_pattern_wins() {
        let filter = FileFilter::new(Some(Regex::new(r"/__fixtures__/").unwrap()), vec![], false);
        assert!(filter.ignores("/repo/src/__fixtures__/a.js"));
        assert!(!filter.ignores("/repo/src/a.js"));
    }

    #[test]
    fn node_modules_excluded_by_default() {
        let filter = FileFilter::new(None, vec![], false);
        assert!(filter.ignores("/repo/node_modules/left-pad/index.js"));
        assert!(!filter.ignores("/repo/src/node_modules.js"));
    }

    #[test]
    fn whitelisted_packages_are_crawled() {
        let filter = FileFilter::new(None, vec!["fbjs".to_string()], false);
        assert!(!filter.ignores("/repo/node_modules/fbjs/lib/invariant.js"));
        assert!(filter.ignores("/repo/node_modules/left-pad/index.js"));
        // The package name must match a whole path segment.
        assert!(filter.ignores("/repo/node_modules/fbjs2/lib/index.js"));
    }

    #[test]
    fn retain_all_files_keeps_but_skips_extraction() {
        let filter = FileFilter::new(None, vec![], true);
        assert!(!filter.ignores("/repo/node_modules/left-pad/index.js"));
        assert!(filter.skips_extraction("/repo/node_modules/left-pad/index.js"));
        assert!(!filter.skips_extraction("/repo/src/a.js"));
    }

    #[test]
    fn ignore_pattern_applies_even_with_retain_all_files() {
        let filter = FileFilter::new(Some(Regex::new(r"/build/").unwrap()), vec![], true);
        assert!(filter.ignores("/repo/node_modules/pkg/build/out.js"));
    }
}
