//! File store facade
//!
//! Immutable snapshot view over the published `files` table. Lookups are
//! O(1)-ish map accesses; `match_files` is the only full scan.

use std::collections::BTreeMap;
use std::path::Path;

use crate::index_data::FileRecord;

#[derive(Debug, Clone)]
pub struct FileStore {
    files: BTreeMap<String, FileRecord>,
}

impl FileStore {
    pub(crate) fn new(files: BTreeMap<String, FileRecord>) -> Self {
        Self { files }
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path.to_string_lossy().as_ref())
    }

    pub fn get_mtime(&self, path: &Path) -> Option<u64> {
        self.files
            .get(path.to_string_lossy().as_ref())
            .map(|record| record.mtime)
    }

    pub fn get_dependencies(&self, path: &Path) -> Option<&[String]> {
        self.files
            .get(path.to_string_lossy().as_ref())
            .map(|record| record.dependencies.as_slice())
    }

    /// Module id declared by the file, if it was extracted and declares one.
    pub fn get_module_name(&self, path: &Path) -> Option<&str> {
        self.files
            .get(path.to_string_lossy().as_ref())
            .and_then(|record| record.id.as_deref())
    }

    /// All paths satisfying `predicate`, in sorted order.
    pub fn match_files<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.files
            .keys()
            .filter(|path| predicate(path))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        let mut files = BTreeMap::new();
        files.insert(
            "/repo/a.js".to_string(),
            FileRecord {
                id: Some("A".to_string()),
                mtime: 10,
                visited: true,
                dependencies: vec!["B".to_string()],
            },
        );
        files.insert("/repo/b.js".to_string(), FileRecord::fresh(20));
        FileStore::new(files)
    }

    #[test]
    fn lookups_reflect_the_snapshot() {
        let store = store();
        assert!(store.exists(Path::new("/repo/a.js")));
        assert!(!store.exists(Path::new("/repo/c.js")));
        assert_eq!(store.get_mtime(Path::new("/repo/b.js")), Some(20));
        assert_eq!(
            store.get_dependencies(Path::new("/repo/a.js")),
            Some(&["B".to_string()][..])
        );
        assert_eq!(store.get_module_name(Path::new("/repo/a.js")), Some("A"));
        assert_eq!(store.get_module_name(Path::new("/repo/b.js")), None);
    }

    #[test]
    fn match_files_scans_in_sorted_order() {
        let store = store();
        assert_eq!(
            store.match_files(|path| path.ends_with(".js")),
            ["/repo/a.js", "/repo/b.js"]
        );
        assert!(store.match_files(|path| path.contains("xyz")).is_empty());
    }
}
