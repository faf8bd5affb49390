//! Module map facade
//!
//! Immutable snapshot view over the published `map` and `mocks` tables.
//! Module resolution walks exact platform, then the native platform when
//! the caller supports it, then the generic entry.

use std::collections::BTreeMap;

use crate::index_data::{ModuleKind, PlatformMap};
use crate::platform::{GENERIC_PLATFORM, NATIVE_PLATFORM};

#[derive(Debug, Clone)]
pub struct ModuleMap {
    map: BTreeMap<String, PlatformMap>,
    mocks: BTreeMap<String, String>,
}

impl ModuleMap {
    pub(crate) fn new(map: BTreeMap<String, PlatformMap>, mocks: BTreeMap<String, String>) -> Self {
        Self { map, mocks }
    }

    /// Path of the file providing module `id` for `platform`.
    pub fn get_module(
        &self,
        id: &str,
        platform: Option<&str>,
        supports_native_platform: bool,
    ) -> Option<&str> {
        self.lookup(id, platform, supports_native_platform, ModuleKind::Module)
    }

    /// Path of the package manifest providing module `id`.
    pub fn get_package(&self, id: &str, platform: Option<&str>) -> Option<&str> {
        self.lookup(id, platform, false, ModuleKind::Package)
    }

    /// Path of the mock registered under a filename stem.
    pub fn get_mock_module(&self, stem: &str) -> Option<&str> {
        self.mocks.get(stem).map(|path| path.as_str())
    }

    fn lookup(
        &self,
        id: &str,
        platform: Option<&str>,
        supports_native_platform: bool,
        kind: ModuleKind,
    ) -> Option<&str> {
        let platforms = self.map.get(id)?;

        let module = platform
            .and_then(|p| platforms.get(p))
            .or_else(|| {
                if supports_native_platform {
                    platforms.get(NATIVE_PLATFORM)
                } else {
                    None
                }
            })
            .or_else(|| platforms.get(GENERIC_PLATFORM))?;

        if module.kind == kind {
            Some(module.path.as_str())
        } else {
            None
        }
    }
}
