//! In-memory live index, useful for embedding and for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::digest::{build_asset, debug_logical_path};
use super::{LiveAssetIndex, normalise_request};
use crate::models::{Asset, AssetHandle, Pipeline};

/// Live index holding its assets in memory.
///
/// Debug lookups return a bundle when one has been registered with
/// [`MemoryIndex::with_debug_bundle`], otherwise the debug variant of the asset alone.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    assets: BTreeMap<String, Asset>,
    bundles: BTreeMap<String, Vec<String>>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset computed from `source`.
    pub fn with_asset(mut self, logical_path: &str, source: impl AsRef<[u8]>) -> Self {
        self.insert(logical_path, source);
        self
    }

    /// Register the ordered parts served for `logical_path` in debug mode.
    pub fn with_debug_bundle(mut self, logical_path: &str, parts: &[&str]) -> Self {
        self.bundles.insert(
            logical_path.to_string(),
            parts.iter().map(|part| part.to_string()).collect(),
        );
        self
    }

    /// Add or replace an asset computed from `source`.
    pub fn insert(&mut self, logical_path: &str, source: impl AsRef<[u8]>) {
        let asset = build_asset(
            logical_path,
            Arc::from(source.as_ref()),
            None,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        self.insert_asset(asset);
    }

    /// Add or replace a prebuilt asset record.
    pub fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.logical_path.clone(), asset);
    }

    /// Number of assets held.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` when the index holds no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn debug_variant(asset: &Asset) -> Asset {
        build_asset(
            &debug_logical_path(&asset.logical_path),
            Arc::clone(&asset.source),
            asset.filename.clone(),
            asset.mtime,
        )
    }
}

impl LiveAssetIndex for MemoryIndex {
    fn find(&self, logical_path: &str, pipeline: Pipeline) -> Option<AssetHandle> {
        let (logical_path, pipeline) = normalise_request(logical_path, pipeline)?;
        let asset = self.assets.get(&logical_path)?;

        match pipeline {
            Pipeline::Default => Some(AssetHandle::Single(asset.clone())),
            Pipeline::Debug => {
                let root = Self::debug_variant(asset);
                match self.bundles.get(&logical_path) {
                    Some(parts) => Some(AssetHandle::Bundle {
                        root,
                        parts: parts
                            .iter()
                            .filter_map(|part| self.assets.get(part).cloned())
                            .collect(),
                    }),
                    None => Some(AssetHandle::Single(root)),
                }
            }
        }
    }

    fn logical_paths(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lookup_returns_single_asset() {
        let index = MemoryIndex::new().with_asset("app.js", "alert(1)");
        let handle = index.find("app.js", Pipeline::Default).unwrap();
        assert!(!handle.is_bundle());
        assert_eq!(handle.logical_path(), "app.js");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn debug_lookup_expands_registered_bundle() {
        let index = MemoryIndex::new()
            .with_asset("app.js", "//= require jquery")
            .with_asset("jquery.js", "jq")
            .with_debug_bundle("app.js", &["jquery.js", "app.js"]);

        let handle = index.find("app.js", Pipeline::Debug).unwrap();
        assert!(handle.is_bundle());
        assert_eq!(handle.logical_path(), "app.debug.js");
        let parts: Vec<&str> = handle.parts().iter().map(|a| a.logical_path.as_str()).collect();
        assert_eq!(parts, vec!["jquery.js", "app.js"]);
    }

    #[test]
    fn debug_lookup_without_bundle_is_single() {
        let index = MemoryIndex::new().with_asset("app.css", "a{}");
        let handle = index.find("app.css", Pipeline::Debug).unwrap();
        assert!(!handle.is_bundle());
        assert_eq!(handle.logical_path(), "app.debug.css");
    }
}
