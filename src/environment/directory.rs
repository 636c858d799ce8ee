//! Live index backed by asset directories on disk.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use same_file::is_same_file;
use walkdir::WalkDir;

use super::digest::{build_asset, debug_logical_path};
use super::{LiveAssetIndex, normalise_request};
use crate::models::{Asset, AssetHandle, Pipeline};

#[derive(Debug, Clone)]
struct CachedAsset {
    modified: SystemTime,
    asset: Asset,
}

/// Serves assets straight from an ordered list of load paths.
///
/// Earlier roots shadow later ones. Digests are computed on first lookup and
/// reused until the file's modification time changes.
#[derive(Debug)]
pub struct DirectoryIndex {
    roots: Vec<PathBuf>,
    cache: RwLock<HashMap<(String, Pipeline), CachedAsset>>,
}

impl DirectoryIndex {
    /// Create an index over the provided load paths.
    ///
    /// Load paths that point at a directory already listed (through a symlink or a
    /// differently spelled path) are dropped.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut unique: Vec<PathBuf> = Vec::new();
        for root in roots.into_iter().map(Into::into) {
            let duplicate = unique
                .iter()
                .any(|seen| is_same_file(seen, &root).unwrap_or(false));
            if duplicate {
                tracing::debug!("ignoring duplicate load path {}", root.display());
            } else {
                unique.push(root);
            }
        }
        Self {
            roots: unique,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load paths searched by this index, in priority order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Forget every computed digest.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn locate(&self, logical_path: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(logical_path))
            .find(|candidate| candidate.is_file())
    }

    fn load(&self, logical_path: &str, pipeline: Pipeline) -> Option<Asset> {
        let filename = self.locate(logical_path)?;
        let modified = fs::metadata(&filename)
            .and_then(|meta| meta.modified())
            .ok()?;
        let key = (logical_path.to_string(), pipeline);

        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            if cached.modified == modified {
                return Some(cached.asset.clone());
            }
        }

        let asset = read_asset(&filename, logical_path, pipeline, modified)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                CachedAsset {
                    modified,
                    asset: asset.clone(),
                },
            );
        Some(asset)
    }
}

impl LiveAssetIndex for DirectoryIndex {
    fn find(&self, logical_path: &str, pipeline: Pipeline) -> Option<AssetHandle> {
        let (logical_path, pipeline) = normalise_request(logical_path, pipeline)?;
        self.load(&logical_path, pipeline).map(AssetHandle::Single)
    }

    fn logical_paths(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        for root in &self.roots {
            for entry in WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
            {
                if let Some(logical) = relative_logical_path(root, entry.path()) {
                    seen.insert(logical);
                }
            }
        }
        seen.into_iter().collect()
    }
}

fn read_asset(
    filename: &Path,
    logical_path: &str,
    pipeline: Pipeline,
    modified: SystemTime,
) -> Option<Asset> {
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("failed to read {}: {}", filename.display(), err);
            return None;
        }
    };
    let logical = match pipeline {
        Pipeline::Default => logical_path.to_string(),
        Pipeline::Debug => debug_logical_path(logical_path),
    };
    tracing::debug!("computed digest for {logical}");
    Some(build_asset(
        &logical,
        Arc::from(bytes),
        Some(filename.to_path_buf()),
        DateTime::<Utc>::from(modified),
    ))
}

fn relative_logical_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!segments.is_empty()).then(|| segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::digest::hex_digest;
    use tempfile::tempdir;

    #[test]
    fn finds_and_digests_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("javascripts")).unwrap();
        fs::write(temp.path().join("javascripts/app.js"), b"alert(1)").unwrap();

        let index = DirectoryIndex::new([temp.path()]);
        let handle = index.find("javascripts/app.js", Pipeline::Default).unwrap();
        let digest = hex_digest(b"alert(1)");

        assert_eq!(handle.logical_path(), "javascripts/app.js");
        assert_eq!(handle.digest_path(), format!("javascripts/app-{digest}.js"));
        assert!(handle.integrity().unwrap().starts_with("sha256-"));
        assert!(index.find("javascripts/missing.js", Pipeline::Default).is_none());
    }

    #[test]
    fn earlier_roots_shadow_later_ones() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(first.path().join("app.css"), b"a{}").unwrap();
        fs::write(second.path().join("app.css"), b"b{}").unwrap();
        fs::write(second.path().join("only.css"), b"c{}").unwrap();

        let index = DirectoryIndex::new([first.path(), second.path()]);
        let app = index.find("app.css", Pipeline::Default).unwrap();
        assert_eq!(app.asset().source.as_ref(), b"a{}");
        assert!(index.find("only.css", Pipeline::Default).is_some());
        assert_eq!(index.logical_paths(), vec!["app.css", "only.css"]);
    }

    #[test]
    fn debug_pipeline_renames_logical_path() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("app.js"), b"x").unwrap();
        let index = DirectoryIndex::new([temp.path()]);

        let debug = index.find("app.js", Pipeline::Debug).unwrap();
        assert_eq!(debug.logical_path(), "app.debug.js");

        let again = index.find("app.debug.js", Pipeline::Default).unwrap();
        assert_eq!(again.logical_path(), "app.debug.js");
    }

    #[test]
    fn aliased_roots_are_listed_once() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("assets");
        fs::create_dir_all(&root).unwrap();
        let aliased = root.join(".");

        let index = DirectoryIndex::new([root.clone(), aliased, temp.path().join("missing")]);
        assert_eq!(index.roots(), &[root, temp.path().join("missing")]);
    }

    #[test]
    fn refuses_paths_outside_roots() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("assets");
        fs::create_dir_all(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), b"x").unwrap();

        let index = DirectoryIndex::new([root]);
        assert!(index.find("../secret.txt", Pipeline::Default).is_none());
    }

    #[test]
    fn recomputes_after_clearing_cache() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("app.js");
        fs::write(&file, b"one").unwrap();
        let index = DirectoryIndex::new([temp.path()]);
        let before = index.find("app.js", Pipeline::Default).unwrap();

        fs::write(&file, b"two").unwrap();
        index.clear_cache();
        let after = index.find("app.js", Pipeline::Default).unwrap();
        assert_ne!(before.digest_path(), after.digest_path());
    }
}
