//! Process-wide, lazily loaded build manifest.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::build::{BuildManifest, locate_manifest};

/// Where the cached manifest is read from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
  /// An explicit manifest file.
  File(PathBuf),
  /// A compiled asset directory searched for a manifest file on every load.
  Directory(PathBuf),
  /// A manifest built in memory; reloading keeps it as-is.
  Memory(Arc<BuildManifest>),
}

/// Snapshot of the cached manifest together with the moment it was loaded.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
  /// Manifest contents, shared with every resolver that captured it.
  pub manifest: Arc<BuildManifest>,
  /// When the snapshot was published.
  pub loaded_at: DateTime<Utc>,
}

/// Initialize-once manifest cache with explicit invalidation.
///
/// Readers share an `Arc` snapshot. The first access after construction or
/// [`ManifestCache::invalidate`] loads the manifest under the write lock, so
/// concurrent first accesses never load twice.
#[derive(Debug)]
pub struct ManifestCache {
  source: ManifestSource,
  slot: RwLock<Option<LoadedManifest>>,
}

impl ManifestCache {
  /// Create an empty cache; nothing is read until first access.
  pub fn new(source: ManifestSource) -> Self {
    Self {
      source,
      slot: RwLock::new(None),
    }
  }

  /// Cache seeded with an in-memory manifest.
  pub fn from_manifest(manifest: BuildManifest) -> Self {
    Self::new(ManifestSource::Memory(Arc::new(manifest)))
  }

  /// Source the cache loads from.
  pub fn source(&self) -> &ManifestSource {
    &self.source
  }

  /// Current manifest, loading it on first access.
  pub fn get(&self) -> Arc<BuildManifest> {
    if let Some(loaded) = self.slot.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
      return Arc::clone(&loaded.manifest);
    }

    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(loaded) = slot.as_ref() {
      return Arc::clone(&loaded.manifest);
    }
    let loaded = self.load();
    let manifest = Arc::clone(&loaded.manifest);
    *slot = Some(loaded);
    manifest
  }

  /// When the current snapshot was loaded, if it has been.
  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    self
      .slot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .map(|loaded| loaded.loaded_at)
  }

  /// Drop the snapshot; the next [`ManifestCache::get`] reloads it.
  pub fn invalidate(&self) {
    *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
  }

  /// Load a fresh snapshot immediately and publish it, replacing the old one wholesale.
  pub fn reload(&self) -> Arc<BuildManifest> {
    let loaded = self.load();
    let manifest = Arc::clone(&loaded.manifest);
    *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded);
    manifest
  }

  fn load(&self) -> LoadedManifest {
    let manifest = match &self.source {
      ManifestSource::Memory(manifest) => Arc::clone(manifest),
      ManifestSource::File(path) => Arc::new(load_or_empty(path)),
      ManifestSource::Directory(dir) => match locate_manifest(dir) {
        Some(path) => Arc::new(load_or_empty(&path)),
        None => {
          tracing::debug!("no build manifest in {}", dir.display());
          Arc::new(BuildManifest::default())
        }
      },
    };

    LoadedManifest {
      manifest,
      loaded_at: Utc::now(),
    }
  }
}

fn load_or_empty(path: &Path) -> BuildManifest {
  if !path.exists() {
    tracing::debug!("build manifest {} does not exist yet", path.display());
    return BuildManifest::default();
  }
  match BuildManifest::load(path) {
    Ok(manifest) => {
      tracing::debug!(
        "loaded build manifest {} ({} assets)",
        path.display(),
        manifest.assets.len()
      );
      manifest
    }
    Err(err) => {
      tracing::error!("{err:#}");
      BuildManifest::default()
    }
  }
}
