//! Loading, querying and persisting the build manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{Asset, AssetMetadata};

/// File name prefix of manifests written by this crate and by Sprockets 3+.
pub const MANIFEST_PREFIX: &str = ".sprockets-manifest-";

/// File name prefix of manifests written by older Sprockets releases.
const LEGACY_MANIFEST_PREFIX: &str = "manifest-";

/// Deserialised build manifest mapping logical paths to digest paths and file metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildManifest {
  /// Compiled files keyed by digest path.
  #[serde(default)]
  pub files: BTreeMap<String, AssetMetadata>,
  /// Current digest path for each logical path.
  #[serde(default)]
  pub assets: BTreeMap<String, String>,
}

impl BuildManifest {
  /// Parse a manifest from its JSON representation.
  pub fn from_json(content: &str) -> Result<Self> {
    serde_json::from_str(content).context("failed to parse build manifest JSON")
  }

  /// Load a manifest from disk.
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("manifest not found at {}", path.display()))?;
    Self::from_json(&content).with_context(|| format!("{} is invalid", path.display()))
  }

  /// Persist the manifest as pretty-printed JSON, creating parent directories as needed.
  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(self)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
  }

  /// Digest path recorded for a logical path.
  pub fn digest_of(&self, logical_path: &str) -> Option<&str> {
    self.assets.get(logical_path).map(String::as_str)
  }

  /// Metadata recorded for a digest path.
  pub fn metadata_of(&self, digest_path: &str) -> Option<&AssetMetadata> {
    self.files.get(digest_path)
  }

  /// Record a logical path as compiled to `digest_path`, making it the current version.
  pub fn insert(
    &mut self,
    logical_path: impl Into<String>,
    digest_path: impl Into<String>,
    metadata: AssetMetadata,
  ) {
    let digest_path = digest_path.into();
    self.files.insert(digest_path.clone(), metadata);
    self.assets.insert(logical_path.into(), digest_path);
  }

  /// Record a compiled asset as the current version of its logical path.
  pub fn record(&mut self, asset: &Asset) {
    self.insert(
      asset.logical_path.clone(),
      asset.digest_path.clone(),
      asset.metadata(),
    );
  }

  /// Returns `true` when nothing has been compiled yet.
  pub fn is_empty(&self) -> bool {
    self.files.is_empty() && self.assets.is_empty()
  }
}

/// Find an existing manifest file inside a compiled asset directory.
pub fn locate_manifest(dir: &Path) -> Option<PathBuf> {
  let entries = fs::read_dir(dir).ok()?;
  let mut candidates: Vec<PathBuf> = entries
    .flatten()
    .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
    .map(|entry| entry.path())
    .filter(|path| is_manifest_file_name(path))
    .collect();
  candidates.sort();
  // Prefer the current naming scheme over the legacy one.
  candidates.sort_by_key(|path| !has_prefix(path, MANIFEST_PREFIX));
  candidates.into_iter().next()
}

/// Location a manifest should be written to: the existing one, or a freshly named file.
pub fn manifest_path_for(dir: &Path) -> PathBuf {
  locate_manifest(dir).unwrap_or_else(|| dir.join(generate_manifest_name(dir)))
}

fn generate_manifest_name(dir: &Path) -> String {
  let mut hasher = Sha256::new();
  hasher.update(dir.to_string_lossy().as_bytes());
  hasher.update(Utc::now().to_rfc3339().as_bytes());
  let hex = format!("{:x}", hasher.finalize());
  format!("{MANIFEST_PREFIX}{}.json", &hex[..32])
}

fn is_manifest_file_name(path: &Path) -> bool {
  let is_json = path.extension().is_some_and(|ext| ext == "json");
  is_json && (has_prefix(path, MANIFEST_PREFIX) || has_prefix(path, LEGACY_MANIFEST_PREFIX))
}

fn has_prefix(path: &Path, prefix: &str) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .is_some_and(|name| name.starts_with(prefix))
}
