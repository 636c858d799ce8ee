//! Data structures shared between the live index, the build manifest and the resolvers.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing pipeline variant requested from a live asset index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Pipeline {
  /// Regular, fully processed asset.
  #[default]
  Default,
  /// Debug variant used for split, per-file serving in development.
  Debug,
}

/// Suffix inserted before the extension of debug pipeline logical paths.
pub const DEBUG_SUFFIX: &str = ".debug";

/// A single processed asset as reported by a live index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
  /// Build-independent name, e.g. `application.js`.
  pub logical_path: String,
  /// Logical path with the content digest inserted, e.g. `application-3fa2.js`.
  pub digest_path: String,
  /// Hex encoded content digest.
  pub digest: String,
  /// Subresource integrity value (`sha256-<base64>`), when known.
  pub integrity: Option<String>,
  /// Processed bytes.
  pub source: Arc<[u8]>,
  /// File the asset was read from, if it came from disk.
  pub filename: Option<PathBuf>,
  /// Modification time of the underlying source.
  pub mtime: DateTime<Utc>,
}

impl Asset {
  /// Size of the processed bytes.
  pub fn length(&self) -> u64 {
    self.source.len() as u64
  }

  /// Build the manifest record describing this asset.
  pub fn metadata(&self) -> AssetMetadata {
    AssetMetadata {
      logical_path: self.logical_path.clone(),
      mtime: Some(self.mtime),
      size: Some(self.length()),
      digest: Some(self.digest.clone()),
      integrity: self.integrity.clone(),
    }
  }
}

/// Result of a live index lookup: one file or an ordered bundle of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetHandle {
  /// A standalone asset.
  Single(Asset),
  /// An asset whose debug rendering expands into several files, in order.
  Bundle {
    /// Asset the bundle was requested for.
    root: Asset,
    /// Files making up the bundle, in inclusion order.
    parts: Vec<Asset>,
  },
}

impl AssetHandle {
  /// The asset that was looked up.
  pub fn asset(&self) -> &Asset {
    match self {
      Self::Single(asset) => asset,
      Self::Bundle { root, .. } => root,
    }
  }

  /// Logical path of the looked-up asset.
  pub fn logical_path(&self) -> &str {
    &self.asset().logical_path
  }

  /// Digest path of the looked-up asset.
  pub fn digest_path(&self) -> &str {
    &self.asset().digest_path
  }

  /// Integrity of the looked-up asset.
  pub fn integrity(&self) -> Option<&str> {
    self.asset().integrity.as_deref()
  }

  /// Every file this handle stands for; a single asset yields itself.
  pub fn parts(&self) -> &[Asset] {
    match self {
      Self::Single(asset) => std::slice::from_ref(asset),
      Self::Bundle { parts, .. } => parts,
    }
  }

  /// Returns `true` for multi-file bundles.
  pub fn is_bundle(&self) -> bool {
    matches!(self, Self::Bundle { .. })
  }
}

/// Per-file record stored in the build manifest, keyed by digest path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetMetadata {
  /// Reverse pointer to the logical path.
  pub logical_path: String,
  /// Modification time at compile time.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mtime: Option<DateTime<Utc>>,
  /// Compiled size in bytes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size: Option<u64>,
  /// Hex content digest.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub digest: Option<String>,
  /// Subresource integrity hash.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub integrity: Option<String>,
}

/// Strip the debug suffix from a debug pipeline logical path (`app.debug.js` → `app.js`).
pub fn strip_debug_suffix(logical_path: &str) -> String {
  logical_path.replacen(DEBUG_SUFFIX, "", 1)
}
