use std::sync::Arc;

use crate::error::{ConfigurationError, Resolution};
use crate::manifest::BuildManifest;
use crate::models::AssetHandle;

/// Resolves assets from a precompiled build manifest.
///
/// A manifest entry is itself the precompilation record, so no precompile check is applied.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    manifest: Arc<BuildManifest>,
}

impl ManifestResolver {
    /// Bind the resolver to a manifest snapshot.
    pub fn new(manifest: Option<Arc<BuildManifest>>) -> Result<Self, ConfigurationError> {
        manifest
            .map(|manifest| Self { manifest })
            .ok_or(ConfigurationError::MissingManifest)
    }

    /// Servable path; manifests only know digested output, so nothing without digests.
    pub fn asset_path(&self, path: &str, digest: bool, allow_non_precompiled: bool) -> Resolution<String> {
        if digest {
            self.digest_path(path, allow_non_precompiled)
        } else {
            Ok(None)
        }
    }

    /// Digest path recorded in the manifest.
    pub fn digest_path(&self, path: &str, _allow_non_precompiled: bool) -> Resolution<String> {
        Ok(self.manifest.digest_of(path).map(str::to_string))
    }

    /// Integrity recorded for the asset's current digest path.
    pub fn integrity(&self, path: &str) -> Resolution<String> {
        Ok(self
            .manifest
            .digest_of(path)
            .and_then(|digest_path| self.manifest.metadata_of(digest_path))
            .and_then(|meta| meta.integrity.clone()))
    }

    /// Manifests carry no per-file debug information.
    pub fn find_debug_asset(&self, _path: &str) -> Resolution<AssetHandle> {
        Ok(None)
    }
}
