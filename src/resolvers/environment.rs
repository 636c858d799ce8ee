use std::sync::Arc;

use crate::environment::LiveAssetIndex;
use crate::error::{ConfigurationError, Resolution, ResolveError};
use crate::models::{AssetHandle, Pipeline, strip_debug_suffix};
use crate::precompile::PrecompileChecker;

/// Resolves assets against a live index, enforcing the precompile declaration list.
#[derive(Clone)]
pub struct EnvironmentResolver {
    index: Arc<dyn LiveAssetIndex>,
    checker: Arc<dyn PrecompileChecker>,
    check_precompiled_asset: bool,
}

impl std::fmt::Debug for EnvironmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentResolver")
            .field("check_precompiled_asset", &self.check_precompiled_asset)
            .finish_non_exhaustive()
    }
}

impl EnvironmentResolver {
    /// Bind the resolver to a live index and precompile checker.
    pub fn new(
        index: Option<Arc<dyn LiveAssetIndex>>,
        checker: Arc<dyn PrecompileChecker>,
        check_precompiled_asset: bool,
    ) -> Result<Self, ConfigurationError> {
        let index = index.ok_or(ConfigurationError::MissingEnvironment)?;
        Ok(Self {
            index,
            checker,
            check_precompiled_asset,
        })
    }

    /// Servable path.
    ///
    /// With digests the digest path is computed; without, the logical path is served
    /// as given once the asset is known to exist.
    pub fn asset_path(&self, path: &str, digest: bool, allow_non_precompiled: bool) -> Resolution<String> {
        if digest {
            return self.digest_path(path, allow_non_precompiled);
        }

        match self.find_asset(path, Pipeline::Default) {
            Some(asset) => {
                if !allow_non_precompiled {
                    self.ensure_precompiled(asset.logical_path())?;
                }
                Ok(Some(path.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Digest path computed by the live index.
    pub fn digest_path(&self, path: &str, allow_non_precompiled: bool) -> Resolution<String> {
        match self.find_asset(path, Pipeline::Default) {
            Some(asset) => {
                if !allow_non_precompiled {
                    self.ensure_precompiled(asset.logical_path())?;
                }
                Ok(Some(asset.digest_path().to_string()))
            }
            None => Ok(None),
        }
    }

    /// Integrity of the asset, absent when unknown.
    pub fn integrity(&self, path: &str) -> Resolution<String> {
        Ok(self
            .find_asset(path, Pipeline::Default)
            .and_then(|asset| asset.integrity().map(str::to_string)))
    }

    /// Debug variant of the asset, checked against its undecorated logical path.
    pub fn find_debug_asset(&self, path: &str) -> Resolution<AssetHandle> {
        match self.find_asset(path, Pipeline::Debug) {
            Some(asset) => {
                self.ensure_precompiled(&strip_debug_suffix(asset.logical_path()))?;
                Ok(Some(asset))
            }
            None => Ok(None),
        }
    }

    fn find_asset(&self, path: &str, pipeline: Pipeline) -> Option<AssetHandle> {
        self.index.find(path, pipeline)
    }

    fn ensure_precompiled(&self, logical_path: &str) -> Result<(), ResolveError> {
        if self.check_precompiled_asset && !self.checker.is_precompiled(logical_path) {
            return Err(ResolveError::AssetNotPrecompiled {
                path: logical_path.to_string(),
            });
        }
        Ok(())
    }
}
