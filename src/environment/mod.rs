//! Live asset indexes: providers that find and digest assets on demand.

mod digest;
mod directory;
mod memory;

pub use digest::{build_asset, debug_logical_path, digest_path, hex_digest, integrity_of};
pub use directory::DirectoryIndex;
pub use memory::MemoryIndex;

use crate::asset_paths::extname;
use crate::models::{AssetHandle, DEBUG_SUFFIX, Pipeline};

/// Provider that can look up assets by logical path while the application runs.
///
/// Implementations handle their own synchronisation; resolvers call them from
/// any request thread without further locking.
pub trait LiveAssetIndex: Send + Sync {
    /// Find an asset under the requested pipeline variant.
    fn find(&self, logical_path: &str, pipeline: Pipeline) -> Option<AssetHandle>;

    /// Every logical path the index can serve, used to evaluate precompile rules.
    fn logical_paths(&self) -> Vec<String>;
}

/// Normalise a lookup request.
///
/// Leading slashes are dropped and an explicit `.debug` logical path (as produced by a
/// previous debug lookup) selects the debug pipeline for its base asset. Paths escaping
/// the asset roots yield `None`.
pub(crate) fn normalise_request(logical_path: &str, pipeline: Pipeline) -> Option<(String, Pipeline)> {
    let trimmed = logical_path.trim_start_matches('/').replace('\\', "/");
    if trimmed.is_empty() || trimmed.split('/').any(|segment| segment == "..") {
        return None;
    }

    let ext = extname(&trimmed);
    let stem = &trimmed[..trimmed.len() - ext.len()];
    if let Some(base) = stem.strip_suffix(DEBUG_SUFFIX) {
        return Some((format!("{base}{ext}"), Pipeline::Debug));
    }
    Some((trimmed, pipeline))
}
