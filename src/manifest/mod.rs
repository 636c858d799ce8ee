//! Build manifest storage and the process-wide cache wrapped around it.

mod build;
mod cache;

pub use build::{BuildManifest, MANIFEST_PREFIX, locate_manifest, manifest_path_for};
pub use cache::{LoadedManifest, ManifestCache, ManifestSource};
