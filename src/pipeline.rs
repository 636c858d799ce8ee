//! Process-wide asset pipeline context.
//!
//! [`AssetPipeline`] owns the long-lived pieces (live index, manifest cache, precompile
//! checker) and hands out resolvers built from them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AssetConfig;
use crate::environment::{DirectoryIndex, LiveAssetIndex};
use crate::error::ConfigurationError;
use crate::helper::AssetPathResolver;
use crate::manifest::{ManifestCache, ManifestSource};
use crate::precompile::{PrecompiledAssets, default_rules, parse_rules};
use crate::resolvers::ResolverSources;
use crate::routes::AssetRoutes;

/// Long-lived asset state shared by every request.
pub struct AssetPipeline {
    root: PathBuf,
    config: AssetConfig,
    index: Arc<dyn LiveAssetIndex>,
    manifest: Arc<ManifestCache>,
    precompiled: Arc<PrecompiledAssets>,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    /// Discover `assets.config.json` under `root` and build the pipeline from it.
    pub fn discover(root: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let root = root.into();
        let config = AssetConfig::discover(&root);
        Self::new(root, config)
    }

    /// Build the pipeline with a directory index over the configured load paths.
    pub fn new(root: impl Into<PathBuf>, config: AssetConfig) -> Result<Self, ConfigurationError> {
        let root = root.into();
        let index: Arc<dyn LiveAssetIndex> = Arc::new(DirectoryIndex::new(config.load_paths(&root)));
        Self::with_index(root, config, index)
    }

    /// Build the pipeline around a caller-supplied live index.
    pub fn with_index(
        root: impl Into<PathBuf>,
        config: AssetConfig,
        index: Arc<dyn LiveAssetIndex>,
    ) -> Result<Self, ConfigurationError> {
        let root = root.into();

        let mut rules = if config.include_default_precompile {
            default_rules()
        } else {
            Vec::new()
        };
        rules.extend(parse_rules(&config.precompile)?);

        let source = match config.manifest_path(&root) {
            Some(path) => ManifestSource::File(path),
            None => ManifestSource::Directory(config.output_dir(&root)),
        };
        let precompiled = Arc::new(PrecompiledAssets::new(
            rules,
            Arc::clone(&index),
            config.cache_classes,
        ));

        tracing::debug!(
            "asset pipeline at {} resolving with {:?}",
            root.display(),
            config.resolve_order()
        );

        Ok(Self {
            root,
            manifest: Arc::new(ManifestCache::new(source)),
            config,
            index,
            precompiled,
        })
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration in effect.
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Live index, whether or not on-demand compilation is enabled for requests.
    pub fn index(&self) -> &Arc<dyn LiveAssetIndex> {
        &self.index
    }

    /// Cached build manifest.
    pub fn manifest(&self) -> &ManifestCache {
        &self.manifest
    }

    /// Cached precompile set.
    pub fn precompiled(&self) -> &PrecompiledAssets {
        &self.precompiled
    }

    /// Directory compiled assets are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir(&self.root)
    }

    /// Request path classification for the configured prefix.
    pub fn routes(&self) -> AssetRoutes {
        AssetRoutes::new(&self.config.prefix, self.config.quiet)
    }

    /// Providers handed to resolvers; the live index is only exposed when compiling on demand.
    pub fn sources(&self) -> ResolverSources {
        ResolverSources {
            manifest: Some(self.manifest.get()),
            environment: self.config.compile.then(|| Arc::clone(&self.index)),
            precompiled: self.precompiled.clone(),
            check_precompiled_asset: self.config.check_precompiled_asset,
        }
    }

    /// A resolver over the current manifest snapshot.
    pub fn resolver(&self) -> Result<AssetPathResolver, ConfigurationError> {
        AssetPathResolver::new(self.config.helper_options(), &self.sources())
    }

    /// Drop cached state so the next resolver sees fresh manifest and precompile data.
    pub fn reload(&self) {
        self.manifest.invalidate();
        self.precompiled.invalidate();
        tracing::debug!("asset pipeline caches invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::helper::{AssetPathOptions, ComputedPath};
    use crate::manifest::BuildManifest;
    use crate::models::AssetMetadata;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let assets = temp.path().join("app/assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("application.js"), b"app").unwrap();
        fs::write(assets.join("widgets.js"), b"widgets").unwrap();
        temp
    }

    #[test]
    fn development_resolves_live_and_enforces_precompile_list() {
        let temp = project();
        let pipeline = AssetPipeline::new(temp.path(), AssetConfig::default()).unwrap();
        let resolver = pipeline.resolver().unwrap();

        let path = resolver
            .compute_asset_path("application.js", &AssetPathOptions::default())
            .unwrap();
        assert!(matches!(path, ComputedPath::Pipeline(ref url) if url.starts_with("/assets/application-")));

        assert_eq!(
            resolver.digest_asset_path("widgets.js", &AssetPathOptions::default()),
            Err(ResolveError::AssetNotPrecompiled { path: "widgets.js".into() })
        );
    }

    #[test]
    fn production_uses_manifest_only() {
        let temp = project();
        let config = AssetConfig {
            compile: false,
            unknown_asset_fallback: false,
            ..AssetConfig::default()
        };
        let pipeline = AssetPipeline::new(temp.path(), config).unwrap();
        let mut manifest = BuildManifest::default();
        manifest.insert(
            "application.js",
            "application-0123.js",
            AssetMetadata {
                logical_path: "application.js".into(),
                ..AssetMetadata::default()
            },
        );
        manifest
            .save(&pipeline.output_dir().join(".sprockets-manifest-test.json"))
            .unwrap();

        let resolver = pipeline.resolver().unwrap();
        assert_eq!(
            resolver.digest_asset_path("application.js", &AssetPathOptions::default()),
            Ok("application-0123.js".into())
        );
        assert_eq!(
            resolver.digest_asset_path("widgets.js", &AssetPathOptions::default()),
            Err(ResolveError::AssetNotFound { path: "widgets.js".into() })
        );
    }

    #[test]
    fn reload_picks_up_new_manifest() {
        let temp = project();
        let config = AssetConfig {
            compile: false,
            ..AssetConfig::default()
        };
        let pipeline = AssetPipeline::new(temp.path(), config).unwrap();
        assert!(pipeline.manifest().get().is_empty());

        let mut manifest = BuildManifest::default();
        manifest.insert("a.js", "a-1.js", AssetMetadata::default());
        manifest
            .save(&pipeline.output_dir().join(".sprockets-manifest-test.json"))
            .unwrap();
        assert!(pipeline.manifest().get().is_empty());

        pipeline.reload();
        assert_eq!(pipeline.manifest().get().digest_of("a.js"), Some("a-1.js"));
    }

    #[test]
    fn explicit_environment_order_without_compile_is_fatal() {
        let temp = project();
        let config = AssetConfig {
            compile: false,
            resolve_with: Some(vec!["environment".into()]),
            ..AssetConfig::default()
        };
        let pipeline = AssetPipeline::new(temp.path(), config).unwrap();
        assert!(matches!(pipeline.resolver(), Err(ConfigurationError::MissingEnvironment)));
    }

    #[test]
    fn routes_follow_quiet_setting() {
        let temp = project();
        let pipeline = AssetPipeline::new(temp.path(), AssetConfig::default()).unwrap();
        assert!(!pipeline.routes().should_silence("/assets/application.js"));

        let config = AssetConfig {
            quiet: true,
            ..AssetConfig::default()
        };
        let pipeline = AssetPipeline::new(temp.path(), config).unwrap();
        assert!(pipeline.routes().should_silence("/assets/application.js"));
    }

    #[test]
    fn invalid_precompile_pattern_is_fatal() {
        let temp = project();
        let config = AssetConfig {
            precompile: vec!["/[/".into()],
            ..AssetConfig::default()
        };
        assert!(matches!(
            AssetPipeline::new(temp.path(), config),
            Err(ConfigurationError::InvalidPrecompilePattern { .. })
        ));
    }
}
