//! Project configuration loader describing how assets are located, resolved and compiled.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::asset_paths::join_asset_path;
use crate::helper::HelperOptions;
use crate::resolvers::ResolverKind;

/// Name of the configuration file searched for in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "assets.config.json";

/// Discoverable asset pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// URL prefix compiled assets are served under; also the output sub-directory.
    pub prefix: String,
    /// Serve digested file names.
    pub digest: bool,
    /// Expand debug bundles when rendering tags.
    pub debug: bool,
    /// Compile assets on demand through a live index.
    pub compile: bool,
    /// Fail on assets found live but missing from the precompile list.
    pub check_precompiled_asset: bool,
    /// Fall back to public-folder paths for unknown assets instead of failing.
    pub unknown_asset_fallback: bool,
    /// Keep computed state (precompile set) for the process lifetime.
    pub cache_classes: bool,
    /// Silence request logging for paths under `prefix`.
    pub quiet: bool,
    /// Strategy order; derived from `digest`, `debug` and `compile` when omitted.
    pub resolve_with: Option<Vec<String>>,
    /// Extra precompile rules; `/.../` entries are regular expressions.
    pub precompile: Vec<String>,
    /// Add the conventional rules (application bundles and non-JS/CSS files).
    pub include_default_precompile: bool,
    /// Asset load paths relative to the project root, highest priority first.
    pub paths: Vec<String>,
    /// Public directory relative to the project root.
    pub public_dir: String,
    /// Explicit manifest file relative to the project root.
    pub manifest: Option<String>,
    /// Older versions of each asset kept by `clean`.
    pub keep: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            prefix: "/assets".into(),
            digest: true,
            debug: false,
            compile: true,
            check_precompiled_asset: true,
            unknown_asset_fallback: true,
            cache_classes: false,
            quiet: false,
            resolve_with: None,
            precompile: Vec::new(),
            include_default_precompile: true,
            paths: vec!["app/assets".into()],
            public_dir: "public".into(),
            manifest: None,
            keep: 2,
        }
    }
}

impl AssetConfig {
    /// Load configuration from the project root.
    ///
    /// A missing file yields the defaults. A file that fails to parse is reported and
    /// the defaults are used so callers can keep running.
    pub fn discover(root: &Path) -> Self {
        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if !candidate.exists() {
            return Self::default();
        }
        match Self::from_path(&candidate) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err:#}; using default asset configuration");
                Self::default()
            }
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Strategy order in effect.
    ///
    /// Without an explicit list the manifest is consulted when digests are served
    /// outside debug mode, followed by the live index when compiling on demand.
    pub fn resolve_order(&self) -> Vec<String> {
        if let Some(order) = &self.resolve_with {
            return order.clone();
        }

        let mut order = Vec::new();
        if self.digest && !self.debug {
            order.push(ResolverKind::Manifest.to_string());
        }
        if self.compile {
            order.push(ResolverKind::Environment.to_string());
        }
        order
    }

    /// Resolver settings derived from this configuration.
    pub fn helper_options(&self) -> HelperOptions {
        HelperOptions {
            prefix: self.prefix.clone(),
            digest: self.digest,
            debug: self.debug,
            resolve_with: self.resolve_order(),
            check_precompiled_asset: self.check_precompiled_asset,
            unknown_asset_fallback: self.unknown_asset_fallback,
        }
    }

    /// Absolute load paths.
    pub fn load_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.paths.iter().map(|path| root.join(path)).collect()
    }

    /// Directory compiled assets are written to (`<public_dir>/<prefix>`).
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        let relative = join_asset_path(&self.public_dir, &self.prefix);
        root.join(relative.trim_start_matches('/'))
    }

    /// Explicit manifest file, if configured.
    pub fn manifest_path(&self, root: &Path) -> Option<PathBuf> {
        self.manifest.as_ref().map(|path| root.join(path))
    }
}
