//! Public asset path resolution API.
//!
//! [`AssetPathResolver`] turns logical asset references into servable URLs, digest paths
//! and integrity metadata by probing the configured [`ResolverChain`]. It knows nothing
//! about markup; [`crate::tags::TagRenderer`] builds on top of it.

use crate::asset_paths::{AssetKind, is_external_reference, join_asset_path, path_with_extname};
use crate::error::{ConfigurationError, Resolution, ResolveError};
use crate::models::AssetHandle;
use crate::resolvers::{ResolverChain, ResolverSources};

/// Settings the resolver is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperOptions {
    /// URL prefix compiled assets are served under.
    pub prefix: String,
    /// Serve digested file names.
    pub digest: bool,
    /// Expand debug bundles when rendering tags.
    pub debug: bool,
    /// Strategy identifiers in probe order.
    pub resolve_with: Vec<String>,
    /// Fail on assets missing from the precompile list.
    pub check_precompiled_asset: bool,
    /// Fall back to public-folder paths for unknown assets instead of failing.
    pub unknown_asset_fallback: bool,
}

impl Default for HelperOptions {
    fn default() -> Self {
        Self {
            prefix: "/assets".into(),
            digest: true,
            debug: false,
            resolve_with: vec!["manifest".into(), "environment".into()],
            check_precompiled_asset: true,
            unknown_asset_fallback: true,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPathOptions {
    /// Debug rendering; implies `allow_non_precompiled`.
    pub debug: bool,
    /// Skip the precompile declaration check.
    pub allow_non_precompiled: bool,
    /// Kind of asset, used for the implied extension and the public fallback directory.
    pub kind: Option<AssetKind>,
    /// Extension to append instead of the one implied by `kind`.
    pub extname: Option<String>,
}

impl AssetPathOptions {
    /// Options for an asset of the given kind.
    pub fn of_kind(kind: AssetKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Set the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set whether undeclared assets are acceptable.
    pub fn allowing_non_precompiled(mut self, allow: bool) -> Self {
        self.allow_non_precompiled = allow;
        self
    }

    fn allows_non_precompiled(&self) -> bool {
        self.debug || self.allow_non_precompiled
    }

    /// Lookup key shared by every strategy: no leading slash, implied extension appended.
    fn source_path(&self, path: &str) -> String {
        path_with_extname(path.trim_start_matches('/'), self.kind, self.extname.as_deref())
    }
}

/// URL produced by [`AssetPathResolver::compute_asset_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputedPath {
    /// Resolved through the asset pipeline and joined under the prefix.
    Pipeline(String),
    /// An absolute, root-relative or inline URL, passed through untouched.
    External(String),
    /// Unknown asset mapped into the public folder; it may not exist.
    PublicFallback(String),
}

impl ComputedPath {
    /// The URL.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pipeline(path) | Self::External(path) | Self::PublicFallback(path) => path,
        }
    }

    /// Take the URL.
    pub fn into_string(self) -> String {
        match self {
            Self::Pipeline(path) | Self::External(path) | Self::PublicFallback(path) => path,
        }
    }

    /// Returns `true` when the unknown-asset fallback produced this path.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::PublicFallback(_))
    }
}

/// Resolves logical asset paths through the configured strategies.
#[derive(Debug, Clone)]
pub struct AssetPathResolver {
    options: HelperOptions,
    chain: ResolverChain,
}

impl AssetPathResolver {
    /// Build the resolver and its strategy chain.
    pub fn new(options: HelperOptions, sources: &ResolverSources) -> Result<Self, ConfigurationError> {
        let sources = ResolverSources {
            check_precompiled_asset: options.check_precompiled_asset,
            ..sources.clone()
        };
        let chain = ResolverChain::new(&options.resolve_with, &sources)?;
        Ok(Self { options, chain })
    }

    /// Settings in effect.
    pub fn options(&self) -> &HelperOptions {
        &self.options
    }

    /// Strategy chain in probe order.
    pub fn chain(&self) -> &ResolverChain {
        &self.chain
    }

    /// Whether debug expansion is enabled.
    pub fn is_debug(&self) -> bool {
        self.options.debug
    }

    /// Servable URL for an asset reference.
    ///
    /// Unknown assets fail with [`ResolveError::AssetNotFound`] unless the unknown-asset
    /// fallback is enabled, in which case a public-folder path is returned and a
    /// deprecation warning is logged.
    pub fn compute_asset_path(
        &self,
        path: &str,
        options: &AssetPathOptions,
    ) -> Result<ComputedPath, ResolveError> {
        // Root-relative paths already name a public URL.
        if is_external_reference(path) || path.starts_with('/') {
            return Ok(ComputedPath::External(path.to_string()));
        }

        let source = options.source_path(path);
        if let Some(resolved) = self.resolve_asset_path(&source, options.allows_non_precompiled())? {
            return Ok(ComputedPath::Pipeline(join_asset_path(
                &self.options.prefix,
                &resolved,
            )));
        }

        if !self.options.unknown_asset_fallback {
            return Err(ResolveError::AssetNotFound { path: source });
        }

        tracing::warn!(
            "The asset {source:?} is not present in the asset pipeline. Falling back to an asset \
             that may be in the public folder. This behavior is deprecated and will be removed."
        );
        let directory = options.kind.map_or("", AssetKind::public_directory);
        Ok(ComputedPath::PublicFallback(join_asset_path(directory, &source)))
    }

    /// Raw chain answer for the servable path, without prefix or fallback.
    pub fn resolve_asset_path(&self, path: &str, allow_non_precompiled: bool) -> Resolution<String> {
        let digest = self.options.digest;
        self.chain
            .try_each(|resolver| resolver.asset_path(path, digest, allow_non_precompiled))
    }

    /// Digest path of an asset.
    pub fn digest_asset_path(&self, path: &str, options: &AssetPathOptions) -> Result<String, ResolveError> {
        let source = options.source_path(path);
        let allow = options.allows_non_precompiled();
        self.chain
            .try_each(|resolver| resolver.digest_path(&source, allow))?
            .ok_or(ResolveError::AssetNotFound { path: source })
    }

    /// Integrity hash of an asset; absent when unknown or not recorded.
    pub fn asset_integrity(&self, path: &str, options: &AssetPathOptions) -> Resolution<String> {
        let source = options.source_path(path);
        self.chain.try_each(|resolver| resolver.integrity(&source))
    }

    /// Debug variant of an asset, which may be a multi-file bundle.
    pub fn find_debug_asset(&self, path: &str, options: &AssetPathOptions) -> Resolution<AssetHandle> {
        let source = options.source_path(path);
        self.chain.try_each(|resolver| resolver.find_debug_asset(&source))
    }
}
