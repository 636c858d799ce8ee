//! Resolution strategies and the ordered chain that consults them.
//!
//! The strategy set is closed: a build manifest lookup and a live index lookup. Both
//! answer the same four questions and report "not mine" as `Ok(None)` so the chain
//! can move on to the next strategy.

mod chain;
mod environment;
mod manifest;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use chain::{ResolverChain, ResolverSources};
pub use environment::EnvironmentResolver;
pub use manifest::ManifestResolver;

use crate::error::{ConfigurationError, Resolution};
use crate::models::AssetHandle;

/// Identifier of a resolution strategy as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Look assets up in the build manifest.
    Manifest,
    /// Look assets up in the live asset index.
    Environment,
}

impl ResolverKind {
    /// Configuration spelling of the identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Environment => "environment",
        }
    }
}

impl FromStr for ResolverKind {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().trim_start_matches(':') {
            "manifest" => Ok(Self::Manifest),
            "environment" => Ok(Self::Environment),
            _ => Err(ConfigurationError::UnknownResolver {
                name: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured strategy instance.
#[derive(Debug, Clone)]
pub enum Resolver {
    /// Build manifest strategy.
    Manifest(ManifestResolver),
    /// Live index strategy.
    Environment(EnvironmentResolver),
}

impl Resolver {
    /// Which strategy this is.
    pub fn kind(&self) -> ResolverKind {
        match self {
            Self::Manifest(_) => ResolverKind::Manifest,
            Self::Environment(_) => ResolverKind::Environment,
        }
    }

    /// Servable path for `path`.
    pub fn asset_path(&self, path: &str, digest: bool, allow_non_precompiled: bool) -> Resolution<String> {
        match self {
            Self::Manifest(resolver) => resolver.asset_path(path, digest, allow_non_precompiled),
            Self::Environment(resolver) => resolver.asset_path(path, digest, allow_non_precompiled),
        }
    }

    /// Digest path for `path`.
    pub fn digest_path(&self, path: &str, allow_non_precompiled: bool) -> Resolution<String> {
        match self {
            Self::Manifest(resolver) => resolver.digest_path(path, allow_non_precompiled),
            Self::Environment(resolver) => resolver.digest_path(path, allow_non_precompiled),
        }
    }

    /// Integrity hash for `path`.
    pub fn integrity(&self, path: &str) -> Resolution<String> {
        match self {
            Self::Manifest(resolver) => resolver.integrity(path),
            Self::Environment(resolver) => resolver.integrity(path),
        }
    }

    /// Debug asset for `path`.
    pub fn find_debug_asset(&self, path: &str) -> Resolution<AssetHandle> {
        match self {
            Self::Manifest(resolver) => resolver.find_debug_asset(path),
            Self::Environment(resolver) => resolver.find_debug_asset(path),
        }
    }
}
