use std::sync::Arc;

use super::{EnvironmentResolver, ManifestResolver, Resolver, ResolverKind};
use crate::environment::LiveAssetIndex;
use crate::error::{ConfigurationError, Resolution};
use crate::manifest::BuildManifest;
use crate::precompile::PrecompileChecker;

/// Backing providers strategies are built from.
#[derive(Clone)]
pub struct ResolverSources {
    /// Build manifest snapshot, when one exists.
    pub manifest: Option<Arc<BuildManifest>>,
    /// Live asset index, when assets are compiled on demand.
    pub environment: Option<Arc<dyn LiveAssetIndex>>,
    /// Precompile declaration check used by the live strategy.
    pub precompiled: Arc<dyn PrecompileChecker>,
    /// Whether undeclared assets found in the live index are an error.
    pub check_precompiled_asset: bool,
}

/// Strategies in configured order.
#[derive(Debug, Clone)]
pub struct ResolverChain {
    resolvers: Vec<Resolver>,
}

impl ResolverChain {
    /// Build the chain from configured identifiers.
    ///
    /// Unknown identifiers and strategies missing their provider fail here, never at
    /// resolution time.
    pub fn new<S: AsRef<str>>(order: &[S], sources: &ResolverSources) -> Result<Self, ConfigurationError> {
        let kinds = order
            .iter()
            .map(|name| name.as_ref().parse::<ResolverKind>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_kinds(&kinds, sources)
    }

    /// Build the chain from already parsed identifiers.
    pub fn from_kinds(kinds: &[ResolverKind], sources: &ResolverSources) -> Result<Self, ConfigurationError> {
        let resolvers = kinds
            .iter()
            .map(|kind| match kind {
                ResolverKind::Manifest => {
                    ManifestResolver::new(sources.manifest.clone()).map(Resolver::Manifest)
                }
                ResolverKind::Environment => EnvironmentResolver::new(
                    sources.environment.clone(),
                    Arc::clone(&sources.precompiled),
                    sources.check_precompiled_asset,
                )
                .map(Resolver::Environment),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { resolvers })
    }

    /// Ask each strategy in turn; the first value or error ends the probe.
    pub fn try_each<T, F>(&self, mut probe: F) -> Resolution<T>
    where
        F: FnMut(&Resolver) -> Resolution<T>,
    {
        for resolver in &self.resolvers {
            if let Some(value) = probe(resolver)? {
                tracing::debug!("resolved by {} strategy", resolver.kind());
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Configured strategy order.
    pub fn kinds(&self) -> Vec<ResolverKind> {
        self.resolvers.iter().map(Resolver::kind).collect()
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns `true` when no strategy is configured.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
