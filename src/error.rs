//! Error kinds surfaced by asset resolution and resolver setup.

/// Fatal setup errors raised while wiring resolver strategies together.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A `resolve_with` entry names a strategy that does not exist.
    #[error("unrecognized asset resolver: {name:?}. Expected \"manifest\" or \"environment\"")]
    UnknownResolver {
        /// The offending identifier as configured.
        name: String,
    },

    /// The manifest strategy was configured but no build manifest could be found.
    #[error("resolve_with includes \"manifest\", but no build manifest is available")]
    MissingManifest,

    /// The environment strategy was configured but no live asset index exists.
    #[error("resolve_with includes \"environment\", but no live asset index is configured")]
    MissingEnvironment,

    /// A precompile rule written as `/.../` is not a valid regular expression.
    #[error("invalid precompile pattern {pattern:?}: {source}")]
    InvalidPrecompilePattern {
        /// Pattern text without the surrounding slashes.
        pattern: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Resolution failures handed back to the caller, who decides how loud to be.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No strategy knows the asset and the public fallback is disabled.
    #[error("The asset {path:?} is not present in the asset pipeline.")]
    AssetNotFound {
        /// Logical path that was requested.
        path: String,
    },

    /// The asset exists in the live index but is missing from the precompile list.
    #[error(
        "Asset `{path}` was not declared to be precompiled in production.\n  → Fix: Add `{path}` to the \"precompile\" list in assets.config.json\n  → Then restart your server"
    )]
    AssetNotPrecompiled {
        /// Logical path of the undeclared asset.
        path: String,
    },
}

impl ResolveError {
    /// Logical path carried by the error.
    pub fn path(&self) -> &str {
        match self {
            Self::AssetNotFound { path } | Self::AssetNotPrecompiled { path } => path,
        }
    }
}

/// Three-state outcome used throughout the resolver chain: a value, absent, or an error.
pub type Resolution<T> = Result<Option<T>, ResolveError>;
