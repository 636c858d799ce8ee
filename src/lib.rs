#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
pub mod helper;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod precompile;
pub mod resolvers;
pub mod routes;
pub mod tags;

pub use builder::{AssetCompiler, CleanReport, PrecompileReport};
pub use config::AssetConfig;
pub use environment::{DirectoryIndex, LiveAssetIndex, MemoryIndex};
pub use error::{ConfigurationError, Resolution, ResolveError};
pub use helper::{AssetPathOptions, AssetPathResolver, ComputedPath, HelperOptions};
pub use manifest::{BuildManifest, ManifestCache};
pub use models::{Asset, AssetHandle, AssetMetadata, Pipeline};
pub use pipeline::AssetPipeline;
pub use precompile::{PrecompileChecker, PrecompileRule, PrecompiledAssets};
pub use resolvers::{Resolver, ResolverChain, ResolverKind, ResolverSources};
pub use routes::AssetRoutes;
pub use tags::{RequestContext, TagOptions, TagRenderer};
