use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use asset_resolver::asset_paths::AssetKind;
use asset_resolver::builder::{AssetCompiler, DEFAULT_CLEAN_AGE};
use asset_resolver::config::AssetConfig;
use asset_resolver::helper::AssetPathOptions;
use asset_resolver::pipeline::AssetPipeline;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Compile and inspect digested assets.
#[derive(Debug, Parser)]
#[command(name = "assets", version, about)]
struct Cli {
  /// Project root containing the asset load paths.
  #[arg(long, default_value = ".")]
  root: PathBuf,
  /// Configuration file; defaults to `assets.config.json` under the root.
  #[arg(long)]
  config: Option<PathBuf>,
  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Compile every declared asset into the output directory.
  Precompile,
  /// Remove old compiled versions.
  Clean {
    /// Older versions to keep per asset; defaults to the configured value.
    #[arg(long)]
    keep: Option<usize>,
  },
  /// Remove the output directory.
  Clobber,
  /// Print the servable URL of an asset.
  Path(LookupArgs),
  /// Print the digest path of an asset.
  Digest(LookupArgs),
  /// Print the integrity hash of an asset.
  Integrity(LookupArgs),
}

#[derive(Debug, Args)]
struct LookupArgs {
  /// Logical asset path.
  path: String,
  /// Resolve the debug variant.
  #[arg(long)]
  debug: bool,
  /// Skip the precompile declaration check.
  #[arg(long)]
  allow_non_precompiled: bool,
  /// Asset kind, used for the implied extension.
  #[arg(long, value_enum)]
  kind: Option<KindArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
  Javascript,
  Stylesheet,
  Image,
  Video,
  Audio,
  Font,
}

impl From<KindArg> for AssetKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Javascript => AssetKind::Javascript,
      KindArg::Stylesheet => AssetKind::Stylesheet,
      KindArg::Image => AssetKind::Image,
      KindArg::Video => AssetKind::Video,
      KindArg::Audio => AssetKind::Audio,
      KindArg::Font => AssetKind::Font,
    }
  }
}

impl LookupArgs {
  fn options(&self) -> AssetPathOptions {
    AssetPathOptions {
      kind: self.kind.map(AssetKind::from),
      ..AssetPathOptions::default()
    }
    .with_debug(self.debug)
    .allowing_non_precompiled(self.allow_non_precompiled)
  }
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let config = match &cli.config {
    Some(path) => AssetConfig::from_path(path)?,
    None => AssetConfig::discover(&cli.root),
  };
  let keep_default = config.keep;
  let pipeline = AssetPipeline::new(&cli.root, config).context("invalid asset configuration")?;
  let compiler = AssetCompiler::new(&pipeline);

  match cli.command {
    Command::Precompile => {
      let report = compiler.precompile()?;
      tracing::info!(
        "compiled {} assets ({} written) into {}",
        report.compiled.len(),
        report.written.len(),
        report.manifest_path.display()
      );
    }
    Command::Clean { keep } => {
      let report = compiler.clean(keep.unwrap_or(keep_default), DEFAULT_CLEAN_AGE)?;
      tracing::info!("removed {} old assets", report.removed.len());
    }
    Command::Clobber => compiler.clobber()?,
    Command::Path(args) => {
      let resolver = pipeline.resolver()?;
      let url = resolver.compute_asset_path(&args.path, &args.options())?;
      println!("{}", url.as_str());
    }
    Command::Digest(args) => {
      let resolver = pipeline.resolver()?;
      println!("{}", resolver.digest_asset_path(&args.path, &args.options())?);
    }
    Command::Integrity(args) => {
      let resolver = pipeline.resolver()?;
      match resolver.asset_integrity(&args.path, &args.options())? {
        Some(integrity) => println!("{integrity}"),
        None => anyhow::bail!("no integrity recorded for {}", args.path),
      }
    }
  }
  Ok(())
}

fn main() -> ExitCode {
  init_logging();
  match run(Cli::parse()) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}
