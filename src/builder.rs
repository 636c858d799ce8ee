//! Build tasks: compile declared assets, clean old versions, remove compiled output.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};

use crate::environment::hex_digest;
use crate::manifest::{BuildManifest, manifest_path_for};
use crate::models::{Asset, Pipeline};
use crate::pipeline::AssetPipeline;

/// Default age under which old versions survive `clean` regardless of count.
pub const DEFAULT_CLEAN_AGE: Duration = Duration::hours(1);

/// Outcome of a precompile run.
#[derive(Debug, Clone, Default)]
pub struct PrecompileReport {
  /// Logical paths compiled during the run.
  pub compiled: Vec<String>,
  /// Digest paths written to disk (already present files are skipped).
  pub written: Vec<String>,
  /// Manifest file that was updated.
  pub manifest_path: PathBuf,
}

/// Outcome of a clean run.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
  /// Digest paths removed from disk and from the manifest.
  pub removed: Vec<String>,
}

/// Runs the compile, clean and clobber tasks for a pipeline.
pub struct AssetCompiler<'a> {
  pipeline: &'a AssetPipeline,
}

impl<'a> AssetCompiler<'a> {
  /// Create a compiler for the provided pipeline.
  pub fn new(pipeline: &'a AssetPipeline) -> Self {
    Self { pipeline }
  }

  fn manifest_path(&self, output: &Path) -> PathBuf {
    self
      .pipeline
      .config()
      .manifest_path(self.pipeline.root())
      .unwrap_or_else(|| manifest_path_for(output))
  }

  fn load_manifest(path: &Path) -> Result<BuildManifest> {
    if path.exists() {
      BuildManifest::load(path)
    } else {
      Ok(BuildManifest::default())
    }
  }

  /// Compile every asset selected by the precompile rules into the output directory.
  ///
  /// New entries are merged into the existing manifest so earlier versions stay
  /// servable until [`AssetCompiler::clean`] removes them.
  pub fn precompile(&self) -> Result<PrecompileReport> {
    let output = self.pipeline.output_dir();
    fs::create_dir_all(&output)
      .with_context(|| format!("failed to create {}", output.display()))?;
    let manifest_path = self.manifest_path(&output);
    let mut manifest = Self::load_manifest(&manifest_path)?;

    let selected = self.pipeline.precompiled().reload();
    let mut report = PrecompileReport {
      manifest_path: manifest_path.clone(),
      ..PrecompileReport::default()
    };

    for logical_path in selected.iter() {
      let handle = self
        .pipeline
        .index()
        .find(logical_path, Pipeline::Default)
        .ok_or_else(|| anyhow!("asset {logical_path} disappeared while compiling"))?;
      let asset = handle.asset();
      let destination = output.join(&asset.digest_path);

      if destination.exists() {
        tracing::debug!("skipping {}, already exists", destination.display());
      } else {
        if let Some(parent) = destination.parent() {
          fs::create_dir_all(parent)?;
        }
        install_compiled_asset(asset, &destination)
          .with_context(|| format!("failed to write {}", destination.display()))?;
        tracing::info!("Writing {}", destination.display());
        report.written.push(asset.digest_path.clone());
      }

      manifest.record(asset);
      report.compiled.push(logical_path.to_string());
    }

    manifest.save(&manifest_path)?;
    self.pipeline.manifest().invalidate();
    Ok(report)
  }

  /// Remove old versions of each asset.
  ///
  /// The current version is always kept, as are the `keep` most recent older versions
  /// and any older version younger than `age`.
  pub fn clean(&self, keep: usize, age: Duration) -> Result<CleanReport> {
    let output = self.pipeline.output_dir();
    let manifest_path = self.manifest_path(&output);
    if !manifest_path.exists() {
      return Ok(CleanReport::default());
    }
    let mut manifest = BuildManifest::load(&manifest_path)?;

    let stale = stale_versions(&manifest, keep, age, Utc::now());
    let mut report = CleanReport::default();
    for digest_path in stale {
      remove_compiled_file(&output.join(&digest_path))?;
      manifest.files.remove(&digest_path);
      tracing::info!("Removed {digest_path}");
      report.removed.push(digest_path);
    }

    manifest.save(&manifest_path)?;
    prune_empty_dirs(&output)?;
    self.pipeline.manifest().invalidate();
    Ok(report)
  }

  /// Remove the output directory and the manifest entirely.
  pub fn clobber(&self) -> Result<()> {
    let output = self.pipeline.output_dir();
    if let Some(explicit) = self.pipeline.config().manifest_path(self.pipeline.root()) {
      remove_compiled_file(&explicit)?;
    }
    match fs::remove_dir_all(&output) {
      Ok(()) => tracing::info!("Removed {}", output.display()),
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => {
        return Err(err).with_context(|| format!("failed to remove {}", output.display()));
      }
    }
    self.pipeline.manifest().invalidate();
    Ok(())
  }
}

/// Digest paths `clean` should remove, oldest last within each logical path.
fn stale_versions(
  manifest: &BuildManifest,
  keep: usize,
  age: Duration,
  now: DateTime<Utc>,
) -> Vec<String> {
  let mut versions: BTreeMap<&str, Vec<(&str, DateTime<Utc>)>> = BTreeMap::new();
  for (digest_path, meta) in &manifest.files {
    if manifest.digest_of(&meta.logical_path) == Some(digest_path.as_str()) {
      continue;
    }
    versions
      .entry(meta.logical_path.as_str())
      .or_default()
      .push((digest_path.as_str(), meta.mtime.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)));
  }

  let mut stale = Vec::new();
  for mut older in versions.into_values() {
    older.sort_by(|a, b| b.1.cmp(&a.1));
    stale.extend(
      older
        .into_iter()
        .enumerate()
        .skip_while(|(index, (_, mtime))| *index < keep || now - *mtime < age)
        .map(|(_, (digest_path, _))| digest_path.to_string()),
    );
  }
  stale
}

fn install_compiled_asset(asset: &Asset, destination: &Path) -> std::io::Result<()> {
  if let Some(source) = asset.filename.as_deref().filter(|source| source.is_file()) {
    // Copy only while the source on disk still matches what was digested.
    if hex_digest(&fs::read(source)?) == asset.digest {
      return fs::copy(source, destination).map(|_| ());
    }
  }
  fs::write(destination, &asset.source)
}

fn remove_compiled_file(path: &Path) -> Result<()> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
  }
}

fn prune_empty_dirs(root: &Path) -> std::io::Result<()> {
  if !root.exists() {
    return Ok(());
  }

  prune_empty_subtree(root, true)?;
  Ok(())
}

fn prune_empty_subtree(dir: &Path, is_root: bool) -> std::io::Result<bool> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
    Err(err) => return Err(err),
  };

  let mut has_files = false;
  for entry in entries {
    let entry = entry?;
    let path = entry.path();
    if entry.file_type()?.is_dir() {
      if prune_empty_subtree(&path, false)? {
        fs::remove_dir(&path)?;
      } else {
        has_files = true;
      }
    } else {
      has_files = true;
    }
  }

  Ok(!has_files && !is_root)
}
