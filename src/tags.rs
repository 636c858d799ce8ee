//! `<script>` and `<link>` tag rendering on top of [`AssetPathResolver`].

use std::collections::{BTreeMap, BTreeSet};

use crate::asset_paths::AssetKind;
use crate::error::ResolveError;
use crate::helper::{AssetPathOptions, AssetPathResolver};

/// Facts about the request a page is rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
  /// Request arrived over HTTPS.
  pub ssl: bool,
  /// Request came from the local machine.
  pub local: bool,
  /// The request explicitly asked for debug assets.
  pub debug_assets: bool,
}

impl RequestContext {
  /// Integrity metadata is only meaningful in secure contexts.
  pub fn is_secure(&self) -> bool {
    self.ssl || self.local
  }
}

/// Options for a single tag helper call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
  /// `Some(true)` requests an `integrity` attribute.
  pub integrity: Option<bool>,
  /// `Some(false)` disables debug expansion for this call.
  pub debug: Option<bool>,
  /// Extra attributes copied onto every tag.
  pub attributes: BTreeMap<String, String>,
}

/// Renders asset tags for a resolver and a request.
#[derive(Debug, Clone, Copy)]
pub struct TagRenderer<'a> {
  resolver: &'a AssetPathResolver,
  request: RequestContext,
}

impl<'a> TagRenderer<'a> {
  /// Create a renderer for one request.
  pub fn new(resolver: &'a AssetPathResolver, request: RequestContext) -> Self {
    Self { resolver, request }
  }

  /// `<script>` tags for the given sources, one per line.
  pub fn javascript_include_tag(&self, sources: &[&str], options: &TagOptions) -> Result<String, ResolveError> {
    self.render(AssetKind::Javascript, sources, options)
  }

  /// `<link rel="stylesheet">` tags for the given sources, one per line.
  pub fn stylesheet_link_tag(&self, sources: &[&str], options: &TagOptions) -> Result<String, ResolveError> {
    self.render(AssetKind::Stylesheet, sources, options)
  }

  fn wants_integrity(&self, options: &TagOptions) -> bool {
    self.request.is_secure() && options.integrity == Some(true)
  }

  fn expands_debug(&self, options: &TagOptions) -> bool {
    options.debug != Some(false) && (self.resolver.is_debug() || self.request.debug_assets)
  }

  fn render(&self, kind: AssetKind, sources: &[&str], options: &TagOptions) -> Result<String, ResolveError> {
    let path_options = AssetPathOptions::of_kind(kind);

    let tags = if self.expands_debug(options) {
      let mut tags = Vec::new();
      for source in sources {
        match self.resolver.find_debug_asset(source, &path_options)? {
          Some(handle) => {
            let debug_options = path_options.clone().with_debug(true);
            for part in handle.parts() {
              let url = self
                .resolver
                .compute_asset_path(&part.logical_path, &debug_options)?;
              tags.push(asset_tag(kind, url.as_str(), &options.attributes));
            }
          }
          None => {
            let url = self.resolver.compute_asset_path(source, &path_options)?;
            tags.push(asset_tag(kind, url.as_str(), &options.attributes));
          }
        }
      }
      dedupe(tags)
    } else {
      let integrity = self.wants_integrity(options);
      let mut tags = Vec::with_capacity(sources.len());
      for source in sources {
        let mut attributes = options.attributes.clone();
        if integrity {
          if let Some(hash) = self.resolver.asset_integrity(source, &path_options)? {
            attributes.insert("integrity".into(), hash);
          }
        }
        let url = self.resolver.compute_asset_path(source, &path_options)?;
        tags.push(asset_tag(kind, url.as_str(), &attributes));
      }
      tags
    };

    Ok(tags.join("\n"))
  }
}

fn asset_tag(kind: AssetKind, url: &str, attributes: &BTreeMap<String, String>) -> String {
  let extra: String = attributes
    .iter()
    .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attribute(value)))
    .collect();
  match kind {
    AssetKind::Stylesheet => format!(
      "<link rel=\"stylesheet\" href=\"{}\"{} />",
      escape_attribute(url),
      extra
    ),
    _ => format!("<script src=\"{}\"{}></script>", escape_attribute(url), extra),
  }
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
  let mut seen = BTreeSet::new();
  tags
    .into_iter()
    .filter(|tag| seen.insert(tag.clone()))
    .collect()
}

fn escape_attribute(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(ch),
    }
  }
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::environment::{LiveAssetIndex, MemoryIndex};
  use crate::helper::HelperOptions;
  use crate::manifest::BuildManifest;
  use crate::models::AssetMetadata;
  use crate::resolvers::ResolverSources;
  use std::sync::Arc;

  fn production() -> AssetPathResolver {
    let mut manifest = BuildManifest::default();
    manifest.insert(
      "app.js",
      "app-abc.js",
      AssetMetadata {
        logical_path: "app.js".into(),
        integrity: Some("sha256-XYZ".into()),
        ..AssetMetadata::default()
      },
    );
    manifest.insert(
      "app.css",
      "app-def.css",
      AssetMetadata {
        logical_path: "app.css".into(),
        integrity: Some("sha256-CSS".into()),
        ..AssetMetadata::default()
      },
    );
    let sources = ResolverSources {
      manifest: Some(Arc::new(manifest)),
      environment: None,
      precompiled: Arc::new(|_: &str| true),
      check_precompiled_asset: true,
    };
    let options = HelperOptions {
      resolve_with: vec!["manifest".into()],
      unknown_asset_fallback: false,
      ..HelperOptions::default()
    };
    AssetPathResolver::new(options, &sources).unwrap()
  }

  fn development() -> AssetPathResolver {
    let index: Arc<dyn LiveAssetIndex> = Arc::new(
      MemoryIndex::new()
        .with_asset("app.js", "app")
        .with_asset("lib.js", "lib")
        .with_asset("other.js", "other")
        .with_debug_bundle("app.js", &["lib.js", "app.js"])
        .with_debug_bundle("other.js", &["lib.js", "other.js"]),
    );
    let sources = ResolverSources {
      manifest: None,
      environment: Some(index),
      precompiled: Arc::new(|path: &str| path == "app.js" || path == "other.js"),
      check_precompiled_asset: true,
    };
    let options = HelperOptions {
      digest: false,
      debug: true,
      resolve_with: vec!["environment".into()],
      ..HelperOptions::default()
    };
    AssetPathResolver::new(options, &sources).unwrap()
  }

  fn secure() -> RequestContext {
    RequestContext {
      ssl: true,
      ..RequestContext::default()
    }
  }

  #[test]
  fn renders_script_and_link_tags() {
    let resolver = production();
    let renderer = TagRenderer::new(&resolver, RequestContext::default());

    assert_eq!(
      renderer.javascript_include_tag(&["app"], &TagOptions::default()).unwrap(),
      "<script src=\"/assets/app-abc.js\"></script>"
    );
    assert_eq!(
      renderer.stylesheet_link_tag(&["app"], &TagOptions::default()).unwrap(),
      "<link rel=\"stylesheet\" href=\"/assets/app-def.css\" />"
    );
  }

  #[test]
  fn integrity_only_in_secure_contexts() {
    let resolver = production();
    let options = TagOptions {
      integrity: Some(true),
      ..TagOptions::default()
    };

    let insecure = TagRenderer::new(&resolver, RequestContext::default());
    assert!(!insecure.javascript_include_tag(&["app"], &options).unwrap().contains("integrity"));

    let secure_renderer = TagRenderer::new(&resolver, secure());
    assert_eq!(
      secure_renderer.javascript_include_tag(&["app"], &options).unwrap(),
      "<script src=\"/assets/app-abc.js\" integrity=\"sha256-XYZ\"></script>"
    );
    assert!(!secure_renderer
      .javascript_include_tag(&["app"], &TagOptions::default())
      .unwrap()
      .contains("integrity"));
  }

  #[test]
  fn local_requests_count_as_secure() {
    let request = RequestContext {
      local: true,
      ..RequestContext::default()
    };
    assert!(request.is_secure());
    assert!(!RequestContext::default().is_secure());
  }

  #[test]
  fn escapes_extra_attributes() {
    let resolver = production();
    let renderer = TagRenderer::new(&resolver, RequestContext::default());
    let mut attributes = BTreeMap::new();
    attributes.insert("data-turbo-track".to_string(), "\"reload\"".to_string());
    let options = TagOptions {
      attributes,
      ..TagOptions::default()
    };
    assert_eq!(
      renderer.javascript_include_tag(&["app"], &options).unwrap(),
      "<script src=\"/assets/app-abc.js\" data-turbo-track=\"&quot;reload&quot;\"></script>"
    );
  }

  #[test]
  fn debug_expands_bundles_and_dedupes() {
    let resolver = development();
    let renderer = TagRenderer::new(&resolver, RequestContext::default());
    let html = renderer
      .javascript_include_tag(&["app", "other"], &TagOptions::default())
      .unwrap();
    assert_eq!(
      html,
      [
        "<script src=\"/assets/lib.js\"></script>",
        "<script src=\"/assets/app.js\"></script>",
        "<script src=\"/assets/other.js\"></script>",
      ]
      .join("\n")
    );
  }

  #[test]
  fn debug_can_be_disabled_per_call() {
    let resolver = development();
    let renderer = TagRenderer::new(&resolver, RequestContext::default());
    let options = TagOptions {
      debug: Some(false),
      ..TagOptions::default()
    };
    assert_eq!(
      renderer.javascript_include_tag(&["app"], &options).unwrap(),
      "<script src=\"/assets/app.js\"></script>"
    );
  }

  #[test]
  fn debug_requires_declared_assets() {
    let resolver = development();
    let renderer = TagRenderer::new(&resolver, RequestContext::default());
    let err = renderer
      .javascript_include_tag(&["lib"], &TagOptions::default())
      .unwrap_err();
    assert_eq!(err, ResolveError::AssetNotPrecompiled { path: "lib.js".into() });
  }

  #[test]
  fn request_flag_turns_on_debug_expansion() {
    let resolver = production();
    let request = RequestContext {
      debug_assets: true,
      ..RequestContext::default()
    };
    let renderer = TagRenderer::new(&resolver, request);
    // Manifests have no debug information, so sources render normally.
    assert_eq!(
      renderer.javascript_include_tag(&["app"], &TagOptions::default()).unwrap(),
      "<script src=\"/assets/app-abc.js\"></script>"
    );
  }
}
