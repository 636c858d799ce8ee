//! Precompile declarations and the cached set of assets they select.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::asset_paths::extname;
use crate::environment::LiveAssetIndex;
use crate::error::ConfigurationError;

/// Pattern selecting the conventional application bundles.
const APPLICATION_BUNDLE_PATTERN: &str = r"(?:/|\\|\A)application\.(css|js)$";

/// A single entry of the precompile list.
#[derive(Debug, Clone)]
pub enum PrecompileRule {
  /// Exactly this logical path.
  Exact(String),
  /// Every logical path matching the expression.
  Pattern(Regex),
  /// Shell-style wildcard (`admin/*.js`); `*` also crosses directory separators.
  Glob {
    /// Wildcard as configured.
    glob: String,
    /// Anchored expression the wildcard compiles to.
    matcher: Regex,
  },
  /// Every logical path that is neither JavaScript, CSS nor extensionless (images, fonts, ...).
  LooseAppAssets,
}

impl PrecompileRule {
  /// Parse a configured rule.
  ///
  /// Values wrapped in slashes (`/\.png$/`) are regular expressions, values containing
  /// `*`, `?` or `[` are wildcards, anything else is an exact logical path.
  pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
    let value = raw.trim();
    if value.len() >= 2 && value.starts_with('/') && value.ends_with('/') {
      let pattern = &value[1..value.len() - 1];
      return Regex::new(pattern).map(Self::Pattern).map_err(|source| {
        ConfigurationError::InvalidPrecompilePattern {
          pattern: pattern.to_string(),
          source,
        }
      });
    }
    let value = value.trim_matches('/');
    if value.contains(['*', '?', '[']) {
      return Regex::new(&glob_to_regex(value))
        .map(|matcher| Self::Glob {
          glob: value.to_string(),
          matcher,
        })
        .map_err(|source| ConfigurationError::InvalidPrecompilePattern {
          pattern: value.to_string(),
          source,
        });
    }
    Ok(Self::Exact(value.to_string()))
  }

  /// Returns `true` when the rule selects `logical_path`.
  pub fn matches(&self, logical_path: &str) -> bool {
    match self {
      Self::Exact(path) => path == logical_path,
      Self::Pattern(pattern) => pattern.is_match(logical_path),
      Self::Glob { matcher, .. } => matcher.is_match(logical_path),
      Self::LooseAppAssets => !matches!(extname(logical_path), ".js" | ".css" | ""),
    }
  }
}

/// Translate an fnmatch-style wildcard into an anchored regular expression.
fn glob_to_regex(glob: &str) -> String {
  let mut pattern = String::from(r"\A");
  let mut chars = glob.chars();
  while let Some(ch) = chars.next() {
    match ch {
      '*' => pattern.push_str(".*"),
      '?' => pattern.push('.'),
      '\\' => {
        if let Some(escaped) = chars.next() {
          pattern.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
        }
      }
      '[' => {
        let rest = chars.as_str();
        match rest.find(']') {
          Some(end) => {
            let body = &rest[..end];
            pattern.push('[');
            let body = match body.strip_prefix(['!', '^']) {
              Some(negated) => {
                pattern.push('^');
                negated
              }
              None => body,
            };
            for member in body.chars() {
              if matches!(member, '\\' | '[' | '&' | '~' | '^') {
                pattern.push('\\');
              }
              pattern.push(member);
            }
            pattern.push(']');
            chars = rest[end + 1..].chars();
          }
          None => pattern.push_str(r"\["),
        }
      }
      other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
    }
  }
  pattern.push_str(r"\z");
  pattern
}

/// Rules applied when the configuration does not opt out of the defaults.
pub fn default_rules() -> Vec<PrecompileRule> {
  vec![
    PrecompileRule::LooseAppAssets,
    PrecompileRule::Pattern(
      Regex::new(APPLICATION_BUNDLE_PATTERN).expect("invalid application bundle regex"),
    ),
  ]
}

/// Parse a list of configured rules, discarding blank entries.
pub fn parse_rules<I, S>(values: I) -> Result<Vec<PrecompileRule>, ConfigurationError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  values
    .into_iter()
    .filter(|value| !value.as_ref().trim().trim_matches('/').is_empty())
    .map(|value| PrecompileRule::parse(value.as_ref()))
    .collect()
}

/// Answers whether a logical path was declared for precompilation.
pub trait PrecompileChecker: Send + Sync {
  /// Returns `true` when `logical_path` will be part of the production build.
  fn is_precompiled(&self, logical_path: &str) -> bool;
}

impl<F> PrecompileChecker for F
where
  F: Fn(&str) -> bool + Send + Sync,
{
  fn is_precompiled(&self, logical_path: &str) -> bool {
    self(logical_path)
  }
}

/// Logical paths selected by the precompile rules at a point in time.
#[derive(Debug, Clone)]
pub struct PrecompileSet {
  paths: BTreeSet<String>,
  loaded_at: DateTime<Utc>,
}

impl PrecompileSet {
  /// Evaluate `rules` against every logical path known to `index`.
  pub fn compute(rules: &[PrecompileRule], index: &dyn LiveAssetIndex) -> Self {
    let paths = index
      .logical_paths()
      .into_iter()
      .filter(|path| rules.iter().any(|rule| rule.matches(path)))
      .collect();
    Self {
      paths,
      loaded_at: Utc::now(),
    }
  }

  /// Returns `true` when the set holds `logical_path`.
  pub fn contains(&self, logical_path: &str) -> bool {
    self.paths.contains(logical_path)
  }

  /// Selected paths in sorted order.
  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.paths.iter().map(String::as_str)
  }

  /// Number of selected paths.
  pub fn len(&self) -> usize {
    self.paths.len()
  }

  /// Returns `true` when nothing is selected.
  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// When the set was computed.
  pub fn loaded_at(&self) -> DateTime<Utc> {
    self.loaded_at
  }
}

/// Lazily computed, cached precompile set bound to a live index.
///
/// With `cache_classes` off (development) a miss recomputes the set once before
/// answering, so edits to the asset tree are picked up without a restart.
pub struct PrecompiledAssets {
  rules: Vec<PrecompileRule>,
  index: Arc<dyn LiveAssetIndex>,
  cache_classes: bool,
  cached: RwLock<Option<Arc<PrecompileSet>>>,
}

impl std::fmt::Debug for PrecompiledAssets {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PrecompiledAssets")
      .field("rules", &self.rules)
      .field("cache_classes", &self.cache_classes)
      .finish_non_exhaustive()
  }
}

impl PrecompiledAssets {
  /// Create a checker; nothing is computed until the first query.
  pub fn new(
    rules: Vec<PrecompileRule>,
    index: Arc<dyn LiveAssetIndex>,
    cache_classes: bool,
  ) -> Self {
    Self {
      rules,
      index,
      cache_classes,
      cached: RwLock::new(None),
    }
  }

  /// Rules the set is computed from.
  pub fn rules(&self) -> &[PrecompileRule] {
    &self.rules
  }

  /// Current set, computing it on first access.
  pub fn set(&self) -> Arc<PrecompileSet> {
    if let Some(set) = self.cached.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
      return Arc::clone(set);
    }

    let mut slot = self.cached.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = slot.as_ref() {
      return Arc::clone(set);
    }
    let set = Arc::new(PrecompileSet::compute(&self.rules, self.index.as_ref()));
    tracing::debug!("computed precompile set ({} assets)", set.len());
    *slot = Some(Arc::clone(&set));
    set
  }

  /// Recompute and publish a fresh set.
  pub fn reload(&self) -> Arc<PrecompileSet> {
    let set = Arc::new(PrecompileSet::compute(&self.rules, self.index.as_ref()));
    *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&set));
    set
  }

  /// Drop the cached set; the next query recomputes it.
  pub fn invalidate(&self) {
    *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
  }
}

impl PrecompileChecker for PrecompiledAssets {
  fn is_precompiled(&self, logical_path: &str) -> bool {
    if self.set().contains(logical_path) {
      true
    } else if !self.cache_classes {
      self.reload().contains(logical_path)
    } else {
      false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::environment::MemoryIndex;
  use crate::models::{AssetHandle, Pipeline};
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Index whose listing can change between calls.
  struct GrowingIndex {
    paths: Mutex<Vec<String>>,
  }

  impl LiveAssetIndex for GrowingIndex {
    fn find(&self, _logical_path: &str, _pipeline: Pipeline) -> Option<AssetHandle> {
      None
    }

    fn logical_paths(&self) -> Vec<String> {
      self.paths.lock().unwrap().clone()
    }
  }

  #[test]
  fn parses_exact_and_pattern_rules() {
    let rules = parse_rules(["admin.js", " /\\.svg$/ ", "", "/"]).unwrap();
    assert_eq!(rules.len(), 2);
    assert!(rules[0].matches("admin.js"));
    assert!(!rules[0].matches("admin.css"));
    assert!(rules[1].matches("icons/logo.svg"));
  }

  #[test]
  fn wildcard_rules_match_like_fnmatch() {
    let rules = parse_rules(["admin/*.js", "icons/logo-?.png", "themes/[!x]*.css"]).unwrap();
    assert!(matches!(rules[0], PrecompileRule::Glob { .. }));
    assert!(rules[0].matches("admin/users.js"));
    assert!(rules[0].matches("admin/nested/users.js"));
    assert!(!rules[0].matches("admin/users.css"));
    assert!(!rules[0].matches("public/admin/users.js"));
    assert!(rules[1].matches("icons/logo-1.png"));
    assert!(!rules[1].matches("icons/logo-12.png"));
    assert!(rules[2].matches("themes/dark.css"));
    assert!(!rules[2].matches("themes/xmas.css"));
  }

  #[test]
  fn wildcard_literals_are_escaped() {
    let rule = PrecompileRule::parse("vendor/jquery.min.*").unwrap();
    assert!(rule.matches("vendor/jquery.min.js"));
    assert!(!rule.matches("vendor/jqueryXmin.js"));
    assert!(matches!(
      PrecompileRule::parse("broken[].js"),
      Err(ConfigurationError::InvalidPrecompilePattern { .. })
    ));
  }

  #[test]
  fn rejects_invalid_patterns() {
    let err = PrecompileRule::parse("/(unclosed/").unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidPrecompilePattern { .. }));
  }

  #[test]
  fn default_rules_select_bundles_and_loose_assets() {
    let rules = default_rules();
    let selected = |path: &str| rules.iter().any(|rule| rule.matches(path));
    assert!(selected("application.js"));
    assert!(selected("admin/application.css"));
    assert!(selected("logo.png"));
    assert!(!selected("widgets.js"));
    assert!(!selected("reset.css"));
    assert!(!selected("LICENSE"));
  }

  #[test]
  fn computes_set_from_index_listing() {
    let index: Arc<dyn LiveAssetIndex> = Arc::new(
      MemoryIndex::new()
        .with_asset("application.js", "a")
        .with_asset("widgets.js", "b")
        .with_asset("logo.png", "c"),
    );
    let checker = PrecompiledAssets::new(default_rules(), index, true);
    let set = checker.set();
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["application.js", "logo.png"]);
    assert!(checker.is_precompiled("application.js"));
    assert!(!checker.is_precompiled("widgets.js"));
  }

  #[test]
  fn recomputes_on_miss_when_classes_are_not_cached() {
    let index = Arc::new(GrowingIndex {
      paths: Mutex::new(vec!["application.js".into()]),
    });
    let rules = parse_rules(["application.js", "late.js"]).unwrap();
    let dev = PrecompiledAssets::new(rules.clone(), index.clone(), false);
    let prod = PrecompiledAssets::new(rules, index.clone(), true);
    assert!(!dev.is_precompiled("late.js"));
    assert!(!prod.is_precompiled("late.js"));

    index.paths.lock().unwrap().push("late.js".into());
    assert!(dev.is_precompiled("late.js"));
    assert!(!prod.is_precompiled("late.js"));
  }

  /// Index that counts how often it was listed.
  #[derive(Default)]
  struct CountingIndex {
    listings: AtomicUsize,
  }

  impl LiveAssetIndex for CountingIndex {
    fn find(&self, _logical_path: &str, _pipeline: Pipeline) -> Option<AssetHandle> {
      None
    }

    fn logical_paths(&self) -> Vec<String> {
      self.listings.fetch_add(1, Ordering::SeqCst);
      std::thread::sleep(std::time::Duration::from_millis(5));
      vec!["application.js".into()]
    }
  }

  #[test]
  fn concurrent_first_access_computes_once() {
    let index = Arc::new(CountingIndex::default());
    let checker = Arc::new(PrecompiledAssets::new(default_rules(), index.clone(), true));
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let checker = Arc::clone(&checker);
        std::thread::spawn(move || checker.set())
      })
      .collect();
    let sets: Vec<Arc<PrecompileSet>> =
      handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(index.listings.load(Ordering::SeqCst), 1);
    assert!(sets.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert!(sets[0].contains("application.js"));
  }

  #[test]
  fn closures_act_as_checkers() {
    let checker = |path: &str| path == "app.js";
    assert!(checker.is_precompiled("app.js"));
    assert!(!PrecompileChecker::is_precompiled(&checker, "other.js"));
  }
}
