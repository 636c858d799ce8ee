//! Request path classification for the mounted asset server.

use regex::Regex;

/// Classifies request paths relative to the asset prefix.
#[derive(Debug, Clone)]
pub struct AssetRoutes {
  prefix: String,
  silenced: Option<Regex>,
}

impl AssetRoutes {
  /// Build the matchers for `prefix` (for example `/assets`).
  ///
  /// Asset request logging is only silenced when `quiet` is set.
  pub fn new(prefix: &str, quiet: bool) -> Self {
    let prefix = format!("/{}", prefix.trim_matches('/'));
    let silenced = quiet.then(|| {
      Regex::new(&format!(r"\A/{{0,2}}{}", regex::escape(&prefix)))
        .expect("escaped prefix is a valid regex")
    });
    Self { prefix, silenced }
  }

  /// Normalised prefix with a single leading slash.
  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  /// Returns `true` for the mount point itself, which route listings treat as internal.
  pub fn is_internal_route(&self, path: &str) -> bool {
    path == self.prefix
  }

  /// Returns `true` for requests whose logging should be silenced.
  pub fn should_silence(&self, path_info: &str) -> bool {
    self
      .silenced
      .as_ref()
      .is_some_and(|pattern| pattern.is_match(path_info))
  }
}

#[cfg(test)]
mod tests {
  use super::AssetRoutes;

  #[test]
  fn mount_point_is_internal() {
    let routes = AssetRoutes::new("/assets", false);
    assert!(routes.is_internal_route("/assets"));
    assert!(!routes.is_internal_route("/assets/app.js"));
    assert!(!routes.is_internal_route("/users"));
  }

  #[test]
  fn silences_asset_requests() {
    let routes = AssetRoutes::new("assets/", true);
    assert_eq!(routes.prefix(), "/assets");
    assert!(routes.should_silence("/assets/app-abc.js"));
    assert!(routes.should_silence("//assets/app.css"));
    assert!(!routes.should_silence("/users/assets"));
  }

  #[test]
  fn logging_is_untouched_unless_quiet() {
    let routes = AssetRoutes::new("/assets", false);
    assert!(!routes.should_silence("/assets/app-abc.js"));
    assert!(routes.is_internal_route("/assets"));
  }

  #[test]
  fn escapes_regex_metacharacters_in_prefix() {
    let routes = AssetRoutes::new("/a.b", true);
    assert!(routes.should_silence("/a.b/x.js"));
    assert!(!routes.should_silence("/axb/x.js"));
  }
}
