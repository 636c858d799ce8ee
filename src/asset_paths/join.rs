/// Join a URL prefix and an asset path with exactly one slash between them.
///
/// The result always uses forward slashes, so paths built from platform-specific
/// segments still produce a valid URL.
pub fn join_asset_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.replace('\\', "/");
    let path = path.replace('\\', "/");
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::join_asset_path;

    #[test]
    fn joins_prefix_and_path() {
        assert_eq!(join_asset_path("/assets", "app-abc.js"), "/assets/app-abc.js");
    }

    #[test]
    fn collapses_duplicate_separators() {
        assert_eq!(join_asset_path("/assets/", "/app.js"), "/assets/app.js");
    }

    #[test]
    fn root_prefix_yields_absolute_path() {
        assert_eq!(join_asset_path("/", "app.js"), "/app.js");
        assert_eq!(join_asset_path("", "app.js"), "/app.js");
    }

    #[test]
    fn normalises_backslashes_from_windows_inputs() {
        assert_eq!(
            join_asset_path("/assets", "images\\logo.png"),
            "/assets/images/logo.png"
        );
    }
}
