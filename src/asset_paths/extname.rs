use serde::{Deserialize, Serialize};

/// Broad category of an asset, used for default extensions and public fallback directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// JavaScript sources.
    Javascript,
    /// Stylesheets.
    Stylesheet,
    /// Images.
    Image,
    /// Video files.
    Video,
    /// Audio files.
    Audio,
    /// Web fonts.
    Font,
}

impl AssetKind {
    /// Extension appended to extensionless references of this kind.
    pub fn default_extname(self) -> Option<&'static str> {
        match self {
            Self::Javascript => Some(".js"),
            Self::Stylesheet => Some(".css"),
            _ => None,
        }
    }

    /// Directory under the public folder that unknown assets of this kind fall back to.
    pub fn public_directory(self) -> &'static str {
        match self {
            Self::Javascript => "/javascripts",
            Self::Stylesheet => "/stylesheets",
            Self::Image => "/images",
            Self::Video => "/videos",
            Self::Audio => "/audios",
            Self::Font => "/fonts",
        }
    }
}

/// Extension of the final path segment, including the dot (`"app.min.js"` → `".js"`).
///
/// Dotfiles such as `.keep` have no extension.
pub fn extname(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(index) if index + 1 == name.len() => "",
        Some(index) => &name[index..],
    }
}

/// Append the expected extension unless the reference already ends with it.
///
/// An explicit `extname` wins over the one implied by `kind`.
pub fn path_with_extname(path: &str, kind: Option<AssetKind>, explicit: Option<&str>) -> String {
    let wanted = explicit.or_else(|| kind.and_then(AssetKind::default_extname));
    match wanted {
        Some(ext) if !ext.is_empty() && extname(path) != ext => format!("{path}{ext}"),
        _ => path.to_string(),
    }
}
