use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::asset_paths::extname;
use crate::models::{Asset, DEBUG_SUFFIX};

/// Hex encoded SHA-256 of the asset bytes.
pub fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Subresource integrity value for the asset bytes (`sha256-<base64>`).
pub fn integrity_of(bytes: &[u8]) -> String {
    format!("sha256-{}", STANDARD.encode(Sha256::digest(bytes)))
}

/// Insert the digest before the extension: `app.js` → `app-<digest>.js`.
pub fn digest_path(logical_path: &str, digest: &str) -> String {
    insert_before_extname(logical_path, &format!("-{digest}"))
}

/// Logical path of the debug variant: `app.js` → `app.debug.js`.
pub fn debug_logical_path(logical_path: &str) -> String {
    insert_before_extname(logical_path, DEBUG_SUFFIX)
}

fn insert_before_extname(path: &str, insertion: &str) -> String {
    let ext = extname(path);
    let stem = &path[..path.len() - ext.len()];
    format!("{stem}{insertion}{ext}")
}

/// Build a processed asset record from raw bytes.
pub fn build_asset(
    logical_path: &str,
    source: Arc<[u8]>,
    filename: Option<PathBuf>,
    mtime: DateTime<Utc>,
) -> Asset {
    let digest = hex_digest(&source);
    Asset {
        logical_path: logical_path.to_string(),
        digest_path: digest_path(logical_path, &digest),
        integrity: Some(integrity_of(&source)),
        digest,
        source,
        filename,
        mtime,
    }
}
